//! In-memory recorder for tests and dry runs. Captures publications, sleeps,
//! step changes and ends in one ordered log. Sleeps return immediately.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use stagehand_common::{AnimationLike, ElementId, Step};
use uuid::Uuid;

use crate::traits::{Clock, SequenceObserver};
use crate::types::{Publication, RunSummary};

#[derive(Debug, Clone)]
pub enum TimelineEntry<Id, A> {
    Published(Publication<Id, A>),
    Slept(Duration),
    StepChanged { id: Option<Id>, index: Option<usize> },
    Ended { run_id: Uuid },
}

pub struct MemoryTimeline<Id, A> {
    entries: Mutex<Vec<TimelineEntry<Id, A>>>,
}

impl<Id: ElementId, A: AnimationLike> Default for MemoryTimeline<Id, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: ElementId, A: AnimationLike> MemoryTimeline<Id, A> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TimelineEntry<Id, A>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, entry: TimelineEntry<Id, A>) {
        self.lock().push(entry);
    }

    /// Everything recorded so far, in order.
    pub fn entries(&self) -> Vec<TimelineEntry<Id, A>> {
        self.lock().clone()
    }

    pub fn publications(&self) -> Vec<Publication<Id, A>> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                TimelineEntry::Published(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                TimelineEntry::Slept(d) => Some(*d),
                _ => None,
            })
            .collect()
    }

    pub fn step_changes(&self) -> Vec<(Option<Id>, Option<usize>)> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                TimelineEntry::StepChanged { id, index } => Some((id.clone(), *index)),
                _ => None,
            })
            .collect()
    }

    pub fn ended_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|e| matches!(e, TimelineEntry::Ended { .. }))
            .count()
    }
}

#[async_trait]
impl<Id: ElementId, A: AnimationLike> Clock for MemoryTimeline<Id, A> {
    async fn sleep(&self, duration: Duration) {
        self.record(TimelineEntry::Slept(duration));
        tokio::task::yield_now().await;
    }
}

impl<Id: ElementId, A: AnimationLike> SequenceObserver<Id, A> for MemoryTimeline<Id, A> {
    fn published(&self, publication: &Publication<Id, A>) {
        self.record(TimelineEntry::Published(publication.clone()));
    }

    fn step_changed(&self, step: Option<&Step<Id, A>>, index: Option<usize>) {
        self.record(TimelineEntry::StepChanged {
            id: step.map(|s| s.id().clone()),
            index,
        });
    }

    fn sequence_ended(&self, summary: &RunSummary) {
        self.record(TimelineEntry::Ended {
            run_id: summary.run_id,
        });
    }
}
