//! Seams between the engine and its collaborators.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stagehand_common::{AnimationLike, ElementId, Step};

use crate::types::{Publication, RunSummary};

/// Realizes delays and settle-waits.
///
/// Implemented by `TokioClock` (production) and `MemoryTimeline` (tests).
/// Also implemented for `Arc<C>` so a test clock can be shared for assertions.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[async_trait]
impl<C: Clock + ?Sized> Clock for Arc<C> {
    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await
    }
}

/// Receives everything a run emits, in order.
///
/// Called inline from the run loop, so implementations must not block.
pub trait SequenceObserver<Id, A>: Send + Sync {
    /// A new snapshot was published. One call per batch, plus the reset and
    /// closing publishes.
    fn published(&self, _publication: &Publication<Id, A>) {}

    /// A batch activated `step` at `index` in effective order. Both are `None`
    /// when the sequence finishes.
    fn step_changed(&self, _step: Option<&Step<Id, A>>, _index: Option<usize>) {}

    /// Fired exactly once per completed run, after the closing publish.
    fn sequence_ended(&self, _summary: &RunSummary) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl<Id: ElementId, A: AnimationLike> SequenceObserver<Id, A> for NoopObserver {}

impl<Id, A, O> SequenceObserver<Id, A> for Arc<O>
where
    Id: ElementId,
    A: AnimationLike,
    O: SequenceObserver<Id, A> + ?Sized,
{
    fn published(&self, publication: &Publication<Id, A>) {
        (**self).published(publication)
    }

    fn step_changed(&self, step: Option<&Step<Id, A>>, index: Option<usize>) {
        (**self).step_changed(step, index)
    }

    fn sequence_ended(&self, summary: &RunSummary) {
        (**self).sequence_ended(summary)
    }
}
