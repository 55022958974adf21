use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use stagehand_common::config::DEFAULT_SETTLE_MS;
use stagehand_common::{AnimationLike, Config, DerivedState, ElementId, ResetPolicy, Step, Transition};
use uuid::Uuid;

/// One atomic state snapshot, as the rendering layer sees it.
#[derive(Debug, Clone, Serialize)]
pub struct Publication<Id, A> {
    /// Monotonic per engine. Zero is the engine's initial empty state.
    pub seq: u64,
    pub run_id: Option<Uuid>,
    pub state: DerivedState<Id>,
    pub transition: Transition<A>,
}

impl<Id: ElementId, A: AnimationLike> Default for Publication<Id, A> {
    fn default() -> Self {
        Self {
            seq: 0,
            run_id: None,
            state: DerivedState::default(),
            transition: Transition::Instant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub batches: usize,
    pub activations: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run {} activated {} steps in {} batches ({} ms)",
            self.run_id,
            self.activations,
            self.batches,
            (self.finished_at - self.started_at).num_milliseconds()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(RunSummary),
    /// Another run was active; nothing happened.
    Rejected,
    /// `reset()` cancelled the run before it finished.
    Cancelled,
}

impl RunOutcome {
    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            RunOutcome::Completed(summary) => Some(summary),
            _ => None,
        }
    }
}

/// Per-configuration step-change callback.
pub type StepCallback<Id, A> = Arc<dyn Fn(Option<&Step<Id, A>>, Option<usize>) + Send + Sync>;

/// What to run. Changes take effect on the next start.
#[derive(Clone)]
pub struct SequenceConfig<Id, A> {
    pub steps: Vec<Step<Id, A>>,
    pub reversed: bool,
    pub animate: bool,
    pub on_step_change: Option<StepCallback<Id, A>>,
}

impl<Id: ElementId, A: AnimationLike> Default for SequenceConfig<Id, A> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<Id: ElementId, A: AnimationLike> fmt::Debug for SequenceConfig<Id, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceConfig")
            .field("steps", &self.steps)
            .field("reversed", &self.reversed)
            .field("animate", &self.animate)
            .field("on_step_change", &self.on_step_change.is_some())
            .finish()
    }
}

impl<Id: ElementId, A: AnimationLike> SequenceConfig<Id, A> {
    pub fn new(steps: Vec<Step<Id, A>>) -> Self {
        Self {
            steps,
            reversed: false,
            animate: true,
            on_step_change: None,
        }
    }

    pub fn reversed(mut self, reversed: bool) -> Self {
        self.reversed = reversed;
        self
    }

    pub fn animate(mut self, animate: bool) -> Self {
        self.animate = animate;
        self
    }

    pub fn on_step_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(Option<&Step<Id, A>>, Option<usize>) + Send + Sync + 'static,
    {
        self.on_step_change = Some(Arc::new(callback));
        self
    }

    /// Steps in the order a run walks them.
    pub fn effective_steps(&self) -> Vec<Step<Id, A>> {
        let mut steps = self.steps.clone();
        if self.reversed {
            steps.reverse();
        }
        steps
    }

    /// Structural equality, ignoring the callback.
    pub fn same_sequence(&self, other: &Self) -> bool {
        self.steps == other.steps && self.reversed == other.reversed && self.animate == other.animate
    }
}

/// Engine-wide knobs that do not change between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Fixed wait after a batch whose last step waits for completion.
    pub settle: Duration,
    pub reset_policy: ResetPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(DEFAULT_SETTLE_MS),
            reset_policy: ResetPolicy::default(),
        }
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            settle: config.settle,
            reset_policy: config.reset_policy,
        }
    }
}

impl EngineSettings {
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_reset_policy(mut self, policy: ResetPolicy) -> Self {
        self.reset_policy = policy;
        self
    }
}
