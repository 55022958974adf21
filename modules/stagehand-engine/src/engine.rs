//! The run loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use stagehand_common::{AnimationLike, DerivedState, ElementId, ResetPolicy, Step, Transition};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::batch::batch_range;
use crate::cancel::RunToken;
use crate::traits::{Clock, SequenceObserver, TokioClock};
use crate::types::{EngineSettings, Publication, RunOutcome, RunSummary, SequenceConfig};

/// Assembles a `SequenceEngine` with its clock and observers.
pub struct EngineBuilder<Id, A> {
    settings: EngineSettings,
    clock: Arc<dyn Clock>,
    observers: Vec<Arc<dyn SequenceObserver<Id, A>>>,
}

impl<Id: ElementId, A: AnimationLike> EngineBuilder<Id, A> {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            clock: Arc::new(TokioClock),
            observers: Vec::new(),
        }
    }

    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_observer<O: SequenceObserver<Id, A> + 'static>(mut self, observer: O) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    pub fn build(self) -> SequenceEngine<Id, A> {
        let (state_tx, _) = watch::channel(Publication::default());
        let (running_tx, _) = watch::channel(false);
        SequenceEngine {
            inner: Arc::new(Inner {
                settings: self.settings,
                clock: self.clock,
                observers: self.observers,
                config: Mutex::new(SequenceConfig::default()),
                state_tx,
                running_tx,
                generation: AtomicU64::new(0),
                seq: AtomicU64::new(0),
                active_run: Mutex::new(None),
            }),
        }
    }
}

/// Drives a configured step sequence and owns its derived state.
///
/// Cheap to clone; clones share the same state, guard and feeds.
pub struct SequenceEngine<Id, A> {
    inner: Arc<Inner<Id, A>>,
}

impl<Id, A> Clone for SequenceEngine<Id, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<Id, A> {
    settings: EngineSettings,
    clock: Arc<dyn Clock>,
    observers: Vec<Arc<dyn SequenceObserver<Id, A>>>,
    config: Mutex<SequenceConfig<Id, A>>,
    state_tx: watch::Sender<Publication<Id, A>>,
    /// Doubles as the single-run guard.
    running_tx: watch::Sender<bool>,
    /// Bumped by every accepted start and every cancelling reset.
    generation: AtomicU64,
    seq: AtomicU64,
    /// Held across every guard change and feed update, so a reset can land
    /// strictly before or strictly after each of them.
    active_run: Mutex<Option<RunToken>>,
}

/// Everything a run needs, captured when it is accepted.
struct ActiveRun<Id, A> {
    id: Uuid,
    generation: u64,
    token: RunToken,
    config: SequenceConfig<Id, A>,
    started_at: DateTime<Utc>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<Id: ElementId, A: AnimationLike> SequenceEngine<Id, A> {
    pub fn builder(settings: EngineSettings) -> EngineBuilder<Id, A> {
        EngineBuilder::new(settings)
    }

    /// Store the configuration for the next run. Returns whether it changed.
    ///
    /// An identical configuration is a no-op, except that a supplied
    /// step-change callback replaces the stored one.
    pub fn configure(&self, config: SequenceConfig<Id, A>) -> bool {
        let mut current = lock(&self.inner.config);
        if current.same_sequence(&config) {
            if config.on_step_change.is_some() {
                current.on_step_change = config.on_step_change;
            }
            return false;
        }

        debug!(
            steps = config.steps.len(),
            reversed = config.reversed,
            animate = config.animate,
            "Sequence reconfigured"
        );
        *current = config;
        true
    }

    pub fn config(&self) -> SequenceConfig<Id, A> {
        lock(&self.inner.config).clone()
    }

    /// Spawn a run onto the tokio runtime. Returns `None`, and does nothing,
    /// when a run is already active.
    pub fn start(&self) -> Option<JoinHandle<RunOutcome>> {
        let run = self.begin()?;
        let engine = self.clone();
        Some(tokio::spawn(async move {
            let outcome = engine.drive(&run).await;
            engine.finish(&run);
            outcome
        }))
    }

    /// Run inline. Same guard as `start`.
    pub async fn run(&self) -> RunOutcome {
        let Some(run) = self.begin() else {
            return RunOutcome::Rejected;
        };
        let outcome = self.drive(&run).await;
        self.finish(&run);
        outcome
    }

    /// Restore start-of-sequence defaults and clear the running flag.
    ///
    /// Under `ResetPolicy::CancelRun` the in-flight run is cancelled at its
    /// current suspension point. Under `OverwriteOnly` it keeps going and will
    /// publish again when it wakes.
    pub fn reset(&self) {
        let steps = lock(&self.inner.config).steps.clone();

        let (publication, was_running) = {
            let mut slot = lock(&self.inner.active_run);
            let was_running = *self.inner.running_tx.borrow();

            if self.inner.settings.reset_policy == ResetPolicy::CancelRun {
                self.inner.generation.fetch_add(1, Ordering::SeqCst);
                if let Some(token) = slot.take() {
                    token.cancel();
                }
            }

            let publication = self.swap_feed(None, DerivedState::initial(&steps), Transition::Instant);
            self.inner.running_tx.send_replace(false);
            (publication, was_running)
        };
        self.notify_published(&publication);

        if was_running {
            warn!(policy = ?self.inner.settings.reset_policy, "Sequence reset while a run was active");
        }
    }

    /// Follow an edge-triggered start signal until its sender is dropped.
    ///
    /// Every transition into `true` calls `start()`. A signal that is already
    /// `true` when we begin listening counts as a transition.
    pub async fn follow_signal(&self, mut signal: watch::Receiver<bool>) {
        let mut previous = false;
        loop {
            let current = *signal.borrow_and_update();
            if current && !previous {
                let _ = self.start();
            }
            previous = current;

            if signal.changed().await.is_err() {
                break;
            }
        }
    }

    pub fn snapshot(&self) -> DerivedState<Id> {
        self.inner.state_tx.borrow().state.clone()
    }

    pub fn latest(&self) -> Publication<Id, A> {
        self.inner.state_tx.borrow().clone()
    }

    /// Derived State feed. Always holds the most recent publication.
    pub fn subscribe(&self) -> watch::Receiver<Publication<Id, A>> {
        self.inner.state_tx.subscribe()
    }

    pub fn is_running(&self) -> bool {
        *self.inner.running_tx.borrow()
    }

    pub fn subscribe_running(&self) -> watch::Receiver<bool> {
        self.inner.running_tx.subscribe()
    }

    fn begin(&self) -> Option<ActiveRun<Id, A>> {
        let config = self.config();

        let (generation, token) = {
            let mut slot = lock(&self.inner.active_run);
            let running = *self.inner.running_tx.borrow();
            if running {
                debug!("Start ignored, a run is already active");
                return None;
            }
            self.inner.running_tx.send_replace(true);

            let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let token = RunToken::new();
            *slot = Some(token.clone());
            (generation, token)
        };

        Some(ActiveRun {
            id: Uuid::new_v4(),
            generation,
            token,
            config,
            started_at: Utc::now(),
        })
    }

    fn finish(&self, run: &ActiveRun<Id, A>) {
        let mut slot = lock(&self.inner.active_run);
        let current = self.inner.generation.load(Ordering::SeqCst) == run.generation;
        if current {
            slot.take();
        }
        // A cancelled run must not clear the flag of whatever came after it.
        if current || self.inner.settings.reset_policy == ResetPolicy::OverwriteOnly {
            self.inner.running_tx.send_replace(false);
        }
    }

    async fn drive(&self, run: &ActiveRun<Id, A>) -> RunOutcome {
        let steps = run.config.effective_steps();
        let animate = run.config.animate;
        let settle = self.inner.settings.settle;

        info!(
            run_id = %run.id,
            steps = steps.len(),
            reversed = run.config.reversed,
            animate,
            "Sequence started"
        );

        let mut state = DerivedState::initial(&steps);
        if !self.publish(run, state.clone(), Transition::Instant) {
            return RunOutcome::Cancelled;
        }

        let mut active: Option<usize> = None;
        let mut batches = 0;
        let mut activations = 0;
        let mut i = 0;

        while i < steps.len() {
            let lead = &steps[i];
            if animate && !lead.delay().is_zero() && !self.suspend(run, lead.delay()).await {
                return RunOutcome::Cancelled;
            }

            let range = batch_range(&steps, i);
            for idx in range.clone() {
                state.activate(&steps[idx], active.map(|a| &steps[a]));
                active = Some(idx);
            }

            let transition = if animate {
                Transition::from(lead.animation().cloned())
            } else {
                Transition::Instant
            };
            if !self.publish(run, state.clone(), transition) {
                return RunOutcome::Cancelled;
            }

            let last = range.end - 1;
            debug!(
                run_id = %run.id,
                first = range.start,
                last,
                active = ?steps[last].id(),
                "Batch activated"
            );
            self.step_changed(run, Some(&steps[last]), Some(last));

            batches += 1;
            activations += range.len();

            if animate
                && steps[last].waits_for_completion()
                && !settle.is_zero()
                && !self.suspend(run, settle).await
            {
                return RunOutcome::Cancelled;
            }

            i = range.end;
        }

        state.retire(active.map(|a| &steps[a]));
        let closing = if animate {
            Transition::Default
        } else {
            Transition::Instant
        };
        if !self.publish(run, state, closing) {
            return RunOutcome::Cancelled;
        }
        self.step_changed(run, None, None);

        let summary = RunSummary {
            run_id: run.id,
            started_at: run.started_at,
            finished_at: Utc::now(),
            batches,
            activations,
        };
        for observer in &self.inner.observers {
            observer.sequence_ended(&summary);
        }
        info!(run_id = %run.id, batches, activations, "Sequence finished");

        RunOutcome::Completed(summary)
    }

    async fn suspend(&self, run: &ActiveRun<Id, A>, duration: Duration) -> bool {
        let resumed = run.token.sleep(self.inner.clock.as_ref(), duration).await;
        if !resumed {
            info!(run_id = %run.id, "Sequence cancelled");
        }
        resumed
    }

    /// Publish on behalf of `run`. Returns false once the run is cancelled: a
    /// run cancelled beforehand publishes nothing, and one cancelled by an
    /// observer stops before emitting anything further.
    fn publish(&self, run: &ActiveRun<Id, A>, state: DerivedState<Id>, transition: Transition<A>) -> bool {
        let publication = {
            let _slot = lock(&self.inner.active_run);
            if run.token.is_cancelled() {
                info!(run_id = %run.id, "Sequence cancelled");
                return false;
            }
            self.swap_feed(Some(run.id), state, transition)
        };
        self.notify_published(&publication);
        !run.token.is_cancelled()
    }

    /// Number the publication and replace the feed value. Callers hold `active_run`.
    fn swap_feed(
        &self,
        run_id: Option<Uuid>,
        state: DerivedState<Id>,
        transition: Transition<A>,
    ) -> Publication<Id, A> {
        let seq = self.inner.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let publication = Publication {
            seq,
            run_id,
            state,
            transition,
        };
        self.inner.state_tx.send_replace(publication.clone());
        publication
    }

    // Observers run outside the lock so they may call back into the engine.
    fn notify_published(&self, publication: &Publication<Id, A>) {
        for observer in &self.inner.observers {
            observer.published(publication);
        }
    }

    fn step_changed(&self, run: &ActiveRun<Id, A>, step: Option<&Step<Id, A>>, index: Option<usize>) {
        if let Some(callback) = &run.config.on_step_change {
            callback(step, index);
        }
        for observer in &self.inner.observers {
            observer.step_changed(step, index);
        }
    }
}
