use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identifiers the engine can track. Any cloneable, hashable value works:
/// strings, enums, integers.
pub trait ElementId: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> ElementId for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// Animation descriptors are opaque to the engine. It only clones them into
/// publications and compares them when detecting configuration changes.
pub trait AnimationLike: Clone + PartialEq + Debug + Send + Sync + 'static {}

impl<T> AnimationLike for T where T: Clone + PartialEq + Debug + Send + Sync + 'static {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Participates in source/destination role toggling.
    Matched,
    /// Participates in visibility and keep-alive only.
    #[default]
    Transition,
}

/// Which of the two paired representations a matched element occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Source,
    Destination,
}

impl Role {
    pub fn toggled(self) -> Self {
        match self {
            Role::Source => Role::Destination,
            Role::Destination => Role::Source,
        }
    }

    pub fn toggle(&mut self) {
        *self = self.toggled();
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Source => write!(f, "source"),
            Role::Destination => write!(f, "destination"),
        }
    }
}

/// One declared unit of a sequence.
///
/// Immutable once built: the `with_*` methods consume and return a new value.
/// Two steps with equal fields are interchangeable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step<Id, A> {
    id: Id,
    animation: Option<A>,
    kind: StepKind,
    delay: Duration,
    keep_alive: bool,
    wait_for_completion: bool,
}

impl<Id: ElementId, A: AnimationLike> Step<Id, A> {
    pub fn new(id: Id, kind: StepKind) -> Self {
        Self {
            id,
            animation: None,
            kind,
            delay: Duration::ZERO,
            keep_alive: true,
            wait_for_completion: true,
        }
    }

    pub fn matched(id: Id) -> Self {
        Self::new(id, StepKind::Matched)
    }

    pub fn transition(id: Id) -> Self {
        Self::new(id, StepKind::Transition)
    }

    pub fn with_animation(mut self, animation: A) -> Self {
        self.animation = Some(animation);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn wait_for_completion(mut self, wait: bool) -> Self {
        self.wait_for_completion = wait;
        self
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn animation(&self) -> Option<&A> {
        self.animation.as_ref()
    }

    pub fn kind(&self) -> StepKind {
        self.kind
    }

    pub fn is_matched(&self) -> bool {
        self.kind == StepKind::Matched
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn keeps_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn waits_for_completion(&self) -> bool {
        self.wait_for_completion
    }
}

/// How a publication should be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "animation")]
pub enum Transition<A> {
    /// Apply without any animation.
    Instant,
    /// Animate with the renderer's own default curve.
    Default,
    /// Animate with the given descriptor.
    Animated(A),
}

impl<A> Transition<A> {
    pub fn is_animated(&self) -> bool {
        !matches!(self, Transition::Instant)
    }
}

impl<A> From<Option<A>> for Transition<A> {
    fn from(animation: Option<A>) -> Self {
        match animation {
            Some(a) => Transition::Animated(a),
            None => Transition::Instant,
        }
    }
}
