//! The derived state the engine publishes after every change.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::types::{AnimationLike, ElementId, Role, Step, StepKind};

/// Active id, per-id role and keep-alive set.
///
/// Only the engine mutates this. Everything else receives clones.
#[derive(Debug, Clone, Serialize)]
pub struct DerivedState<Id> {
    active_id: Option<Id>,
    role_map: HashMap<Id, Role>,
    keep_alive_ids: HashSet<Id>,
}

impl<Id: ElementId> Default for DerivedState<Id> {
    fn default() -> Self {
        Self {
            active_id: None,
            role_map: HashMap::new(),
            keep_alive_ids: HashSet::new(),
        }
    }
}

impl<Id: ElementId> PartialEq for DerivedState<Id> {
    fn eq(&self, other: &Self) -> bool {
        self.active_id == other.active_id
            && self.role_map == other.role_map
            && self.keep_alive_ids == other.keep_alive_ids
    }
}

impl<Id: ElementId> Eq for DerivedState<Id> {}

/// How the rendering layer should present one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "presence", content = "role")]
pub enum Presence {
    Hidden,
    Shown,
    ShownAs(Role),
}

impl<Id: ElementId> DerivedState<Id> {
    /// Start-of-sequence defaults: nothing active, nothing kept alive,
    /// every matched id in the `Source` role.
    pub fn initial<A: AnimationLike>(steps: &[Step<Id, A>]) -> Self {
        let role_map = steps
            .iter()
            .filter(|s| s.is_matched())
            .map(|s| (s.id().clone(), Role::Source))
            .collect();
        Self {
            active_id: None,
            role_map,
            keep_alive_ids: HashSet::new(),
        }
    }

    pub fn active_id(&self) -> Option<&Id> {
        self.active_id.as_ref()
    }

    pub fn role_map(&self) -> &HashMap<Id, Role> {
        &self.role_map
    }

    pub fn keep_alive_ids(&self) -> &HashSet<Id> {
        &self.keep_alive_ids
    }

    /// Unknown ids report `Source`.
    pub fn role_of(&self, id: &Id) -> Role {
        self.role_map.get(id).copied().unwrap_or_default()
    }

    pub fn is_kept_alive(&self, id: &Id) -> bool {
        self.keep_alive_ids.contains(id)
    }

    pub fn is_visible(&self, id: &Id) -> bool {
        self.active_id.as_ref() == Some(id) || self.keep_alive_ids.contains(id)
    }

    /// The stateless mapping a renderer applies to one element.
    pub fn presence(&self, id: &Id, kind: StepKind) -> Presence {
        if !self.is_visible(id) {
            return Presence::Hidden;
        }
        match kind {
            StepKind::Matched => Presence::ShownAs(self.role_of(id)),
            StepKind::Transition => Presence::Shown,
        }
    }

    /// Make `step` the active element.
    ///
    /// `previous` is the step occurrence that is currently active, if any. Its
    /// id is kept alive when that occurrence asked for it. A step's own id is
    /// never both active and kept alive.
    pub fn activate<A: AnimationLike>(
        &mut self,
        step: &Step<Id, A>,
        previous: Option<&Step<Id, A>>,
    ) {
        if let Some(prev) = previous {
            if prev.keeps_alive() {
                self.keep_alive_ids.insert(prev.id().clone());
            }
        }

        self.active_id = Some(step.id().clone());

        if step.is_matched() {
            self.role_map.entry(step.id().clone()).or_default().toggle();
        }

        self.keep_alive_ids.remove(step.id());
    }

    /// End-of-sequence cleanup: keep the last element if it asked for it, then
    /// clear the active id.
    pub fn retire<A: AnimationLike>(&mut self, last: Option<&Step<Id, A>>) {
        if let Some(step) = last {
            if step.keeps_alive() {
                self.keep_alive_ids.insert(step.id().clone());
            }
        }
        self.active_id = None;
    }
}
