use crate::ids::{CatalystId, Cycle, ScaffoldId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScaffoldState {
    Active,
    Solidify,
    Dissolve,
    Archive,
}

impl ScaffoldState {
    /// Allowed transitions. No state is ever revisited.
    pub fn can_transition_to(&self, next: ScaffoldState) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Solidify)
                | (Self::Active, Self::Dissolve)
                | (Self::Solidify, Self::Archive)
                | (Self::Dissolve, Self::Archive)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Archive)
    }
}

impl fmt::Display for ScaffoldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Solidify => write!(f, "SOLIDIFY"),
            Self::Dissolve => write!(f, "DISSOLVE"),
            Self::Archive => write!(f, "ARCHIVE"),
        }
    }
}

/// A time-bounded constraint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scaffold {
    pub id: ScaffoldId,
    pub constraint_text: String,
    pub ttl_cycles: u64,
    pub state: ScaffoldState,
    pub conflicts_with: Vec<ScaffoldId>,
    pub declared_at_cycle: Cycle,
    /// Catalyst raised when this scaffold solidified.
    pub contradiction_catalyst: Option<CatalystId>,
    /// `(cycle, state)` for every transition taken.
    pub history: Vec<(Cycle, ScaffoldState)>,
}

impl Scaffold {
    pub fn new(constraint_text: impl Into<String>, ttl_cycles: u64, declared_at_cycle: Cycle) -> Self {
        Self {
            id: ScaffoldId::generate(),
            constraint_text: constraint_text.into(),
            ttl_cycles,
            state: ScaffoldState::Active,
            conflicts_with: Vec::new(),
            declared_at_cycle,
            contradiction_catalyst: None,
            history: vec![(declared_at_cycle, ScaffoldState::Active)],
        }
    }

    /// Apply a transition, refusing any that would revisit or skip a state.
    pub fn transition(&mut self, next: ScaffoldState, cycle: Cycle) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        self.state = next;
        self.history.push((cycle, next));
        true
    }
}
