//! Error containment for component callbacks.
//!
//! A failing callback never corrupts the owning node: the failure is handed to
//! the capture hook, which decides whether the sweep continues with the next
//! sibling or the error propagates to the caller.

use crate::error::UnitError;
use crate::lifecycle::Transition;
use crate::scene::{ComponentId, Entity, EntityId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome chosen by the capture hook.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureDecision {
    /// Log the failure and keep processing the remaining units.
    Suppress,
    /// Abort the current sweep and return the failure to the caller.
    Rethrow,
}

/// Which callback failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UnitPhase {
    Attach,
    Activate,
    Start,
    Deactivate,
    Detach,
    Destroy,
    Update,
}

impl UnitPhase {
    pub(crate) fn from_transition(transition: Transition) -> Option<Self> {
        match transition {
            Transition::Load => None,
            Transition::Attach => Some(Self::Attach),
            Transition::Activate => Some(Self::Activate),
            Transition::Start => Some(Self::Start),
            Transition::Deactivate => Some(Self::Deactivate),
            Transition::Detach => Some(Self::Detach),
            Transition::Destroy => Some(Self::Destroy),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Attach => "attach",
            Self::Activate => "activate",
            Self::Start => "start",
            Self::Deactivate => "deactivate",
            Self::Detach => "detach",
            Self::Destroy => "destroy",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for UnitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything the capture hook gets to see about a failure.
#[derive(Debug)]
pub struct UnitFailure<'a> {
    pub entity: Entity,
    pub entity_id: EntityId,
    pub component: ComponentId,
    pub type_name: &'static str,
    pub phase: UnitPhase,
    pub error: &'a UnitError,
}

pub type CaptureHook = Box<dyn FnMut(&UnitFailure<'_>) -> CaptureDecision>;

pub(crate) struct Capture {
    hook: Option<CaptureHook>,
    default: CaptureDecision,
}

impl Capture {
    pub fn new(default: CaptureDecision) -> Self {
        Self { hook: None, default }
    }

    pub fn set_hook(&mut self, hook: Option<CaptureHook>) {
        self.hook = hook;
    }

    pub fn decide(&mut self, failure: &UnitFailure<'_>) -> CaptureDecision {
        let decision = match self.hook.as_mut() {
            Some(hook) => hook(failure),
            None => self.default,
        };
        if decision == CaptureDecision::Suppress {
            tracing::error!(
                entity = %failure.entity,
                entity_id = %failure.entity_id,
                component = %failure.component,
                type_name = failure.type_name,
                phase = %failure.phase,
                error = %failure.error,
                "component failure suppressed"
            );
        }
        decision
    }
}
