//! Lifecycle state machine
//!
//! Every attachable unit (nodes and components alike) moves through
//! `Unloaded -> Loaded -> Attached -> Activated -> Started`. `Deactivated`
//! is the attached-but-inactive substate reached from `Activated`/`Started`,
//! so re-activation skips re-attachment. `Detached` and `Destroyed` are exit
//! states; `Destroyed` is terminal.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Current position of a unit in the lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    Unloaded,
    Loaded,
    Attached,
    Activated,
    Started,
    Deactivated,
    Detached,
    Destroyed,
}

impl LifecycleState {
    /// True for every state in which owner references are wired.
    #[inline]
    pub fn is_attached(self) -> bool {
        matches!(
            self,
            Self::Attached | Self::Activated | Self::Started | Self::Deactivated
        )
    }

    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Activated | Self::Started)
    }

    #[inline]
    pub fn is_destroyed(self) -> bool {
        self == Self::Destroyed
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single edge of the state machine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Transition {
    Load,
    Attach,
    Activate,
    Start,
    Deactivate,
    Detach,
    Destroy,
}

impl Transition {
    pub fn name(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Attach => "attach",
            Self::Activate => "activate",
            Self::Start => "start",
            Self::Deactivate => "deactivate",
            Self::Detach => "detach",
            Self::Destroy => "destroy",
        }
    }

    /// State reached when the transition applies.
    pub fn target(self) -> LifecycleState {
        match self {
            Self::Load => LifecycleState::Loaded,
            Self::Attach => LifecycleState::Attached,
            Self::Activate => LifecycleState::Activated,
            Self::Start => LifecycleState::Started,
            Self::Deactivate => LifecycleState::Deactivated,
            Self::Detach => LifecycleState::Detached,
            Self::Destroy => LifecycleState::Destroyed,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("cannot {transition} from state {from}")]
    Conflict {
        from: LifecycleState,
        transition: Transition,
    },

    #[error("state {target} is not a teardown target (expected Detached or Destroyed)")]
    InvalidForceTarget { target: LifecycleState },
}

/// Lifecycle bookkeeping for one unit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Lifecycle {
    state: LifecycleState,
}

impl Lifecycle {
    pub const fn new() -> Self {
        Self {
            state: LifecycleState::Unloaded,
        }
    }

    #[inline]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Check whether `transition` is legal from the current state.
    ///
    /// Returns `Ok(true)` when it would change the state and `Ok(false)` when
    /// it is an idempotent no-op (e.g. starting an already started unit).
    pub fn check(&self, transition: Transition) -> Result<bool, LifecycleError> {
        use LifecycleState::*;

        let applies = match (transition, self.state) {
            (_, Destroyed) if transition != Transition::Destroy => None,

            (Transition::Load, Unloaded) => Some(true),
            (Transition::Load, Loaded) => Some(false),
            (Transition::Load, _) => None,

            (Transition::Attach, Loaded | Detached) => Some(true),
            (Transition::Attach, Attached | Activated | Started | Deactivated) => Some(false),
            (Transition::Attach, _) => None,

            (Transition::Activate, Attached | Deactivated) => Some(true),
            (Transition::Activate, Activated | Started) => Some(false),
            (Transition::Activate, _) => None,

            (Transition::Start, Activated) => Some(true),
            (Transition::Start, Started) => Some(false),
            (Transition::Start, _) => None,

            (Transition::Deactivate, Activated | Started) => Some(true),
            (Transition::Deactivate, _) => Some(false),

            (Transition::Detach, Attached | Activated | Started | Deactivated) => Some(true),
            (Transition::Detach, _) => Some(false),

            (Transition::Destroy, Destroyed) => Some(false),
            (Transition::Destroy, _) => Some(true),
        };

        applies.ok_or(LifecycleError::Conflict {
            from: self.state,
            transition,
        })
    }

    /// Apply `transition`, returning whether the state changed.
    pub fn apply(&mut self, transition: Transition) -> Result<bool, LifecycleError> {
        let applies = self.check(transition)?;
        if applies {
            self.state = transition.target();
        }
        Ok(applies)
    }

    /// Overwrite the state without checks. Used to roll back a failed attach.
    pub(crate) fn restore(&mut self, state: LifecycleState) {
        self.state = state;
    }

    /// Transitions needed to unwind from the current state to `target`.
    ///
    /// From `Started` towards `Destroyed` this is deactivate, detach, destroy.
    /// An already reached target yields an empty path.
    pub fn teardown_path(&self, target: LifecycleState) -> Result<Vec<Transition>, LifecycleError> {
        if !matches!(target, LifecycleState::Detached | LifecycleState::Destroyed) {
            return Err(LifecycleError::InvalidForceTarget { target });
        }
        if self.state == LifecycleState::Destroyed {
            return if target == LifecycleState::Destroyed {
                Ok(Vec::new())
            } else {
                Err(LifecycleError::Conflict {
                    from: self.state,
                    transition: Transition::Detach,
                })
            };
        }

        let mut path = Vec::with_capacity(3);
        if self.state.is_active() {
            path.push(Transition::Deactivate);
        }
        if self.state.is_attached() {
            path.push(Transition::Detach);
        }
        if target == LifecycleState::Destroyed {
            path.push(Transition::Destroy);
        }
        Ok(path)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
