//! Setup state machine
//!
//! ```text
//! Received -> Validating -> ConfigBuilding -> ConfigPublishing -> GeneratingAll
//!     \            \               \                 \                 |
//!      `------------`---------------`-----------------`--> Rejected    v
//!                                                   Completed <- Aggregating
//! ```

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupState {
    Received,
    Validating,
    ConfigBuilding,
    ConfigPublishing,
    GeneratingAll,
    Aggregating,
    Completed,
    Rejected,
}

impl SetupState {
    pub fn state_name(&self) -> &'static str {
        match self {
            SetupState::Received => "received",
            SetupState::Validating => "validating",
            SetupState::ConfigBuilding => "config_building",
            SetupState::ConfigPublishing => "config_publishing",
            SetupState::GeneratingAll => "generating_all",
            SetupState::Aggregating => "aggregating",
            SetupState::Completed => "completed",
            SetupState::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SetupState::Completed | SetupState::Rejected)
    }

    /// Rejection is only possible before per-language work starts
    pub fn can_advance_to(&self, next: SetupState) -> bool {
        use SetupState::*;
        matches!(
            (*self, next),
            (Received, Validating)
                | (Validating, ConfigBuilding)
                | (ConfigBuilding, ConfigPublishing)
                | (ConfigPublishing, GeneratingAll)
                | (GeneratingAll, Aggregating)
                | (Aggregating, Completed)
                | (Received | Validating | ConfigBuilding | ConfigPublishing, Rejected)
        )
    }
}

impl fmt::Display for SetupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.state_name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid state transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: SetupState,
    pub to: SetupState,
}

/// Current state of one setup run, advanced only along legal transitions
#[derive(Debug)]
pub struct SetupStateMachine {
    state: SetupState,
}

impl Default for SetupStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SetupStateMachine {
    pub fn new() -> Self {
        Self {
            state: SetupState::Received,
        }
    }

    pub fn state(&self) -> SetupState {
        self.state
    }

    pub fn advance(&mut self, next: SetupState) -> Result<(), InvalidTransition> {
        if !self.state.can_advance_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!(from = %self.state, to = %next, "Setup state transition");
        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut machine = SetupStateMachine::new();
        for next in [
            SetupState::Validating,
            SetupState::ConfigBuilding,
            SetupState::ConfigPublishing,
            SetupState::GeneratingAll,
            SetupState::Aggregating,
            SetupState::Completed,
        ] {
            machine.advance(next).unwrap();
        }
        assert!(machine.state().is_terminal());
    }

    #[test]
    fn test_rejection_only_before_generation() {
        let mut machine = SetupStateMachine::new();
        machine.advance(SetupState::Validating).unwrap();
        machine.advance(SetupState::Rejected).unwrap();
        assert_eq!(machine.state(), SetupState::Rejected);

        assert!(!SetupState::GeneratingAll.can_advance_to(SetupState::Rejected));
        assert!(!SetupState::Aggregating.can_advance_to(SetupState::Rejected));
    }

    #[test]
    fn test_skipping_states_is_invalid() {
        let mut machine = SetupStateMachine::new();
        let error = machine.advance(SetupState::GeneratingAll).unwrap_err();
        assert_eq!(error.to_string(), "Invalid state transition: received -> generating_all");
        assert_eq!(machine.state(), SetupState::Received);
    }

    #[test]
    fn test_terminal_states_do_not_advance() {
        assert!(!SetupState::Completed.can_advance_to(SetupState::Rejected));
        assert!(!SetupState::Rejected.can_advance_to(SetupState::Validating));
    }
}
