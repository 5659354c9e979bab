//! Tuning State Machine
//!
//! Defines the valid transitions of a single tune invocation, from
//! `Unchecked` to one of the terminal states.

use serde::Serialize;
use std::fmt;

/// States of one tune invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TuneState {
    /// Nothing has been read yet
    Unchecked,
    /// Current value satisfies the requirement
    Compliant,
    /// Current value fails the requirement, remediation pending
    NonCompliant,
    /// The command was executed or recorded
    Remediated,
    /// The executor reported an error
    RemediationFailed,
    /// The current value could not be read
    CheckFailed,
    /// The platform rules out remediation
    Unsupported,
}

impl TuneState {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TuneState::Unchecked | TuneState::NonCompliant)
    }

    /// Whether this terminal state counts as a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, TuneState::RemediationFailed | TuneState::CheckFailed)
    }
}

impl fmt::Display for TuneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TuneState::Unchecked => "unchecked",
            TuneState::Compliant => "compliant",
            TuneState::NonCompliant => "non-compliant",
            TuneState::Remediated => "remediated",
            TuneState::RemediationFailed => "remediation failed",
            TuneState::CheckFailed => "check failed",
            TuneState::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// Events that drive a tune invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuneEvent {
    /// Checker read the value and the predicate held
    CheckPassed,
    /// Checker read the value and the predicate failed
    CheckNotPassed,
    /// Checker could not read the value
    CheckErrored,
    /// Support query ruled out remediation
    Unsupported,
    /// Executor accepted the command
    CommandExecuted,
    /// Executor returned an error
    CommandFailed,
}

/// Result of a state transition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition was valid and state changed
    Success(TuneState),
    /// Transition was invalid from current state
    Invalid { from: TuneState, event: TuneEvent },
}

/// State machine for a single tune invocation
#[derive(Debug)]
pub struct TuneStateMachine {
    checker_id: &'static str,
    current_state: TuneState,
}

impl TuneStateMachine {
    /// Create a new state machine in Unchecked state
    pub fn new(checker_id: &'static str) -> Self {
        Self {
            checker_id,
            current_state: TuneState::Unchecked,
        }
    }

    /// Get current state
    pub fn state(&self) -> TuneState {
        self.current_state
    }

    /// Process an event and return the transition result
    pub fn process_event(&mut self, event: TuneEvent) -> TransitionResult {
        match self.get_next_state(event) {
            Some(state) => {
                tracing::debug!(
                    "Tunable '{}': {} -> {}",
                    self.checker_id,
                    self.current_state,
                    state
                );
                self.current_state = state;
                TransitionResult::Success(state)
            }
            None => {
                tracing::warn!(
                    "Tunable '{}': ignoring {:?} in state {}",
                    self.checker_id,
                    event,
                    self.current_state
                );
                TransitionResult::Invalid {
                    from: self.current_state,
                    event,
                }
            }
        }
    }

    /// Get the next state for a given event, if the transition is valid
    fn get_next_state(&self, event: TuneEvent) -> Option<TuneState> {
        use TuneEvent::*;
        use TuneState::*;

        match (self.current_state, event) {
            (Unchecked, CheckPassed) => Some(Compliant),
            (Unchecked, CheckNotPassed) => Some(NonCompliant),
            (Unchecked, CheckErrored) => Some(CheckFailed),

            (NonCompliant, TuneEvent::Unsupported) => Some(TuneState::Unsupported),
            (NonCompliant, CommandExecuted) => Some(Remediated),
            (NonCompliant, CommandFailed) => Some(RemediationFailed),

            _ => None,
        }
    }
}
