//! Error taxonomy for checking and tuning
//!
//! Reading the current state, applying a command and platform support are
//! separate failure classes so callers never confuse "can't read" with
//! "non-compliant" or "fix failed".

use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;
use thiserror::Error;

/// Reading the current value from the environment failed
#[derive(Error, Debug)]
pub enum AccessError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse '{raw}' from {path} as an integer: {source}")]
    Parse {
        path: PathBuf,
        raw: String,
        #[source]
        source: ParseIntError,
    },
}

/// Applying a single command against the environment failed
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// An executor could not carry out (or record) a command
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Failed to record '{command}': script buffer lock poisoned")]
    ScriptPoisoned { command: String },
}

impl ExecutorError {
    /// The I/O error at the bottom of this failure, if there is one
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            ExecutorError::Command(CommandError::Write { source, .. }) => Some(source),
            ExecutorError::ScriptPoisoned { .. } => None,
        }
    }
}

/// Remediation of a non-compliant tunable failed
#[derive(Error, Debug)]
#[error("Remediation '{command}' failed: {source}")]
pub struct RemediationError {
    /// Shell rendering of the command that was dispatched
    pub command: String,
    #[source]
    pub source: ExecutorError,
}

/// The platform or a precondition rules out remediation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Tuning is not supported: {reason}")]
pub struct UnsupportedError {
    pub reason: String,
}
