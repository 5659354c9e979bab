//! sysctune Shared Tuning Types
//!
//! This crate provides the check / tune / execute building blocks used by
//! the `sysctune` binary: checkers read a value and compare it with a
//! requirement, tunables remediate failing checks, and executors either
//! apply the resulting commands or record them into a script.

pub mod checker;
pub mod command;
pub mod error;
pub mod executor;
pub mod fs;
pub mod state_machine;
pub mod tunable;

// Re-export commonly used types at crate root
pub use checker::{CheckResult, Checker, IntChecker, Severity};
pub use command::Command;
pub use error::{AccessError, CommandError, ExecutorError, RemediationError, UnsupportedError};
pub use executor::{DirectExecutor, Executor, Script, ScriptExecutor, SharedScript};
pub use fs::{read_int_from_file, Fs, MemFs, OsFs};
pub use state_machine::{TuneEvent, TuneState, TuneStateMachine};
pub use tunable::{CheckedTunable, Remediation, Support, TuneOutcome, Tunable};
