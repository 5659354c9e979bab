//! Compliance checkers
//!
//! A [`Checker`] reads a value from the environment and compares it with a
//! requirement. Reading is delegated to an accessor closure so the checker
//! itself never does I/O directly.

use crate::error::AccessError;
use serde::Serialize;
use std::fmt;

/// How bad a failing check is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The system will not work correctly
    Fatal,
    /// The system works, but below expectations
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Fatal => write!(f, "fatal"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Result of a successful read-and-compare
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub checker_id: &'static str,
    pub desc: &'static str,
    pub severity: Severity,
    pub is_ok: bool,
    pub current: String,
    pub required: String,
}

/// Read-and-compare logic for one configuration item
pub trait Checker: Send + Sync {
    /// Stable identifier of the checked item
    fn id(&self) -> &'static str;

    /// Human-readable name
    fn desc(&self) -> &'static str;

    fn severity(&self) -> Severity;

    /// The required condition as text, e.g. `>= 1048576`
    fn required_as_string(&self) -> String;

    /// Read the current value and evaluate it
    fn check(&self) -> Result<CheckResult, AccessError>;
}

type Predicate = Box<dyn Fn(i64) -> bool + Send + Sync>;
type Requirement = Box<dyn Fn() -> String + Send + Sync>;
type Accessor = Box<dyn Fn() -> Result<i64, AccessError> + Send + Sync>;

/// Checker for integer-valued tunables
pub struct IntChecker {
    id: &'static str,
    desc: &'static str,
    severity: Severity,
    predicate: Predicate,
    required: Requirement,
    accessor: Accessor,
}

impl IntChecker {
    /// Create a checker from its predicate, requirement text and accessor
    pub fn new(
        id: &'static str,
        desc: &'static str,
        severity: Severity,
        predicate: impl Fn(i64) -> bool + Send + Sync + 'static,
        required: impl Fn() -> String + Send + Sync + 'static,
        accessor: impl Fn() -> Result<i64, AccessError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            desc,
            severity,
            predicate: Box::new(predicate),
            required: Box::new(required),
            accessor: Box::new(accessor),
        }
    }
}

impl Checker for IntChecker {
    fn id(&self) -> &'static str {
        self.id
    }

    fn desc(&self) -> &'static str {
        self.desc
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn required_as_string(&self) -> String {
        (self.required)()
    }

    fn check(&self) -> Result<CheckResult, AccessError> {
        let current = (self.accessor)()?;
        Ok(CheckResult {
            checker_id: self.id,
            desc: self.desc,
            severity: self.severity,
            is_ok: (self.predicate)(current),
            current: current.to_string(),
            required: self.required_as_string(),
        })
    }
}
