//! Rendering of check and tune results

use serde::Serialize;
use std::path::Path;
use sysctune_shared::{AccessError, CheckResult, Command, Severity, TuneOutcome};

/// Per-tuner status shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Check-only: requirement met
    Ok,
    /// Check-only: requirement not met
    NotOk,
    Compliant,
    Remediated,
    RemediationFailed,
    CheckFailed,
    Unsupported,
}

impl ReportStatus {
    fn label(&self) -> &'static str {
        match self {
            ReportStatus::Ok => "ok",
            ReportStatus::NotOk => "not ok",
            ReportStatus::Compliant => "compliant",
            ReportStatus::Remediated => "remediated",
            ReportStatus::RemediationFailed => "remediation failed",
            ReportStatus::CheckFailed => "check failed",
            ReportStatus::Unsupported => "unsupported",
        }
    }
}

/// Result line for one tuner
#[derive(Debug, Clone, Serialize)]
pub struct TunerReport {
    pub tuner: &'static str,
    pub desc: Option<&'static str>,
    pub status: ReportStatus,
    pub severity: Option<Severity>,
    pub current: Option<String>,
    pub required: Option<String>,
    pub reboot_required: bool,
    /// The change was only recorded into a script
    pub deferred: bool,
    pub command: Option<Command>,
    pub error: Option<String>,
}

impl TunerReport {
    fn new(tuner: &'static str, status: ReportStatus, check: Option<&CheckResult>) -> Self {
        Self {
            tuner,
            desc: check.map(|c| c.desc),
            status,
            severity: check.map(|c| c.severity),
            current: check.map(|c| c.current.clone()),
            required: check.map(|c| c.required.clone()),
            reboot_required: false,
            deferred: false,
            command: None,
            error: None,
        }
    }

    /// Report for a check-only run
    pub fn from_check(tuner: &'static str, result: Result<CheckResult, AccessError>) -> Self {
        match result {
            Ok(check) => {
                let status = if check.is_ok {
                    ReportStatus::Ok
                } else {
                    ReportStatus::NotOk
                };
                Self::new(tuner, status, Some(&check))
            }
            Err(e) => Self {
                error: Some(e.to_string()),
                ..Self::new(tuner, ReportStatus::CheckFailed, None)
            },
        }
    }

    /// Report for a tune run
    pub fn from_outcome(tuner: &'static str, outcome: TuneOutcome) -> Self {
        match outcome {
            TuneOutcome::Compliant { check } => {
                Self::new(tuner, ReportStatus::Compliant, Some(&check))
            }
            TuneOutcome::Remediated {
                check,
                command,
                reboot_required,
                deferred,
            } => Self {
                reboot_required,
                deferred,
                command: Some(command),
                ..Self::new(tuner, ReportStatus::Remediated, Some(&check))
            },
            TuneOutcome::RemediationFailed { check, error } => Self {
                error: Some(error.to_string()),
                ..Self::new(tuner, ReportStatus::RemediationFailed, Some(&check))
            },
            TuneOutcome::CheckFailed(e) => Self {
                error: Some(e.to_string()),
                ..Self::new(tuner, ReportStatus::CheckFailed, None)
            },
            TuneOutcome::Unsupported { check, error } => Self {
                error: Some(error.to_string()),
                ..Self::new(tuner, ReportStatus::Unsupported, Some(&check))
            },
        }
    }

    /// Whether this result should make the run exit non-zero
    pub fn is_failure(&self) -> bool {
        match self.status {
            ReportStatus::CheckFailed | ReportStatus::RemediationFailed => true,
            ReportStatus::NotOk => self.severity == Some(Severity::Fatal),
            _ => false,
        }
    }
}

/// Render reports as an aligned table followed by follow-up notes
pub fn render_text(reports: &[TunerReport], script: Option<&Path>) -> String {
    let mut out = table_row("TUNER", "STATUS", "CURRENT", "REQUIRED", "DETAIL");

    for report in reports {
        let detail = match (&report.error, &report.command) {
            (Some(error), _) => error.clone(),
            (None, Some(command)) => command.to_string(),
            (None, None) => report.desc.unwrap_or_default().to_string(),
        };
        out.push_str(&table_row(
            report.tuner,
            report.status.label(),
            report.current.as_deref().unwrap_or("-"),
            report.required.as_deref().unwrap_or("-"),
            &detail,
        ));
    }

    if reports.iter().any(|r| r.deferred) {
        match script {
            Some(path) => out.push_str(&format!(
                "\nChanges were recorded in {} and take effect once it is run.\n",
                path.display()
            )),
            None => out.push_str("\nChanges were recorded and take effect once replayed.\n"),
        }
    }
    if reports.iter().any(|r| r.reboot_required) {
        out.push_str("\nA reboot is required for some changes to take effect.\n");
    }
    out
}

fn table_row(tuner: &str, status: &str, current: &str, required: &str, detail: &str) -> String {
    format!(
        "{:<16} {:<20} {:<12} {:<12} {}\n",
        tuner, status, current, required, detail
    )
}

/// Number of reports that make the run exit non-zero
pub fn failure_count(reports: &[TunerReport]) -> usize {
    reports.iter().filter(|r| r.is_failure()).count()
}

/// Render reports as pretty-printed JSON
pub fn render_json(reports: &[TunerReport]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(reports)
}
