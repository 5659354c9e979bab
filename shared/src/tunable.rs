//! Tunables
//!
//! A [`Tunable`] ties a [`Checker`] to a remediation and an [`Executor`]:
//! it checks first, and only dispatches a [`Command`] when the check fails.

use crate::checker::{CheckResult, Checker};
use crate::command::Command;
use crate::error::{AccessError, RemediationError, UnsupportedError};
use crate::executor::Executor;
use crate::state_machine::{TransitionResult, TuneEvent, TuneState, TuneStateMachine};
use std::sync::Arc;
use tracing::debug;

/// Whether remediation can run on this platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Support {
    Supported,
    Unsupported { reason: String },
}

/// What a tunable does when its check fails
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remediation {
    pub command: Command,
    /// The change only takes effect after a reboot
    pub reboot_required: bool,
}

/// Outcome of one tune invocation
#[derive(Debug)]
pub enum TuneOutcome {
    /// Already compliant, nothing was done
    Compliant { check: CheckResult },
    /// The command was dispatched successfully
    Remediated {
        check: CheckResult,
        command: Command,
        reboot_required: bool,
        /// The command was only recorded and takes effect once replayed
        deferred: bool,
    },
    /// The executor failed to apply the command
    RemediationFailed {
        check: CheckResult,
        error: RemediationError,
    },
    /// The current value could not be read
    CheckFailed(AccessError),
    /// Non-compliant, but remediation is ruled out
    Unsupported {
        check: CheckResult,
        error: UnsupportedError,
    },
}

impl TuneOutcome {
    /// Terminal state this outcome corresponds to
    pub fn state(&self) -> TuneState {
        match self {
            TuneOutcome::Compliant { .. } => TuneState::Compliant,
            TuneOutcome::Remediated { .. } => TuneState::Remediated,
            TuneOutcome::RemediationFailed { .. } => TuneState::RemediationFailed,
            TuneOutcome::CheckFailed(_) => TuneState::CheckFailed,
            TuneOutcome::Unsupported { .. } => TuneState::Unsupported,
        }
    }

    /// The check result the outcome was based on, if the read succeeded
    pub fn check(&self) -> Option<&CheckResult> {
        match self {
            TuneOutcome::Compliant { check }
            | TuneOutcome::Remediated { check, .. }
            | TuneOutcome::RemediationFailed { check, .. }
            | TuneOutcome::Unsupported { check, .. } => Some(check),
            TuneOutcome::CheckFailed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.state().is_failure()
    }

    pub fn is_reboot_required(&self) -> bool {
        matches!(
            self,
            TuneOutcome::Remediated {
                reboot_required: true,
                ..
            }
        )
    }
}

/// One configuration item that can be checked and tuned
pub trait Tunable: Send + Sync {
    /// Identifier of the underlying checker
    fn id(&self) -> &'static str;

    /// Whether remediation can run here
    fn check_if_supported(&self) -> Support;

    /// Run only the check
    fn check(&self) -> Result<CheckResult, AccessError>;

    /// Check, and remediate if needed
    fn tune(&self) -> TuneOutcome;
}

type RemediationFn = Box<dyn Fn() -> Remediation + Send + Sync>;
type SupportFn = Box<dyn Fn() -> Support + Send + Sync>;

/// Tunable that remediates only when its checker fails
pub struct CheckedTunable {
    checker: Box<dyn Checker>,
    remediation: RemediationFn,
    support: SupportFn,
    executor: Arc<dyn Executor>,
}

impl CheckedTunable {
    /// Bind a checker, remediation, support query and executor
    pub fn new(
        checker: impl Checker + 'static,
        remediation: impl Fn() -> Remediation + Send + Sync + 'static,
        support: impl Fn() -> Support + Send + Sync + 'static,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            checker: Box::new(checker),
            remediation: Box::new(remediation),
            support: Box::new(support),
            executor,
        }
    }

    /// The checker this tunable is bound to
    pub fn checker(&self) -> &dyn Checker {
        self.checker.as_ref()
    }
}

impl Tunable for CheckedTunable {
    fn id(&self) -> &'static str {
        self.checker.id()
    }

    fn check_if_supported(&self) -> Support {
        (self.support)()
    }

    fn check(&self) -> Result<CheckResult, AccessError> {
        self.checker.check()
    }

    fn tune(&self) -> TuneOutcome {
        let mut fsm = TuneStateMachine::new(self.checker.id());
        let outcome = self.drive(&mut fsm);
        debug_assert_eq!(
            fsm.state(),
            outcome.state(),
            "outcome of '{}' diverged from its state machine",
            self.checker.id()
        );
        outcome
    }
}

impl CheckedTunable {
    /// Run one invocation, feeding every step through `fsm`
    fn drive(&self, fsm: &mut TuneStateMachine) -> TuneOutcome {
        let check = match self.checker.check() {
            Ok(check) => check,
            Err(e) => {
                advance(fsm, TuneEvent::CheckErrored);
                return TuneOutcome::CheckFailed(e);
            }
        };

        if check.is_ok {
            advance(fsm, TuneEvent::CheckPassed);
            debug!("Checker '{}' result is Ok, no need to tune", check.desc);
            return TuneOutcome::Compliant { check };
        }
        advance(fsm, TuneEvent::CheckNotPassed);

        if let Support::Unsupported { reason } = self.check_if_supported() {
            advance(fsm, TuneEvent::Unsupported);
            return TuneOutcome::Unsupported {
                check,
                error: UnsupportedError { reason },
            };
        }

        let Remediation {
            command,
            reboot_required,
        } = (self.remediation)();
        debug!(
            "Tuning '{}': {} -> {} via {}",
            check.desc, check.current, check.required, command
        );

        match self.executor.execute(&command) {
            Ok(()) => {
                advance(fsm, TuneEvent::CommandExecuted);
                TuneOutcome::Remediated {
                    check,
                    command,
                    reboot_required,
                    deferred: self.executor.is_lazy(),
                }
            }
            Err(source) => {
                advance(fsm, TuneEvent::CommandFailed);
                TuneOutcome::RemediationFailed {
                    check,
                    error: RemediationError {
                        command: command.to_string(),
                        source,
                    },
                }
            }
        }
    }
}

/// Apply `event`; the tune sequence only ever issues valid transitions
fn advance(fsm: &mut TuneStateMachine, event: TuneEvent) {
    if let TransitionResult::Invalid { from, event } = fsm.process_event(event) {
        debug_assert!(false, "invalid tune transition {:?} from {}", event, from);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{IntChecker, Severity};
    use crate::executor::{DirectExecutor, Script, ScriptExecutor};
    use crate::fs::{read_int_from_file, MemFs};
    use std::io;
    use std::path::Path;

    const PATH: &str = "/proc/sys/test/limit";
    const REQUIRED: i64 = 1048576;

    fn limit_checker(fs: MemFs) -> IntChecker {
        IntChecker::new(
            "test_limit",
            "Test limit",
            Severity::Warning,
            |current| current >= REQUIRED,
            || format!(">= {}", REQUIRED),
            move || read_int_from_file(&fs, Path::new(PATH)),
        )
    }

    fn limit_tunable(fs: MemFs, executor: Arc<dyn Executor>, reboot_required: bool) -> CheckedTunable {
        CheckedTunable::new(
            limit_checker(fs),
            move || Remediation {
                command: Command::write_file(PATH, REQUIRED.to_string()),
                reboot_required,
            },
            || Support::Supported,
            executor,
        )
    }

    #[test]
    fn test_compliant_does_nothing() {
        let fs = MemFs::with_file(PATH, "2097152\n");
        let tunable = limit_tunable(fs.clone(), Arc::new(DirectExecutor::new(Arc::new(fs.clone()))), false);

        let outcome = tunable.tune();
        assert!(matches!(outcome, TuneOutcome::Compliant { .. }));
        assert!(!outcome.is_reboot_required());
        assert_eq!(fs.write_count(), 0);
    }

    #[test]
    fn test_direct_remediation() {
        let fs = MemFs::with_file(PATH, "65536\n");
        let tunable = limit_tunable(fs.clone(), Arc::new(DirectExecutor::new(Arc::new(fs.clone()))), false);

        match tunable.tune() {
            TuneOutcome::Remediated {
                check,
                command,
                reboot_required,
                deferred,
            } => {
                assert_eq!(check.current, "65536");
                assert_eq!(command, Command::write_file(PATH, "1048576"));
                assert!(!reboot_required);
                assert!(!deferred);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(fs.contents(PATH).as_deref(), Some("1048576\n"));
    }

    #[test]
    fn test_second_invocation_is_compliant() {
        let fs = MemFs::with_file(PATH, "65536\n");
        let tunable = limit_tunable(fs.clone(), Arc::new(DirectExecutor::new(Arc::new(fs.clone()))), false);

        assert_eq!(tunable.tune().state(), TuneState::Remediated);
        assert_eq!(tunable.tune().state(), TuneState::Compliant);
        assert_eq!(fs.write_count(), 1);
    }

    #[test]
    fn test_remediation_failure_keeps_cause() {
        let fs = MemFs::with_file(PATH, "65536\n");
        fs.set_read_only(PATH);
        let tunable = limit_tunable(fs.clone(), Arc::new(DirectExecutor::new(Arc::new(fs.clone()))), false);

        let outcome = tunable.tune();
        assert!(outcome.is_failed());
        match outcome {
            TuneOutcome::RemediationFailed { error, .. } => {
                assert_eq!(
                    error.source.io_error().map(io::Error::kind),
                    Some(io::ErrorKind::PermissionDenied)
                );
                assert_eq!(error.command, "echo '1048576' > /proc/sys/test/limit");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(fs.contents(PATH).as_deref(), Some("65536\n"));
    }

    #[test]
    fn test_missing_file_is_check_failure() {
        let fs = MemFs::new();
        let tunable = limit_tunable(fs.clone(), Arc::new(DirectExecutor::new(Arc::new(fs.clone()))), false);

        let outcome = tunable.tune();
        assert!(matches!(outcome, TuneOutcome::CheckFailed(AccessError::Read { .. })));
        assert!(outcome.check().is_none());
        assert_eq!(fs.write_count(), 0);
    }

    #[test]
    fn test_garbage_value_is_check_failure() {
        let fs = MemFs::with_file(PATH, "lots\n");
        let tunable = limit_tunable(fs.clone(), Arc::new(DirectExecutor::new(Arc::new(fs.clone()))), false);

        match tunable.tune() {
            TuneOutcome::CheckFailed(AccessError::Parse { path, raw, .. }) => {
                assert_eq!(path, Path::new(PATH));
                assert_eq!(raw, "lots");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(fs.write_count(), 0);
        assert_eq!(fs.contents(PATH).as_deref(), Some("lots\n"));
    }

    #[test]
    fn test_machine_ends_in_outcome_state() {
        let compliant = MemFs::with_file(PATH, "2097152\n");
        let low = MemFs::with_file(PATH, "65536\n");
        let read_only = MemFs::with_file(PATH, "65536\n");
        read_only.set_read_only(PATH);
        let missing = MemFs::new();

        let cases = [
            (compliant, TuneState::Compliant),
            (low, TuneState::Remediated),
            (read_only, TuneState::RemediationFailed),
            (missing, TuneState::CheckFailed),
        ];
        for (fs, expected) in cases {
            let tunable = limit_tunable(fs.clone(), Arc::new(DirectExecutor::new(Arc::new(fs))), false);
            let mut fsm = TuneStateMachine::new(tunable.id());
            let outcome = tunable.drive(&mut fsm);
            assert_eq!(outcome.state(), expected);
            assert_eq!(fsm.state(), expected);
            assert!(fsm.state().is_terminal());
        }

        let fs = MemFs::with_file(PATH, "65536\n");
        let tunable = CheckedTunable::new(
            limit_checker(fs.clone()),
            || Remediation {
                command: Command::write_file(PATH, "1048576"),
                reboot_required: false,
            },
            || Support::Unsupported {
                reason: "not on this kernel".into(),
            },
            Arc::new(DirectExecutor::new(Arc::new(fs))),
        );
        let mut fsm = TuneStateMachine::new(tunable.id());
        assert_eq!(tunable.drive(&mut fsm).state(), TuneState::Unsupported);
        assert_eq!(fsm.state(), TuneState::Unsupported);
    }

    #[test]
    fn test_script_executor_leaves_environment_untouched() {
        let fs = MemFs::with_file(PATH, "65536\n");
        let script = Script::shared();
        let tunable = limit_tunable(fs.clone(), Arc::new(ScriptExecutor::new(script.clone())), false);

        let outcome = tunable.tune();
        assert!(matches!(outcome, TuneOutcome::Remediated { deferred: true, .. }));
        assert_eq!(fs.contents(PATH).as_deref(), Some("65536\n"));
        assert_eq!(fs.write_count(), 0);

        let script = script.lock().unwrap();
        assert_eq!(script.commands(), &[Command::write_file(PATH, "1048576")]);
    }

    #[test]
    fn test_reboot_flag_comes_from_remediation() {
        let fs = MemFs::with_file(PATH, "65536\n");
        let tunable = limit_tunable(fs.clone(), Arc::new(DirectExecutor::new(Arc::new(fs))), true);
        assert!(tunable.tune().is_reboot_required());
    }

    #[test]
    fn test_unsupported_short_circuits() {
        let fs = MemFs::with_file(PATH, "65536\n");
        let script = Script::shared();
        let tunable = CheckedTunable::new(
            limit_checker(fs.clone()),
            || Remediation {
                command: Command::write_file(PATH, "1048576"),
                reboot_required: false,
            },
            || Support::Unsupported {
                reason: "not on this kernel".into(),
            },
            Arc::new(ScriptExecutor::new(script.clone())),
        );

        match tunable.tune() {
            TuneOutcome::Unsupported { error, .. } => assert_eq!(error.reason, "not on this kernel"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(script.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unsupported_but_compliant_is_compliant() {
        let fs = MemFs::with_file(PATH, "1048576\n");
        let tunable = CheckedTunable::new(
            limit_checker(fs.clone()),
            || Remediation {
                command: Command::write_file(PATH, "1048576"),
                reboot_required: false,
            },
            || Support::Unsupported {
                reason: "not on this kernel".into(),
            },
            Arc::new(DirectExecutor::new(Arc::new(fs))),
        );
        assert_eq!(tunable.tune().state(), TuneState::Compliant);
    }
}
