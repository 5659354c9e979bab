//! Max AIO events tuner
//!
//! Raises `fs.aio-max-nr` so the kernel accepts enough outstanding
//! asynchronous I/O events.

use std::path::Path;
use std::sync::Arc;
use sysctune_shared::{
    read_int_from_file, CheckedTunable, Command, Executor, Fs, IntChecker, Remediation, Severity,
    Support,
};
use tracing::debug;

/// Minimum number of AIO events
pub const MAX_AIO_EVENTS: i64 = 1048576;

/// Pseudo-file exposing the limit
pub const MAX_AIO_EVENTS_FILE: &str = "/proc/sys/fs/aio-max-nr";

pub const CHECKER_ID: &str = "max_aio_events";

/// Checker requiring `aio-max-nr >= MAX_AIO_EVENTS`
pub fn new_max_aio_events_checker(fs: Arc<dyn Fs>) -> IntChecker {
    IntChecker::new(
        CHECKER_ID,
        "Max AIO Events",
        Severity::Warning,
        |current| current >= MAX_AIO_EVENTS,
        || format!(">= {}", MAX_AIO_EVENTS),
        move || read_int_from_file(fs.as_ref(), Path::new(MAX_AIO_EVENTS_FILE)),
    )
}

/// Tunable writing `MAX_AIO_EVENTS` back when the check fails
pub fn new_max_aio_events_tuner(fs: Arc<dyn Fs>, executor: Arc<dyn Executor>) -> CheckedTunable {
    CheckedTunable::new(
        new_max_aio_events_checker(fs),
        || {
            debug!("Setting max AIO events to {}", MAX_AIO_EVENTS);
            Remediation {
                command: Command::write_file(MAX_AIO_EVENTS_FILE, MAX_AIO_EVENTS.to_string()),
                reboot_required: false,
            }
        },
        || Support::Supported,
        executor,
    )
}
