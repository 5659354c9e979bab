//! Command executors
//!
//! An [`Executor`] either applies a [`Command`] right away
//! ([`DirectExecutor`]) or records it into a [`Script`] to be replayed later
//! ([`ScriptExecutor`]). Tunables treat both the same way; `is_lazy` only
//! changes how the outcome is reported.

use crate::command::Command;
use crate::error::ExecutorError;
use crate::fs::Fs;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Header written at the top of every rendered script
pub const SCRIPT_HEADER: &str = "#!/bin/bash\n\
\n\
# sysctune tuning script\n\
# ----------------------------------\n\
# This file was generated by sysctune\n\
\n";

/// Strategy for carrying out a command
pub trait Executor: Send + Sync {
    /// Carry out (or record) `cmd`
    fn execute(&self, cmd: &Command) -> Result<(), ExecutorError>;

    /// Whether commands only take effect once a recorded script is run
    fn is_lazy(&self) -> bool;
}

/// Applies commands to the environment immediately
pub struct DirectExecutor {
    fs: Arc<dyn Fs>,
}

impl DirectExecutor {
    /// Create an executor writing through `fs`
    pub fn new(fs: Arc<dyn Fs>) -> Self {
        Self { fs }
    }
}

impl Executor for DirectExecutor {
    fn execute(&self, cmd: &Command) -> Result<(), ExecutorError> {
        debug!("Executing: {}", cmd);
        cmd.execute(self.fs.as_ref())?;
        Ok(())
    }

    fn is_lazy(&self) -> bool {
        false
    }
}

/// Commands recorded for later replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    commands: Vec<Command>,
}

/// A script buffer that several executors (or tunables) can append to.
/// The caller creating it is responsible for its lifetime.
pub type SharedScript = Arc<Mutex<Script>>;

impl Script {
    /// Create an empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty script ready to be shared between executors
    pub fn shared() -> SharedScript {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Append a command
    pub fn push(&mut self, cmd: Command) {
        self.commands.push(cmd);
    }

    /// Recorded commands in order
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of recorded commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Render the header followed by one line per command
    pub fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        w.write_all(self.render_to_string().as_bytes())?;
        w.flush()
    }

    /// Render the script into a string
    pub fn render_to_string(&self) -> String {
        let mut out = String::from(SCRIPT_HEADER);
        for cmd in &self.commands {
            out.push_str(&cmd.to_string());
            out.push('\n');
        }
        out
    }
}

/// Records commands into a shared [`Script`] without touching the environment
pub struct ScriptExecutor {
    script: SharedScript,
}

impl ScriptExecutor {
    /// Create an executor appending to `script`
    pub fn new(script: SharedScript) -> Self {
        Self { script }
    }

    /// The script this executor appends to
    pub fn script(&self) -> SharedScript {
        self.script.clone()
    }
}

impl Executor for ScriptExecutor {
    fn execute(&self, cmd: &Command) -> Result<(), ExecutorError> {
        let mut script = self
            .script
            .lock()
            .map_err(|_| ExecutorError::ScriptPoisoned {
                command: cmd.to_string(),
            })?;
        debug!("Recording: {}", cmd);
        script.push(cmd.clone());
        Ok(())
    }

    fn is_lazy(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemFs;

    const AIO_FILE: &str = "/proc/sys/fs/aio-max-nr";

    #[test]
    fn test_direct_executor_applies() {
        let fs = MemFs::with_file(AIO_FILE, "65536\n");
        let executor = DirectExecutor::new(Arc::new(fs.clone()));

        assert!(!executor.is_lazy());
        executor
            .execute(&Command::write_file(AIO_FILE, "1048576"))
            .unwrap();
        assert_eq!(fs.contents(AIO_FILE).as_deref(), Some("1048576\n"));
    }

    #[test]
    fn test_direct_executor_surfaces_error() {
        let fs = MemFs::with_file(AIO_FILE, "65536\n");
        fs.set_read_only(AIO_FILE);
        let executor = DirectExecutor::new(Arc::new(fs));

        let err = executor
            .execute(&Command::write_file(AIO_FILE, "1048576"))
            .unwrap_err();
        assert_eq!(
            err.io_error().map(io::Error::kind),
            Some(io::ErrorKind::PermissionDenied)
        );
    }

    #[test]
    fn test_script_executor_records_only() {
        let script = Script::shared();
        let executor = ScriptExecutor::new(script.clone());
        let cmd = Command::write_file(AIO_FILE, "1048576");

        assert!(executor.is_lazy());
        executor.execute(&cmd).unwrap();

        let script = script.lock().unwrap();
        assert_eq!(script.commands(), &[cmd]);
    }

    #[test]
    fn test_script_executor_poisoned_buffer() {
        let script = Script::shared();
        let poisoner = script.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the script buffer");
        })
        .join();

        let executor = ScriptExecutor::new(script);
        let result = executor.execute(&Command::write_file(AIO_FILE, "1048576"));
        assert!(matches!(result, Err(ExecutorError::ScriptPoisoned { .. })));
    }

    #[test]
    fn test_script_render() {
        let mut script = Script::new();
        assert!(script.is_empty());
        script.push(Command::write_file(AIO_FILE, "1048576"));

        let rendered = script.render_to_string();
        assert!(rendered.starts_with("#!/bin/bash\n"));
        assert!(rendered.ends_with("echo '1048576' > /proc/sys/fs/aio-max-nr\n"));
        assert_eq!(script.len(), 1);

        let mut written = Vec::new();
        script.render(&mut written).unwrap();
        assert_eq!(String::from_utf8(written).unwrap(), rendered);
    }

    #[test]
    fn test_script_replays_quoted_command() {
        let mut script = Script::new();
        script.push(Command::write_file("/tmp/my dir/f", "it's"));

        let rendered = script.render_to_string();
        assert_eq!(rendered.lines().last(), Some(r"echo 'it'\''s' > '/tmp/my dir/f'"));
    }
}
