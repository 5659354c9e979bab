//! Remediation commands
//!
//! A [`Command`] only describes an action. Executing it against a
//! filesystem or rendering it into a shell script is up to the executor
//! that receives it.

use crate::error::CommandError;
use crate::fs::Fs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A single remediation step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Replace the contents of a file with `contents`
    WriteFile { path: PathBuf, contents: String },
}

impl Command {
    /// Create a write-file command
    pub fn write_file(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Command::WriteFile {
            path: path.into(),
            contents: contents.into(),
        }
    }

    /// Apply the command's effect through `fs`
    pub fn execute(&self, fs: &dyn Fs) -> Result<(), CommandError> {
        match self {
            Command::WriteFile { path, contents } => {
                fs.write(path, contents)
                    .map_err(|source| CommandError::Write {
                        path: path.clone(),
                        source,
                    })
            }
        }
    }
}

/// Quote `s` for a POSIX shell unless it only holds characters that are
/// safe bare
pub fn shell_escape(s: &str) -> String {
    if !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '%' | ':'))
    {
        return s.to_string();
    }
    shell_quote(s)
}

/// Single-quote `s` for a POSIX shell, whatever it contains
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::WriteFile { path, contents } => {
                write!(
                    f,
                    "echo {} > {}",
                    shell_quote(contents),
                    shell_escape(&path.to_string_lossy())
                )
            }
        }
    }
}
