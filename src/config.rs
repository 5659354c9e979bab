//! Command line configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use sysctune_shared::{Fs, OsFs};

/// Check and tune host kernel settings
#[derive(Parser, Debug)]
#[command(name = "sysctune", version, about = "Check and tune host kernel settings")]
pub struct Args {
    /// Resolve /proc and /sys paths under this directory instead of /
    #[arg(long, env = "SYSCTUNE_ROOT")]
    pub root: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Action,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// List the known tuners
    List,
    /// Report whether the host is compliant without changing anything
    Check {
        /// Comma-separated tuner names (default: all)
        #[arg(long, value_delimiter = ',')]
        tuners: Vec<String>,
    },
    /// Remediate non-compliant settings
    Tune {
        /// Comma-separated tuner names (default: all)
        #[arg(long, value_delimiter = ',')]
        tuners: Vec<String>,

        /// Record changes into this shell script instead of applying them
        #[arg(long)]
        output_script: Option<PathBuf>,
    },
}

/// How results are printed
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// What the run does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    List,
    #[default]
    Check,
    Tune,
}

/// How remediation commands are carried out
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Apply changes immediately
    #[default]
    Direct,
    /// Record changes into a script at `path`
    Script { path: PathBuf },
}

/// Resolved configuration for one run
#[derive(Debug, Clone, Default)]
pub struct TuneConfig {
    pub mode: Mode,
    /// Filesystem root; `None` means the real `/`
    pub root: Option<PathBuf>,
    pub format: OutputFormat,
    /// Selected tuners; empty means all
    pub tuners: Vec<String>,
    pub execution: ExecutionMode,
}

impl TuneConfig {
    /// Filesystem the tuners read and write through
    pub fn fs(&self) -> Arc<dyn Fs> {
        match &self.root {
            Some(root) => Arc::new(OsFs::with_root(root)),
            None => Arc::new(OsFs::new()),
        }
    }
}

impl From<Args> for TuneConfig {
    fn from(args: Args) -> Self {
        let base = TuneConfig {
            root: args.root,
            format: args.format,
            ..Default::default()
        };

        match args.command {
            Action::List => TuneConfig {
                mode: Mode::List,
                ..base
            },
            Action::Check { tuners } => TuneConfig {
                mode: Mode::Check,
                tuners,
                ..base
            },
            Action::Tune {
                tuners,
                output_script,
            } => TuneConfig {
                mode: Mode::Tune,
                tuners,
                execution: match output_script {
                    Some(path) => ExecutionMode::Script { path },
                    None => ExecutionMode::Direct,
                },
                ..base
            },
        }
    }
}
