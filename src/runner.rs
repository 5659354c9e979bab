//! Runs checks and tunes across the selected tunables

use crate::config::{ExecutionMode, Mode, TuneConfig};
use crate::report::TunerReport;
use crate::tuners::{self, NamedTunable, TunerContext};
use anyhow::{Context, Result};
use futures::future::join_all;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use sysctune_shared::{DirectExecutor, Executor, Script, ScriptExecutor, SharedScript};
use tracing::{debug, info};

/// Drives the tunables of one run
pub struct TuneRunner {
    tunables: Vec<NamedTunable>,
    /// Set when changes are recorded instead of applied
    script: Option<SharedScript>,
}

impl TuneRunner {
    /// Build the executor and the selected tunables from `config`
    pub fn from_config(config: &TuneConfig) -> Result<Self> {
        let fs = config.fs();
        let mut script = None;
        let executor: Arc<dyn Executor> = match &config.execution {
            ExecutionMode::Direct => Arc::new(DirectExecutor::new(fs.clone())),
            ExecutionMode::Script { .. } => {
                let shared = Script::shared();
                script = Some(shared.clone());
                Arc::new(ScriptExecutor::new(shared))
            }
        };

        let ctx = TunerContext { fs, executor };
        let tunables = tuners::build_tuners(&config.tuners, &ctx)?;
        debug!("Selected {} tuner(s)", tunables.len());

        Ok(Self { tunables, script })
    }

    /// Run every checker concurrently on the blocking pool
    pub async fn check_all(&self) -> Result<Vec<TunerReport>> {
        let handles = self.tunables.iter().cloned().map(|named| {
            tokio::task::spawn_blocking(move || {
                TunerReport::from_check(named.name, named.tunable.check())
            })
        });

        join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.context("Checker task panicked"))
            .collect()
    }

    /// Tune sequentially, in registration order, so recorded scripts are stable
    pub async fn tune_all(&self) -> Result<Vec<TunerReport>> {
        let tunables = self.tunables.clone();
        let reports = tokio::task::spawn_blocking(move || {
            tunables
                .iter()
                .map(|named| {
                    let outcome = named.tunable.tune();
                    info!("Tuner '{}': {}", named.name, outcome.state());
                    TunerReport::from_outcome(named.name, outcome)
                })
                .collect::<Vec<_>>()
        })
        .await
        .context("Tuner task panicked")?;

        Ok(reports)
    }

    /// The script commands were recorded into, if any
    pub fn script(&self) -> Option<&SharedScript> {
        self.script.as_ref()
    }

    /// Write the recorded script if this run produces one, returning its path
    pub fn save_script<'a>(&self, config: &'a TuneConfig) -> Result<Option<&'a Path>> {
        match (self.script(), script_destination(config)) {
            (Some(script), Some(path)) => {
                write_script(script, path)?;
                Ok(Some(path))
            }
            _ => Ok(None),
        }
    }
}

/// Where the script goes; only a tune run in script mode writes one
pub fn script_destination(config: &TuneConfig) -> Option<&Path> {
    match &config.execution {
        ExecutionMode::Script { path } if config.mode == Mode::Tune => Some(path.as_path()),
        _ => None,
    }
}

/// Render the recorded commands into an executable script at `path`
pub fn write_script(script: &SharedScript, path: &Path) -> Result<()> {
    let rendered = script
        .lock()
        .map_err(|_| anyhow::anyhow!("Script buffer lock poisoned"))?
        .render_to_string();

    fs::write(path, rendered)
        .with_context(|| format!("Failed to write script {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("Failed to make {} executable", path.display()))?;
    }

    info!("Tuning script written to {}", path.display());
    Ok(())
}
