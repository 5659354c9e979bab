//! Registry of the tuners sysctune knows about

pub mod aio;

use anyhow::{bail, Result};
use std::sync::Arc;
use sysctune_shared::{Executor, Fs, Tunable};

/// Bindings shared by every tuner built for one run
#[derive(Clone)]
pub struct TunerContext {
    pub fs: Arc<dyn Fs>,
    pub executor: Arc<dyn Executor>,
}

type TunerFactory = fn(&TunerContext) -> Arc<dyn Tunable>;

/// Known tuners, in the order they run
const TUNERS: &[(&str, TunerFactory)] = &[("aio_events", aio_events)];

fn aio_events(ctx: &TunerContext) -> Arc<dyn Tunable> {
    Arc::new(aio::new_max_aio_events_tuner(
        ctx.fs.clone(),
        ctx.executor.clone(),
    ))
}

/// A tunable together with the name it was selected by
#[derive(Clone)]
pub struct NamedTunable {
    pub name: &'static str,
    pub tunable: Arc<dyn Tunable>,
}

/// Names of all known tuners
pub fn available_tuners() -> impl Iterator<Item = &'static str> {
    TUNERS.iter().map(|(name, _)| *name)
}

/// Build the selected tuners; an empty selection means all of them
pub fn build_tuners(selected: &[String], ctx: &TunerContext) -> Result<Vec<NamedTunable>> {
    for name in selected {
        if !TUNERS.iter().any(|(known, _)| *known == name.as_str()) {
            bail!(
                "Unknown tuner '{}' (available: {})",
                name,
                available_tuners().collect::<Vec<_>>().join(", ")
            );
        }
    }

    Ok(TUNERS
        .iter()
        .filter(|(name, _)| selected.is_empty() || selected.iter().any(|s| s.as_str() == *name))
        .map(|&(name, factory)| NamedTunable {
            name,
            tunable: factory(ctx),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysctune_shared::{DirectExecutor, MemFs};

    fn context() -> TunerContext {
        let fs: Arc<dyn Fs> = Arc::new(MemFs::new());
        TunerContext {
            executor: Arc::new(DirectExecutor::new(fs.clone())),
            fs,
        }
    }

    #[test]
    fn test_available_tuners() {
        assert_eq!(available_tuners().collect::<Vec<_>>(), vec!["aio_events"]);
    }

    #[test]
    fn test_empty_selection_builds_all() {
        let tuners = build_tuners(&[], &context()).unwrap();
        assert_eq!(tuners.len(), 1);
        assert_eq!(tuners[0].name, "aio_events");
        assert_eq!(tuners[0].tunable.id(), aio::CHECKER_ID);
    }

    #[test]
    fn test_unknown_tuner_rejected() {
        let err = build_tuners(&["swappiness".to_string()], &context())
            .err()
            .unwrap();
        assert!(err.to_string().contains("Unknown tuner 'swappiness'"));
    }
}
