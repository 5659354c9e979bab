mod config;
mod report;
mod runner;
mod tuners;

use anyhow::Result;
use clap::Parser;
use config::{Args, Mode, OutputFormat, TuneConfig};
use runner::TuneRunner;
use std::process::ExitCode;

use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize tracing; stdout is reserved for results
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();

    let config = TuneConfig::from(Args::parse());
    debug!("Configuration: {:?}", config);

    if config.mode == Mode::List {
        for name in tuners::available_tuners() {
            println!("{}", name);
        }
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(root) = &config.root {
        info!("Using filesystem root {}", root.display());
    }

    let runner = TuneRunner::from_config(&config)?;
    let reports = match config.mode {
        Mode::Check => runner.check_all().await?,
        _ => runner.tune_all().await?,
    };

    let script_path = runner.save_script(&config)?;

    match config.format {
        OutputFormat::Text => print!("{}", report::render_text(&reports, script_path)),
        OutputFormat::Json => println!("{}", report::render_json(&reports)?),
    }

    let failures = report::failure_count(&reports);
    if failures > 0 {
        warn!("{} tuner(s) failed", failures);
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
