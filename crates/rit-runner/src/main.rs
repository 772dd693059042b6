//! # rit-runner
//!
//! Main entry point for the participation-rate execution algorithm.
//!
//! Loads a JSON configuration file, connects to the RIT REST API (or an
//! in-memory paper market with `--paper`), and drives the position toward the
//! configured target until the target is reached or the session ends.
//!
//! # Usage
//!
//! ```bash
//! rit-runner config.json --log-level info
//! rit-runner config.json --paper
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use rit_algo::{Driver, DriverConfig, RunOutcome};
use rit_core::logging::{FileFormat, LogOptions, init_logging};
use rit_td::Exchange;
use rit_td::rit::RitTd;
use rit_td::sim::SimExchange;
use tracing::{error, info, warn};

/// RIT participation-rate execution runner.
#[derive(Parser)]
#[command(name = "rit-runner", about = "RIT participation-rate execution runner")]
struct Cli {
    /// Configuration file path (JSON).
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output. Overrides `module.log_path`.
    #[arg(long)]
    log_dir: Option<String>,

    /// Write log files as newline-delimited JSON.
    #[arg(long)]
    log_json: bool,

    /// Trade against the in-memory simulated exchange instead of the RIT API.
    #[arg(long)]
    paper: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // 1. Load configuration (logging needs the module name from it)
    let config = rit_core::config::load_config(&cli.config)?;

    // 2. Initialize logging
    let log_dir = cli.log_dir.clone().or_else(|| config.log_path());
    let module_name = config.module_name();
    let _log_guard = init_logging(&LogOptions {
        level: &cli.log_level,
        dir: log_dir.as_deref(),
        module_name: &module_name,
        file_format: if cli.log_json { FileFormat::Json } else { FileFormat::Text },
    });

    info!(
        "rit-runner starting — config={}, log_level={}, paper={}",
        cli.config.display(),
        cli.log_level,
        cli.paper,
    );

    // 3. Build the exchange connection
    let exchange: Arc<dyn Exchange> = if cli.paper {
        Arc::new(SimExchange::new(config.algo.ticker.clone(), config.sim.clone()))
    } else {
        Arc::new(RitTd::new(&config.exchange)?)
    };

    let driver_config = DriverConfig::from(&config.algo);
    info!(
        "exchange '{}' ready — ticker={} target={} expected_volume={:.0}",
        exchange.name(),
        driver_config.ticker,
        driver_config.target.target_position,
        driver_config.target.expected_volume,
    );

    // 4. Run until done, or until Ctrl+C
    let ticker = driver_config.ticker.clone();
    let mut driver = Driver::new(exchange.clone(), driver_config);

    let report = tokio::select! {
        report = driver.run() => report,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!("ctrl-c handler failed: {e}");
            }
            warn!("shutdown signal received, cancelling open orders");
            if let Err(e) = exchange.cancel_all_orders(&ticker).await {
                error!("cancel-all on shutdown failed: {e:#}");
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    // 5. Report
    match report.outcome {
        RunOutcome::TargetReached | RunOutcome::SessionEnded(_) => {
            info!("run finished: {} — goodbye", report.outcome);
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::NeverStarted | RunOutcome::Aborted => {
            error!("run failed: {}", report.outcome);
            Ok(ExitCode::FAILURE)
        }
    }
}
