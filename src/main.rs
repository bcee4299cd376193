use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use routepulse::config::{Cli, MonitorConfig};
use routepulse::engine::Monitor;
use routepulse::models::MonitorRun;
use routepulse::report;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_ansi(true)
        .init();

    let config = MonitorConfig::from(Cli::parse());
    let runs: Arc<Mutex<Vec<MonitorRun>>> = Arc::new(Mutex::new(Vec::new()));
    let active: Arc<Mutex<Option<Arc<Monitor>>>> = Arc::new(Mutex::new(None));

    let interrupted = tokio::select! {
        _ = run_all_targets(&config, &runs, &active) => false,
        _ = signal::ctrl_c() => {
            warn!("Interrupt received; emitting partial report");
            true
        }
    };

    // An abort drops the in-flight run mid-phase; snapshot whatever that
    // target already collected so the export keeps its results.
    if interrupted {
        if let Some(monitor) = active.lock().await.take() {
            runs.lock().await.push(monitor.snapshot().await);
        }
    }

    let runs = runs.lock().await;
    if let Some(path) = &config.export {
        match report::export(path, runs.as_slice()) {
            Ok(()) => info!("Report written to {}", path.display()),
            Err(e) => error!("Export failed: {e:#}"),
        }
    }

    if interrupted {
        return ExitCode::from(1);
    }
    match report::worst_success_rate(&runs) {
        None => {
            error!("No targets produced results");
            ExitCode::from(1)
        }
        Some(worst) if worst < config.fail_threshold => {
            error!(
                "Worst success rate {worst:.1}% is below the {:.1}% threshold",
                config.fail_threshold
            );
            ExitCode::from(1)
        }
        Some(worst) => {
            info!("All targets met the threshold (worst success rate {worst:.1}%)");
            ExitCode::SUCCESS
        }
    }
}

/// Targets run sequentially and in isolation; a target whose client cannot
/// even be constructed is skipped rather than aborting the whole process.
async fn run_all_targets(
    config: &MonitorConfig,
    runs: &Arc<Mutex<Vec<MonitorRun>>>,
    active: &Arc<Mutex<Option<Arc<Monitor>>>>,
) {
    for target in &config.targets {
        match Monitor::new(config.clone(), target.clone()) {
            Ok(monitor) => {
                let monitor = Arc::new(monitor);
                *active.lock().await = Some(Arc::clone(&monitor));
                let run = Arc::clone(&monitor).run().await;
                *active.lock().await = None;
                runs.lock().await.push(run);
            }
            Err(e) => error!("Skipping target {}: {e:#}", target.base_url),
        }
    }
}
