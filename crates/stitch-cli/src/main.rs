//! CLI entry point.

use anyhow::Context;
use clap::Parser;
use stitch_cli::{Cli, CliError, build_coordinator, init_tracing, resolve_settings};
use stitch_core::paths::data_root;
use stitch_core::{CoordinatorPhase, LifecycleEvent, RunSummary};
use stitch_runtime::install_crash_hook;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Load environment variables before clap reads its `env` fallbacks
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(cli).await {
        Ok(summary) => {
            info!(cause = %summary.cause, probes = summary.probe_attempts, "Exiting");
            0
        }
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            e.downcast_ref::<CliError>().map_or(1, CliError::exit_code)
        }
    };

    // Exit explicitly: a pending stdin read would otherwise hold the runtime open
    std::process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<RunSummary> {
    let (path, settings) = resolve_settings(&cli).context("Failed to resolve settings")?;
    info!(settings = %path.display(), "Starting stitch-flex");

    install_crash_hook(
        settings.crash_reporter.clone(),
        Some(data_root().join("crashes")),
    );

    let (coordinator, events) = build_coordinator(&settings, cli.open_browser)?;
    let cancel = coordinator.cancel_token();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));
    tokio::spawn(report_progress(events.subscribe(), settings.address.clone()));

    let result = coordinator.run().await;
    cancel.cancel();
    Ok(result.map_err(CliError::from)?)
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::select! {
        () = cancel.cancelled() => {}
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                return;
            }
            info!("Interrupted, shutting down");
            cancel.cancel();
        }
    }
}

/// Print the few lifecycle milestones an operator cares about.
async fn report_progress(mut rx: broadcast::Receiver<LifecycleEvent>, address: String) {
    loop {
        match rx.recv().await {
            Ok(LifecycleEvent::PhaseChanged {
                to: CoordinatorPhase::WaitingForReady,
                ..
            }) => eprintln!("Waiting for backend at {address}..."),
            Ok(LifecycleEvent::TerminationTimeout { grace_ms }) => {
                eprintln!("Backend ignored shutdown for {grace_ms}ms, killing it");
            }
            Ok(event) if event.is_terminal() => return,
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}
