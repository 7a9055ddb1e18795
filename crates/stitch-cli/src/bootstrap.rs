//! CLI bootstrap - the composition root.
//!
//! Resolves settings (defaults, then the settings file, then flags), sets up
//! tracing and wires the runtime adapters into a coordinator.

use std::path::PathBuf;
use std::sync::Arc;

use stitch_core::paths::settings_path;
use stitch_core::{LaunchSpec, ShellSettings, validate_settings};
use stitch_runtime::{
    BackendProcess, CoordinatorConfig, EventBroadcaster, HttpReadinessProbe, LifecycleCoordinator,
    ReadinessPoller, ReadinessPolicy,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::error::CliError;
use crate::parser::Cli;
use crate::window_host::TerminalWindowHost;

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins; otherwise `-v` selects debug and the default is info.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .ok();
}

/// Load the settings file and apply command-line overrides.
pub fn resolve_settings(cli: &Cli) -> Result<(PathBuf, ShellSettings), CliError> {
    let path = settings_path(cli.config.clone());
    let mut settings = ShellSettings::load(&path)?;
    debug!(path = %path.display(), "Loaded settings");

    apply_overrides(&mut settings, cli);
    validate_settings(&settings)?;
    Ok((path, settings))
}

/// Apply command-line overrides on top of file settings.
pub fn apply_overrides(settings: &mut ShellSettings, cli: &Cli) {
    if let Some(program) = &cli.backend {
        settings.backend = LaunchSpec {
            program: program.clone(),
            args: Vec::new(),
            ..settings.backend.clone()
        };
    }
    if !cli.args.is_empty() {
        settings.backend.args.clone_from(&cli.args);
    }
    if let Some(address) = &cli.address {
        settings.address.clone_from(address);
    }
    if let Some(width) = cli.width {
        settings.window.width = width;
    }
    if let Some(height) = cli.height {
        settings.window.height = height;
    }
    if let Some(interval) = cli.probe_interval_ms {
        settings.readiness.interval_ms = interval;
    }
    if let Some(timeout) = cli.probe_timeout_ms {
        settings.readiness.probe_timeout_ms = timeout;
    }
    if let Some(max_wait) = cli.max_wait_ms {
        settings.readiness.max_wait_ms = Some(max_wait);
    }
    if let Some(grace) = cli.grace_ms {
        settings.shutdown.grace_ms = grace;
    }
    if cli.devtools {
        settings.window.devtools = true;
    }
}

/// Compose the coordinator for a terminal session.
pub fn build_coordinator(
    settings: &ShellSettings,
    open_browser: bool,
) -> Result<(LifecycleCoordinator<BackendProcess>, EventBroadcaster), CliError> {
    let events = EventBroadcaster::new();
    let emitter = Arc::new(events.clone());

    let probe = HttpReadinessProbe::new(settings.readiness.probe_timeout())
        .map_err(|e| CliError::Probe(e.to_string()))?
        .require_success(settings.readiness.require_success);
    let poller = ReadinessPoller::new(
        Arc::new(probe),
        ReadinessPolicy::from_settings(&settings.readiness),
    )
    .with_emitter(emitter.clone());

    let coordinator = LifecycleCoordinator::new(
        CoordinatorConfig::from_settings(settings),
        BackendProcess::with_emitter(emitter.clone()),
        poller,
        Arc::new(TerminalWindowHost::new(open_browser)),
        emitter,
    );

    info!(
        backend = %settings.backend,
        address = %settings.address,
        max_wait_ms = ?settings.readiness.max_wait_ms,
        "Shell composed"
    );
    Ok((coordinator, events))
}
