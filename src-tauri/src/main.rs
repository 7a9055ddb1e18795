// Prevents additional console window on Windows in release, DO NOT REMOVE!!
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod lifecycle;
mod window_host;

use std::sync::Arc;

use dotenvy::dotenv;
use lifecycle::ShellState;
use stitch_core::paths::{data_root, settings_path};
use stitch_core::{LifecycleEventEmitter, ShellSettings, validate_settings};
use stitch_runtime::{
    BackendProcess, CoordinatorConfig, EventBroadcaster, HttpReadinessProbe, LifecycleCoordinator,
    ReadinessPoller, ReadinessPolicy, install_crash_hook,
};
use tauri::{AppHandle, Emitter};
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use window_host::TauriWindowHost;

/// Event name lifecycle events are forwarded under.
const LIFECYCLE_EVENT: &str = "stitch://lifecycle";

/// Initialize tracing with a file appender for persistent logs.
///
/// Logs are written to:
/// - stdout (for console viewing)
/// - {data_dir}/stitch-flex/logs/stitch-flex.{date} (daily rotation)
///
/// Log level is controlled by RUST_LOG (default: info).
fn init_tracing() -> Option<WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let log_dir = data_root().join("logs");
    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Failed to create log directory: {}", e);
    }

    let file_appender = tracing_appender::rolling::daily(&log_dir, "stitch-flex");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .compact(),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false) // No ANSI colors in files
                .compact(),
        )
        .try_init()
        .ok()
        .map(|()| guard)
}

fn load_settings() -> Result<ShellSettings, stitch_core::SettingsError> {
    let path = settings_path(None);
    let settings = ShellSettings::load(&path)?;
    validate_settings(&settings)?;
    debug!(path = %path.display(), "Loaded settings");
    Ok(settings)
}

/// Compose the coordinator and run it on the Tauri async runtime.
///
/// The app exits with the run's exit code once the backend is gone.
fn spawn_shell(
    app: AppHandle,
    settings: &ShellSettings,
    state: Arc<ShellState>,
) -> Result<(), Box<dyn std::error::Error>> {
    let events = EventBroadcaster::new();
    let emitter: Arc<dyn LifecycleEventEmitter> = Arc::new(events.clone());

    let probe = HttpReadinessProbe::new(settings.readiness.probe_timeout())?
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
        Arc::new(TauriWindowHost::new(app.clone())),
        emitter,
    )
    .with_cancel_token(state.cancel_token());

    // Forward lifecycle events to any listening webview
    let mut rx = events.subscribe();
    let forward_handle = app.clone();
    tauri::async_runtime::spawn(async move {
        while let Ok(event) = rx.recv().await {
            if let Err(e) = forward_handle.emit(LIFECYCLE_EVENT, &event) {
                debug!(error = %e, "Failed to forward lifecycle event");
            }
            if event.is_terminal() {
                break;
            }
        }
    });

    tauri::async_runtime::spawn(async move {
        let code = match coordinator.run().await {
            Ok(summary) => {
                info!(cause = %summary.cause, exit = %summary.exit, "Shell stopped");
                0
            }
            Err(e) => {
                error!(error = %e, "Shell stopped with an error");
                e.exit_code()
            }
        };
        state.mark_stopped();
        app.exit(code);
    });
    Ok(())
}

fn main() {
    let _ = dotenv();
    let _log_guard = init_tracing();

    info!(commit = env!("GIT_COMMIT_HASH"), "stitch-flex desktop shell starting");

    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Invalid settings");
            eprintln!("Error: {e}");
            std::process::exit(78);
        }
    };
    install_crash_hook(
        settings.crash_reporter.clone(),
        Some(data_root().join("crashes")),
    );

    let state = Arc::new(ShellState::new(settings.shutdown.grace()));
    let setup_state = state.clone();

    let app = match tauri::Builder::default()
        .setup(move |app| {
            spawn_shell(app.handle().clone(), &settings, setup_state.clone())?;
            Ok(())
        })
        .build(tauri::generate_context!())
    {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "Failed to build tauri application");
            eprintln!("Error: {e}");
            std::process::exit(70);
        }
    };

    app.run(move |_app_handle, event| match event {
        tauri::RunEvent::ExitRequested { api, .. } if !state.is_stopped() => {
            // Keep the event loop alive until the backend is confirmed gone
            api.prevent_exit();
            state.request_shutdown();
        }
        tauri::RunEvent::Exit => info!("App exiting"),
        _ => {}
    });
}
