//! Shell settings and validation.
//!
//! Settings are a plain serde document, usually read from
//! `<config_dir>/stitch-flex/settings.json`. Every section is optional in the
//! file and falls back to the defaults below.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::{LaunchSpec, TerminationSignal};

/// Address the bundled backend listens on.
pub const DEFAULT_BACKEND_ADDRESS: &str = "http://localhost:5000";

/// Default window dimensions.
pub const DEFAULT_WINDOW_WIDTH: u32 = 800;
pub const DEFAULT_WINDOW_HEIGHT: u32 = 600;

/// Default pause between readiness probes.
pub const DEFAULT_PROBE_INTERVAL_MS: u64 = 500;

/// Default per-attempt probe timeout.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2_000;

/// Default grace period between the graceful signal and a forced kill.
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 5_000;

/// Product name reported with crash reports and used for the window title.
pub const PRODUCT_NAME: &str = "stitch-flex";

/// Complete shell configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ShellSettings {
    /// How to launch the backend service.
    pub backend: LaunchSpec,
    /// Base address the backend serves on; probed and loaded in the window.
    pub address: String,
    pub window: WindowSettings,
    pub readiness: ReadinessSettings,
    pub shutdown: ShutdownSettings,
    pub crash_reporter: CrashReporterSettings,
}

/// Window presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
    pub title: String,
    /// Open the webview devtools alongside the window.
    pub devtools: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_WINDOW_WIDTH,
            height: DEFAULT_WINDOW_HEIGHT,
            title: PRODUCT_NAME.to_string(),
            devtools: false,
        }
    }
}

/// Readiness polling settings.
///
/// The defaults retry forever at a fixed interval. `backoff` and `max_wait_ms`
/// are opt-in hardening.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadinessSettings {
    pub interval_ms: u64,
    pub probe_timeout_ms: u64,
    /// Give up after this long without a successful probe.
    pub max_wait_ms: Option<u64>,
    pub backoff: Option<BackoffSettings>,
    /// Treat non-2xx responses as failures instead of "the server is up".
    pub require_success: bool,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_PROBE_INTERVAL_MS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            max_wait_ms: None,
            backoff: None,
            require_success: false,
        }
    }
}

impl ReadinessSettings {
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_ms.map(Duration::from_millis)
    }
}

/// Exponential growth of the inter-probe delay.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackoffSettings {
    /// Multiplier applied per failed attempt (>= 1.0).
    pub factor: f64,
    /// Upper bound for a single delay.
    pub max_interval_ms: u64,
}

/// Backend shutdown settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ShutdownSettings {
    /// How long the backend gets to exit after the graceful signal.
    pub grace_ms: u64,
    pub signal: TerminationSignal,
}

impl Default for ShutdownSettings {
    fn default() -> Self {
        Self {
            grace_ms: DEFAULT_SHUTDOWN_GRACE_MS,
            signal: TerminationSignal::Interrupt,
        }
    }
}

impl ShutdownSettings {
    pub const fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}

/// Crash reporter identity. Submission itself is handled outside the shell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct CrashReporterSettings {
    pub product_name: String,
    pub company_name: String,
    /// Empty means reports are kept local.
    pub submit_url: String,
    pub auto_submit: bool,
}

impl Default for CrashReporterSettings {
    fn default() -> Self {
        Self {
            product_name: PRODUCT_NAME.to_string(),
            company_name: "lukejfernandez".to_string(),
            submit_url: String::new(),
            auto_submit: false,
        }
    }
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            backend: LaunchSpec::default(),
            address: DEFAULT_BACKEND_ADDRESS.to_string(),
            window: WindowSettings::default(),
            readiness: ReadinessSettings::default(),
            shutdown: ShutdownSettings::default(),
            crash_reporter: CrashReporterSettings::default(),
        }
    }
}

impl ShellSettings {
    /// Load settings from a JSON file.
    ///
    /// A missing file is not an error; defaults are returned instead.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(SettingsError::Io(format!("{}: {e}", path.display()))),
        };
        serde_json::from_str(&content)
            .map_err(|e| SettingsError::Parse(format!("{}: {e}", path.display())))
    }

    /// Write settings as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SettingsError::Io(format!("{}: {e}", parent.display())))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SettingsError::Parse(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| SettingsError::Io(format!("{}: {e}", path.display())))
    }

    /// Parse the backend address.
    pub fn address_url(&self) -> Result<Url, SettingsError> {
        Url::parse(&self.address).map_err(|_| SettingsError::InvalidAddress(self.address.clone()))
    }
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("Backend program cannot be empty")]
    EmptyProgram,

    #[error("Backend address is not a valid URL: {0}")]
    InvalidAddress(String),

    #[error("Backend address must use http or https, got '{0}'")]
    UnsupportedScheme(String),

    #[error("Window size must be non-zero, got {width}x{height}")]
    InvalidWindowSize { width: u32, height: u32 },

    #[error("Probe interval must be at least 1ms")]
    InvalidInterval,

    #[error("Probe timeout must be at least 1ms")]
    InvalidProbeTimeout,

    #[error("Backoff factor must be a finite number >= 1.0, got {0}")]
    InvalidBackoffFactor(f64),

    #[error("Backoff cap ({max_ms}ms) is below the probe interval ({interval_ms}ms)")]
    InvalidBackoffCap { max_ms: u64, interval_ms: u64 },

    #[error("Crash report submit URL is invalid: {0}")]
    InvalidSubmitUrl(String),

    #[error("Failed to read settings: {0}")]
    Io(String),

    #[error("Failed to parse settings: {0}")]
    Parse(String),
}

/// Validate settings values.
pub fn validate_settings(settings: &ShellSettings) -> Result<(), SettingsError> {
    if settings.backend.program.trim().is_empty() {
        return Err(SettingsError::EmptyProgram);
    }

    // Validate address
    let url = Url::parse(&settings.address)
        .map_err(|_| SettingsError::InvalidAddress(settings.address.clone()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(SettingsError::UnsupportedScheme(url.scheme().to_string()));
    }

    // Validate window
    let window = &settings.window;
    if window.width == 0 || window.height == 0 {
        return Err(SettingsError::InvalidWindowSize {
            width: window.width,
            height: window.height,
        });
    }

    // Validate readiness pacing
    let readiness = &settings.readiness;
    if readiness.interval_ms == 0 {
        return Err(SettingsError::InvalidInterval);
    }
    if readiness.probe_timeout_ms == 0 {
        return Err(SettingsError::InvalidProbeTimeout);
    }
    if let Some(backoff) = readiness.backoff {
        if !backoff.factor.is_finite() || backoff.factor < 1.0 {
            return Err(SettingsError::InvalidBackoffFactor(backoff.factor));
        }
        if backoff.max_interval_ms < readiness.interval_ms {
            return Err(SettingsError::InvalidBackoffCap {
                max_ms: backoff.max_interval_ms,
                interval_ms: readiness.interval_ms,
            });
        }
    }

    // Validate crash reporter endpoint if specified
    let submit_url = settings.crash_reporter.submit_url.trim();
    if !submit_url.is_empty() && Url::parse(submit_url).is_err() {
        return Err(SettingsError::InvalidSubmitUrl(submit_url.to_string()));
    }

    Ok(())
}
