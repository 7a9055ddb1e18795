//! Crash reporting for the shell process.
//!
//! Panics are logged through tracing, tagged with the configured product
//! identity, and written as a JSON report when a report directory is given.
//! Uploading reports is left to external tooling.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use stitch_core::CrashReporterSettings;
use tracing::{error, warn};

/// A single panic report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrashReport {
    pub product_name: String,
    pub company_name: String,
    pub message: String,
    pub location: Option<String>,
    pub thread: Option<String>,
    pub timestamp_secs: u64,
    /// Whether an upload endpoint was configured for this report.
    pub submit: bool,
}

impl CrashReport {
    pub fn new(settings: &CrashReporterSettings, message: impl Into<String>) -> Self {
        let timestamp_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        Self {
            product_name: settings.product_name.clone(),
            company_name: settings.company_name.clone(),
            message: message.into(),
            location: None,
            thread: std::thread::current().name().map(str::to_string),
            timestamp_secs,
            submit: settings.auto_submit && !settings.submit_url.is_empty(),
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Write the report into `dir` as `crash-<timestamp>-<pid>.json`.
    pub fn write_to(&self, dir: &Path) -> io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!(
            "crash-{}-{}.json",
            self.timestamp_secs,
            std::process::id()
        ));
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

/// Install a panic hook that records crashes, then defers to the previous hook.
///
/// `report_dir` of `None` only logs.
pub fn install_crash_hook(settings: CrashReporterSettings, report_dir: Option<PathBuf>) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let payload = info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());

        let mut report = CrashReport::new(&settings, message);
        if let Some(location) = info.location() {
            report = report.with_location(location.to_string());
        }

        error!(
            product = %report.product_name,
            company = %report.company_name,
            location = ?report.location,
            thread = ?report.thread,
            submit = report.submit,
            "Shell panicked: {}",
            report.message
        );

        if let Some(dir) = &report_dir {
            if let Err(e) = report.write_to(dir) {
                warn!(dir = %dir.display(), error = %e, "Failed to write crash report");
            }
        }

        previous(info);
    }));
}
