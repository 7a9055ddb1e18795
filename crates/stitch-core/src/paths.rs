//! Well-known filesystem locations.

use std::path::PathBuf;

use crate::settings::PRODUCT_NAME;

/// Environment variable that overrides the settings file location.
pub const SETTINGS_PATH_ENV: &str = "STITCH_SETTINGS";

const SETTINGS_FILE: &str = "settings.json";

/// Per-user configuration directory for the shell.
///
/// Falls back to the current directory on platforms without a config dir.
pub fn config_root() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(PRODUCT_NAME)
}

/// Per-user data directory (logs, crash reports).
pub fn data_root() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(PRODUCT_NAME)
}

/// Resolve the settings file: explicit path, then `STITCH_SETTINGS`, then the
/// default under [`config_root`].
pub fn settings_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| std::env::var_os(SETTINGS_PATH_ENV).map(PathBuf::from))
        .unwrap_or_else(|| config_root().join(SETTINGS_FILE))
}
