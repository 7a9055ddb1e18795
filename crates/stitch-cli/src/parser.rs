//! Command-line interface definition.
//!
//! Every flag overrides the matching settings file value for this
//! invocation only; the file itself is never rewritten.

use std::path::PathBuf;

use clap::Parser;

/// Launch the stitch-flex backend and open it once it answers.
#[derive(Debug, Parser)]
#[command(name = "stitch-flex")]
#[command(about = "Launch the stitch-flex backend and open it once it is ready")]
#[command(version)]
pub struct Cli {
    /// Settings file (defaults to <config dir>/stitch-flex/settings.json)
    #[arg(long, env = "STITCH_SETTINGS")]
    pub config: Option<PathBuf>,

    /// Backend executable
    #[arg(long, env = "STITCH_BACKEND")]
    pub backend: Option<String>,

    /// Backend argument; repeat for several. Replaces the configured arguments.
    #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Address the backend serves on
    #[arg(long, env = "STITCH_ADDRESS")]
    pub address: Option<String>,

    /// Window width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Pause between readiness probes
    #[arg(long = "probe-interval-ms", value_name = "MS")]
    pub probe_interval_ms: Option<u64>,

    /// Timeout for a single readiness probe
    #[arg(long = "probe-timeout-ms", value_name = "MS")]
    pub probe_timeout_ms: Option<u64>,

    /// Give up if the backend is not ready after this long (default: wait forever)
    #[arg(long = "max-wait-ms", value_name = "MS")]
    pub max_wait_ms: Option<u64>,

    /// Grace period between the interrupt and a forced kill
    #[arg(long = "grace-ms", value_name = "MS")]
    pub grace_ms: Option<u64>,

    /// Open the address in the system browser once the backend is ready
    #[arg(long = "open-browser")]
    pub open_browser: bool,

    /// Enable webview devtools (desktop shell only)
    #[arg(long)]
    pub devtools: bool,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}
