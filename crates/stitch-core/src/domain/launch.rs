//! Backend launch description and exit reporting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default backend interpreter.
pub const DEFAULT_BACKEND_PROGRAM: &str = "python";

/// Default backend entry script, relative to the shell's working directory.
pub const DEFAULT_BACKEND_SCRIPT: &str = "./app/app.py";

/// How to launch the backend service.
///
/// This is an intent-based description resolved once when the coordinator
/// starts; it carries no process handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchSpec {
    /// Executable name or path.
    pub program: String,
    /// Arguments passed verbatim to the executable.
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory for the child (inherits the shell's if None).
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables for the child.
    #[serde(default)]
    pub env: Vec<(String, String)>,
}

impl LaunchSpec {
    /// Create a launch spec for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
        }
    }

    /// Append an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Replace all arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl Default for LaunchSpec {
    fn default() -> Self {
        Self::new(DEFAULT_BACKEND_PROGRAM).arg(DEFAULT_BACKEND_SCRIPT)
    }
}

impl fmt::Display for LaunchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Graceful termination signal delivered to the backend.
///
/// Forceful termination is deliberately not a variant; it is a separate
/// operation reserved for deadline escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminationSignal {
    /// SIGINT on Unix.
    #[default]
    Interrupt,
    /// SIGTERM on Unix.
    Terminate,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => f.write_str("SIGINT"),
            Self::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// What the OS reported when the backend exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitReport {
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Terminating signal number, if the process was killed by a signal.
    pub signal: Option<i32>,
    /// Whether a terminate or kill had been issued before the exit was observed.
    pub requested: bool,
}

impl ExitReport {
    /// An exit the shell did not ask for.
    #[must_use]
    pub const fn is_crash(&self) -> bool {
        !self.requested
    }

    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

impl fmt::Display for ExitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {code}"),
            (None, Some(signal)) => write!(f, "signal {signal}"),
            (None, None) => f.write_str("unknown exit status"),
        }
    }
}
