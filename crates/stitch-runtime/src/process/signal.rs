//! Graceful signal delivery to a backend child.

use std::io;

use stitch_core::TerminationSignal;
use tokio::process::Child;

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Outcome of a graceful signal delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// The signal was queued for the child.
    Sent,
    /// The child was already gone; nothing to signal.
    AlreadyExited,
    /// No graceful signal exists on this platform; the child was killed instead.
    #[cfg_attr(unix, allow(dead_code))]
    Killed,
}

/// Send a graceful termination signal to `child`.
///
/// # Platform behavior
/// - Unix: SIGINT or SIGTERM via nix
/// - Windows: no graceful equivalent, the child is killed immediately
pub(crate) fn send_graceful(child: &mut Child, signal: TerminationSignal) -> io::Result<Delivery> {
    #[cfg(unix)]
    {
        send_unix(child, signal)
    }

    #[cfg(not(unix))]
    {
        let _ = signal;
        child.start_kill()?;
        Ok(Delivery::Killed)
    }
}

#[cfg(unix)]
fn send_unix(child: &Child, signal: TerminationSignal) -> io::Result<Delivery> {
    // id() is None once the child has been reaped
    let Some(pid) = child.id() else {
        return Ok(Delivery::AlreadyExited);
    };
    let pid = i32::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

    match signal::kill(Pid::from_raw(pid), to_nix(signal)) {
        Ok(()) => Ok(Delivery::Sent),
        Err(nix::errno::Errno::ESRCH) => Ok(Delivery::AlreadyExited),
        Err(e) => Err(io::Error::other(e)),
    }
}

#[cfg(unix)]
const fn to_nix(signal: TerminationSignal) -> Signal {
    match signal {
        TerminationSignal::Interrupt => Signal::SIGINT,
        TerminationSignal::Terminate => Signal::SIGTERM,
    }
}
