//! Readiness retry timing.
//!
//! The delay after failed attempt `n` (0-indexed) is `interval × factor^n`,
//! clamped to `max_interval`. Without a backoff the delay is always `interval`.

use std::time::Duration;

use stitch_core::ReadinessSettings;

/// Exponential growth of the inter-probe delay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Multiplicative growth factor (`>= 1.0`).
    pub factor: f64,
    /// Maximum delay between two probes.
    pub max_interval: Duration,
}

/// Timing parameters for a [`ReadinessPoller`](super::ReadinessPoller).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadinessPolicy {
    /// Base pause between attempts.
    pub interval: Duration,
    /// Upper bound for a single probe attempt.
    pub probe_timeout: Duration,
    /// Give up after this long without success. `None` retries forever.
    pub max_wait: Option<Duration>,
    pub backoff: Option<Backoff>,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self::from_settings(&ReadinessSettings::default())
    }
}

impl ReadinessPolicy {
    /// Fixed-interval retry with no deadline.
    pub const fn fixed(interval: Duration, probe_timeout: Duration) -> Self {
        Self {
            interval,
            probe_timeout,
            max_wait: None,
            backoff: None,
        }
    }

    pub fn from_settings(settings: &ReadinessSettings) -> Self {
        Self {
            interval: settings.interval(),
            probe_timeout: settings.probe_timeout(),
            max_wait: settings.max_wait(),
            backoff: settings.backoff.map(|b| Backoff {
                factor: b.factor,
                max_interval: Duration::from_millis(b.max_interval_ms),
            }),
        }
    }

    #[must_use]
    pub const fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    #[must_use]
    pub const fn with_backoff(mut self, factor: f64, max_interval: Duration) -> Self {
        self.backoff = Some(Backoff {
            factor,
            max_interval,
        });
        self
    }

    /// Delay to wait after failed attempt `attempt` (0-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let Some(backoff) = self.backoff else {
            return self.interval;
        };

        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.interval.as_secs_f64() * backoff.factor.powi(exp);
        if !secs.is_finite() || secs < 0.0 || secs > backoff.max_interval.as_secs_f64() {
            backoff.max_interval
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}
