//! HTTP readiness probe.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use stitch_core::{ProbeFailure, ReadinessProbe};
use tracing::trace;

/// Probes the backend with a plain `GET` on its base address.
///
/// Any HTTP response means the server is accepting connections and counts as
/// ready. With `require_success` only 2xx responses do.
#[derive(Debug, Clone)]
pub struct HttpReadinessProbe {
    client: Client,
    timeout: Duration,
    require_success: bool,
}

impl HttpReadinessProbe {
    /// Build a probe whose attempts are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            timeout,
            require_success: false,
        })
    }

    #[must_use]
    pub const fn require_success(mut self, require: bool) -> Self {
        self.require_success = require;
        self
    }

    fn classify(&self, err: &reqwest::Error) -> ProbeFailure {
        if err.is_timeout() {
            ProbeFailure::Timeout(u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX))
        } else if err.is_connect() {
            ProbeFailure::Connect(err.to_string())
        } else {
            ProbeFailure::Protocol(err.to_string())
        }
    }
}

#[async_trait]
impl ReadinessProbe for HttpReadinessProbe {
    async fn probe(&self, address: &str) -> Result<(), ProbeFailure> {
        let response = self
            .client
            .get(address)
            .send()
            .await
            .map_err(|e| self.classify(&e))?;

        let status = response.status();
        trace!(%address, status = status.as_u16(), "Readiness probe answered");
        if self.require_success && !status.is_success() {
            return Err(ProbeFailure::Status(status.as_u16()));
        }
        Ok(())
    }
}
