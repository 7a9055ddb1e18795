//! Readiness probe port.

use async_trait::async_trait;

use crate::errors::ProbeFailure;

/// A single readiness check against the backend address.
///
/// Implementations must bound each call with their own timeout; the poller
/// does not interrupt an attempt in flight.
#[cfg_attr(feature = "test-utils", mockall::automock)]
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn probe(&self, address: &str) -> Result<(), ProbeFailure>;
}
