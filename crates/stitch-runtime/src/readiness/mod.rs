//! Readiness probing for the backend address.

mod http;
mod poller;
mod policy;

pub use http::HttpReadinessProbe;
pub use poller::{PollOutcome, PollerBusy, PollerHandle, ReadinessPoller, ReadyEvent};
pub use policy::{Backoff, ReadinessPolicy};
