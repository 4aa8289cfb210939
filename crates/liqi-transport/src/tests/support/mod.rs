//! Shared fixtures and helpers for transport tests.

mod peer;
mod scripted;

use std::time::Duration;

use rstest::fixture;

use crate::session::SessionConfig;

pub use peer::{FakePeer, ReceivedRequest, connected};
pub use scripted::{Inbound, with_discarding_sink, with_failing_sink};

/// Settings for sessions under test: no heartbeat and a short call timeout.
#[fixture]
pub fn quiet_config() -> SessionConfig {
    SessionConfig::default()
        .without_heartbeat()
        .with_call_timeout(Some(Duration::from_secs(5)))
}
