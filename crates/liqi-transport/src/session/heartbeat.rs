//! Periodic keepalive calls.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{trace, warn};

use super::state::wait_closed;
use super::{SESSION_TARGET, Shared};
use crate::error::CallError;
use crate::payload::Raw;

/// Issues a keepalive every `interval`, starting immediately.
///
/// A beat waits at most one interval for its reply, so a lost keepalive never
/// delays the next one. Failed beats are logged. The loop only stops when the
/// session closes.
pub(super) async fn run(shared: Arc<Shared>, interval: Duration) {
    let mut state = shared.state.subscribe();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = wait_closed(&mut state) => break,
            _ = ticker.tick() => {}
        }

        let outcome = tokio::select! {
            biased;
            () = wait_closed(&mut state) => break,
            outcome = tokio::time::timeout(interval, beat(&shared)) => outcome,
        };
        match outcome {
            Ok(Ok(())) => trace!(target: SESSION_TARGET, "heartbeat acknowledged"),
            Ok(Err(CallError::Closed | CallError::Abandoned { .. })) => break,
            Ok(Err(error)) => warn!(
                target: SESSION_TARGET,
                method = %shared.config.heartbeat_method,
                %error,
                "heartbeat failed"
            ),
            Err(_elapsed) => warn!(
                target: SESSION_TARGET,
                method = %shared.config.heartbeat_method,
                interval_ms = interval.as_millis(),
                "heartbeat unanswered within one interval"
            ),
        }
    }
    trace!(target: SESSION_TARGET, "heartbeat loop stopped");
}

async fn beat(shared: &Shared) -> Result<(), CallError> {
    let reply = shared
        .issue::<(), Raw>(&shared.config.heartbeat_method, &())
        .await?;
    reply.wait().await.map(drop)
}
