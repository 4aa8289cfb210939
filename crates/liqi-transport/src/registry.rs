//! Correlation of in-flight calls with their replies.
//!
//! Each live request owns one entry keyed by its sequence number. An entry is
//! removed exactly once: by the read loop when the response arrives, by the
//! caller when it times out or gives up, or by the session when it closes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::error::CallError;
use crate::payload::Payload;
use crate::wrapper::unwrap_named;

/// Sequence numbers wrap back to zero once they reach this value.
pub const SEQUENCE_MODULUS: u16 = 60007;

/// Per-session sequence generator.
///
/// The first value issued is `1`; after `60006` the counter wraps to `0`.
#[derive(Debug, Clone, Default)]
pub struct SequenceCounter {
    last: u16,
}

impl SequenceCounter {
    /// Starts a counter whose next value follows `last`.
    #[must_use]
    pub fn after(last: u16) -> Self {
        Self {
            last: last.checked_rem(SEQUENCE_MODULUS).unwrap_or_default(),
        }
    }

    /// Returns the next sequence number.
    pub const fn advance(&mut self) -> u16 {
        let next = self.last.saturating_add(1);
        self.last = if next >= SEQUENCE_MODULUS { 0 } else { next };
        self.last
    }
}

/// Identifies the call that owns a registry entry.
///
/// Sequence numbers are reused after wrapping; the token stops a late purge
/// from removing a newer call's entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallToken(u64);

/// Single-use destination for a reply, fixed to the caller's expected type.
pub struct ReplySink {
    deliver: Box<dyn FnOnce(Result<Bytes, CallError>) -> bool + Send>,
}

impl ReplySink {
    /// Builds a sink that unwraps the named payload and decodes it as `R`.
    ///
    /// The wrapper's name is ignored for replies.
    #[must_use]
    pub fn typed<R: Payload>(sequence: u16, sender: oneshot::Sender<Result<R, CallError>>) -> Self {
        Self {
            deliver: Box::new(move |outcome: Result<Bytes, CallError>| {
                let reply = outcome.and_then(|body| {
                    unwrap_named(body)
                        .and_then(|named| R::decode(&named.payload))
                        .map_err(|source| CallError::Decode { sequence, source })
                });
                sender.send(reply).is_ok()
            }),
        }
    }

    /// Hands the response body to the waiting caller.
    ///
    /// Returns `false` when the caller has already gone away.
    pub fn deliver(self, body: Bytes) -> bool {
        (self.deliver)(Ok(body))
    }

    /// Fails the waiting caller with `error`.
    pub fn fail(self, error: CallError) -> bool {
        (self.deliver)(Err(error))
    }
}

impl fmt::Debug for ReplySink {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("ReplySink").finish_non_exhaustive()
    }
}

struct Entry {
    token: CallToken,
    sink: ReplySink,
}

#[derive(Default)]
struct RegistryState {
    entries: HashMap<u16, Entry>,
    next_token: u64,
}

/// Concurrent map from sequence number to reply sink.
#[derive(Default)]
pub struct PendingCalls {
    state: Mutex<RegistryState>,
}

impl fmt::Debug for PendingCalls {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PendingCalls")
            .field("len", &self.len())
            .finish()
    }
}

impl PendingCalls {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms an entry for `sequence`.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::DuplicateSequence`] and hands the sink back when
    /// a live call already owns the sequence.
    pub fn register(
        &self,
        sequence: u16,
        sink: ReplySink,
    ) -> Result<CallToken, (CallError, ReplySink)> {
        let mut state = self.lock();
        if state.entries.contains_key(&sequence) {
            return Err((CallError::DuplicateSequence { sequence }, sink));
        }
        let token = CallToken(state.next_token);
        state.next_token = state.next_token.wrapping_add(1);
        state.entries.insert(sequence, Entry { token, sink });
        Ok(token)
    }

    /// Removes and returns the sink for `sequence`, if any.
    pub fn take(&self, sequence: u16) -> Option<ReplySink> {
        self.lock().entries.remove(&sequence).map(|entry| entry.sink)
    }

    /// Removes the entry for `sequence` only if `token` still owns it.
    pub fn remove(&self, sequence: u16, token: CallToken) -> bool {
        let mut state = self.lock();
        let owned = state
            .entries
            .get(&sequence)
            .is_some_and(|entry| entry.token == token);
        if owned {
            state.entries.remove(&sequence);
        }
        owned
    }

    /// Drains every entry, failing each caller with the error built by
    /// `error`. Returns the number of calls failed.
    pub fn fail_all<F>(&self, error: F) -> usize
    where
        F: Fn(u16) -> CallError,
    {
        let drained: Vec<(u16, Entry)> = self.lock().entries.drain().collect();
        let count = drained.len();
        for (sequence, entry) in drained {
            entry.sink.fail(error(sequence));
        }
        count
    }

    /// Number of calls awaiting a reply.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns `true` when no call is awaiting a reply.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Returns `true` when `sequence` is awaiting a reply.
    #[must_use]
    pub fn contains(&self, sequence: u16) -> bool {
        self.lock().entries.contains_key(&sequence)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}
