//! Fully qualified gateway method names.

use std::fmt;

/// Services exposed by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// Account, lobby and matchmaking calls.
    Lobby,
    /// In-game calls routed to the game server.
    FastTest,
}

impl Service {
    /// Prefix shared by every method of the service, including the trailing
    /// dot.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Lobby => ".lq.Lobby.",
            Self::FastTest => ".lq.FastTest.",
        }
    }

    /// Builds the fully qualified name of `method`, for example
    /// `.lq.Lobby.login`.
    #[must_use]
    pub fn method(self, method: &str) -> String {
        let prefix = self.prefix();
        let mut name = String::with_capacity(prefix.len() + method.len());
        name.push_str(prefix);
        name.push_str(method);
        name
    }
}

impl fmt::Display for Service {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Lobby => "Lobby",
            Self::FastTest => "FastTest",
        })
    }
}
