//! Connect-time configuration.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::backoff::{DEFAULT_JITTER, DEFAULT_MAX_DELAY};

/// Options recognized by [`StreamClient::connect`](crate::StreamClient::connect).
///
/// Resolved once per `connect` call; changing a value requires a new `connect`.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectOptions {
    /// Reconnect automatically after the connection drops.
    pub should_reconnect: bool,

    /// Ceiling for a single reconnect delay, in milliseconds.
    pub max_reconnect_delay_ms: u64,

    /// Credential presented to the server.
    pub auth_token: Option<String>,

    /// Send the token as a `token=` query parameter instead of an auth frame.
    pub auth_as_query: bool,

    /// Exclusive upper bound of the random jitter added to each delay, in milliseconds.
    pub jitter_ms: u64,

    /// Stop reconnecting after this many consecutive attempts. Unbounded when absent.
    pub max_reconnect_attempts: Option<u32>,
}

impl ConnectOptions {
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_auth_as_query(mut self, as_query: bool) -> Self {
        self.auth_as_query = as_query;
        self
    }

    pub fn with_reconnect(mut self, enabled: bool) -> Self {
        self.should_reconnect = enabled;
        self
    }

    pub fn with_max_reconnect_delay(mut self, max: Duration) -> Self {
        self.max_reconnect_delay_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter_ms = u64::try_from(jitter.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = Some(attempts);
        self
    }

    pub fn max_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.max_reconnect_delay_ms)
    }

    pub fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            should_reconnect: true,
            max_reconnect_delay_ms: DEFAULT_MAX_DELAY.as_millis() as u64,
            auth_token: None,
            auth_as_query: false,
            jitter_ms: DEFAULT_JITTER.as_millis() as u64,
            max_reconnect_attempts: None,
        }
    }
}

// Keeps the token out of logs.
impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("should_reconnect", &self.should_reconnect)
            .field("max_reconnect_delay_ms", &self.max_reconnect_delay_ms)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("auth_as_query", &self.auth_as_query)
            .field("jitter_ms", &self.jitter_ms)
            .field("max_reconnect_attempts", &self.max_reconnect_attempts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let opts = ConnectOptions::default();
        assert!(opts.should_reconnect);
        assert_eq!(opts.max_reconnect_delay(), Duration::from_secs(30));
        assert_eq!(opts.jitter(), Duration::from_secs(1));
        assert!(!opts.auth_as_query);
        assert!(opts.auth_token.is_none());
        assert!(opts.max_reconnect_attempts.is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let opts = ConnectOptions::default().with_auth_token("hunter2");
        let rendered = format!("{:?}", opts);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
