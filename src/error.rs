//! Error types surfaced through the client's `on_error` callback.

use thiserror::Error;

/// Errors raised by a transport while opening, sending or receiving.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Address could not be used to construct a transport.
    #[error("invalid address: {0}")]
    InvalidUrl(String),

    /// Handshake or TCP connect failed.
    #[error("connect failed: {0}")]
    Connect(String),

    /// Connect handshake did not complete in time.
    #[error("connect timed out after {0} ms")]
    Timeout(u64),

    /// Socket-level failure on an established connection.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Transport is no longer accepting outbound frames.
    #[error("transport not connected")]
    NotConnected,
}

impl TransportError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::InvalidUrl(_) => "invalid_url",
            TransportError::Connect(_) => "connect",
            TransportError::Timeout(_) => "timeout",
            TransportError::Protocol(_) => "protocol",
            TransportError::NotConnected => "not_connected",
        }
    }
}

/// Errors reported to the consumer of a [`StreamClient`](crate::StreamClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Transport-level failure, including synchronous open failures.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The configured reconnect attempt cap was reached.
    #[error("giving up after {0} reconnect attempts")]
    ReconnectExhausted(u32),
}

impl ClientError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Transport(e) => e.kind(),
            ClientError::ReconnectExhausted(_) => "reconnect_exhausted",
        }
    }
}
