//! Connection state machine.
//!
//! # States
//! - Idle: no target yet
//! - Connecting: transport opening
//! - Open: transport established, frames flowing
//! - ReconnectPending: waiting out the backoff delay
//! - Closing: `close()` called, waiting for the transport's final close
//! - Closed: terminal until the next `connect`
//!
//! # State Transitions
//! ```text
//! Idle → Connecting: connect()
//! Connecting → Open: transport open event
//! Connecting/Open → ReconnectPending: close event (or open failure) with reconnect enabled
//! Connecting/Open → Closed: close event with reconnect disabled
//! ReconnectPending → Connecting: deadline elapsed
//! Connecting/Open → Closing: close()
//! Closing → Closed: close event
//! Idle/ReconnectPending → Closed: close()
//! ```
//!
//! # Design Decisions
//! - The reconnect deadline lives only inside `ReconnectPending`; leaving the
//!   state drops it, so two timers can never coexist
//! - A transport handle lives only inside the states that own a connection

use tokio::time::Instant;

use crate::transport::Transport;

/// Observable phase of a [`StreamClient`](crate::StreamClient).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    ReconnectPending { attempt: u32 },
    Closing,
    Closed,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "idle"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::ReconnectPending { attempt } => {
                write!(f, "reconnect pending (attempt {})", attempt)
            }
            ConnectionState::Closing => write!(f, "closing"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

/// Driver-internal phase; carries the resources that belong to each state.
pub(crate) enum Phase {
    Idle,
    Connecting { transport: Box<dyn Transport> },
    Open { transport: Box<dyn Transport> },
    ReconnectPending { attempt: u32, deadline: Instant },
    Closing { _transport: Box<dyn Transport> },
    Closed,
}

impl Phase {
    pub fn state(&self) -> ConnectionState {
        match self {
            Phase::Idle => ConnectionState::Idle,
            Phase::Connecting { .. } => ConnectionState::Connecting,
            Phase::Open { .. } => ConnectionState::Open,
            Phase::ReconnectPending { attempt, .. } => ConnectionState::ReconnectPending { attempt: *attempt },
            Phase::Closing { .. } => ConnectionState::Closing,
            Phase::Closed => ConnectionState::Closed,
        }
    }

    /// Deadline of the pending reconnect, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        match self {
            Phase::ReconnectPending { deadline, .. } => Some(*deadline),
            _ => None,
        }
    }

    /// Whether a transport from the current generation is still expected to report.
    pub fn has_transport(&self) -> bool {
        matches!(self, Phase::Connecting { .. } | Phase::Open { .. } | Phase::Closing { .. })
    }
}

impl std::fmt::Debug for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_pending_phase_has_deadline() {
        let now = Instant::now();
        assert_eq!(Phase::Idle.deadline(), None);
        assert_eq!(Phase::Closed.deadline(), None);

        let pending = Phase::ReconnectPending { attempt: 2, deadline: now };
        assert_eq!(pending.deadline(), Some(now));
        assert_eq!(pending.state(), ConnectionState::ReconnectPending { attempt: 2 });
        assert!(!pending.has_transport());
    }

    #[test]
    fn test_display_is_human_readable() {
        assert_eq!(ConnectionState::ReconnectPending { attempt: 3 }.to_string(), "reconnect pending (attempt 3)");
        assert_eq!(ConnectionState::Open.to_string(), "open");
    }
}
