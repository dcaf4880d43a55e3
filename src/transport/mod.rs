//! Transport abstraction.
//!
//! # Data Flow
//! ```text
//! driver ──open(url, EventSink)──▶ Connector ──spawns──▶ socket task
//!                                      │                     │
//!                                      ▼                     ▼
//!                              Box<dyn Transport>    TransportEvent stream
//!                              (send / close)        (Open, Message*, Error*, Closed)
//! ```
//!
//! # Design Decisions
//! - Opening is synchronous; an `Err` from `open` is an open failure
//! - Every event is tagged with the generation of the open that produced it,
//!   so the driver can discard events from replaced connections
//! - A transport emits exactly one `Closed`, after which it emits nothing

pub mod websocket;

use std::fmt;
use tokio::sync::mpsc;

use crate::error::TransportError;

pub use websocket::WebSocketConnector;

/// Inbound payload as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// Why a connection terminated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseReason {
    /// WebSocket close code, if the peer sent one.
    pub code: Option<u16>,
    /// Close reason text (may be empty).
    pub reason: String,
}

impl CloseReason {
    pub fn new(code: Option<u16>, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.reason.is_empty()) {
            (Some(code), false) => write!(f, "{} (code: {})", self.reason, code),
            (Some(code), true) => write!(f, "code {}", code),
            (None, false) => write!(f, "{}", self.reason),
            (None, true) => write!(f, "connection closed"),
        }
    }
}

/// Lifecycle events emitted by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Open,
    Message(Frame),
    Error(TransportError),
    Closed(CloseReason),
}

/// Generation-tagged event channel handed to a [`Connector`] on every open.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<(u64, TransportEvent)>,
}

impl EventSink {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<(u64, TransportEvent)>) -> Self {
        Self { generation, tx }
    }

    /// Generation of the open this sink belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Deliver an event to the client. Returns `false` once the client is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx.send((self.generation, event)).is_ok()
    }
}

/// Handle to one live connection.
pub trait Transport: Send {
    /// Queue a text frame for sending.
    fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Begin closing the connection. A `Closed` event follows. Repeated calls are no-ops.
    fn close(&mut self);
}

/// Factory for transports.
pub trait Connector: Send + Sync + 'static {
    /// Start opening a connection to `url`, reporting its lifecycle through `events`.
    fn open(&self, url: &str, events: EventSink) -> Result<Box<dyn Transport>, TransportError>;
}
