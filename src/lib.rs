//! Resilient JSON stream client.
//!
//! Keeps one WebSocket connection to a streaming endpoint alive, reconnecting
//! with jittered exponential backoff, and hands every parsed JSON frame to a
//! registered [`Observer`].

pub mod client;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod transport;

pub use client::{ConnectOptions, ConnectionState, Observer, StreamClient};
pub use config::ClientConfig;
pub use error::{ClientError, TransportError};
pub use transport::{CloseReason, Connector, EventSink, Frame, Transport, TransportEvent, WebSocketConnector};
