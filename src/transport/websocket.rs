//! WebSocket transport over tokio-tungstenite.
//!
//! # Responsibilities
//! - Validate the address before anything is spawned
//! - Run the handshake under a connect timeout
//! - Forward text/binary frames as events, queue outbound text frames
//! - Perform the closing handshake when asked, bounded by a close timeout
//!
//! # Design Decisions
//! - One spawned task per connection; the returned handle only talks to it via a channel
//! - Ping/pong stays inside tungstenite and is never surfaced
//! - Exactly one `Closed` event per connection, whatever the exit path

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, protocol::Message};
use url::Url;

use crate::error::TransportError;
use crate::transport::{CloseReason, Connector, EventSink, Frame, Transport, TransportEvent};

/// Default bound on the connect handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default wait for the peer's close frame after we sent ours.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens WebSocket connections.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    connect_timeout: Duration,
    close_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    /// Bound the closing handshake. A silent peer is dropped once it elapses.
    pub fn with_close_timeout(mut self, close_timeout: Duration) -> Self {
        self.close_timeout = close_timeout;
        self
    }
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

impl Connector for WebSocketConnector {
    fn open(&self, url: &str, events: EventSink) -> Result<Box<dyn Transport>, TransportError> {
        let parsed = Url::parse(url)
            .map_err(|e| TransportError::InvalidUrl(format!("'{}': {}", url, e)))?;

        match parsed.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(TransportError::InvalidUrl(format!(
                    "unsupported scheme '{}'",
                    other
                )));
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let timeouts = Timeouts {
            connect: self.connect_timeout,
            close: self.close_timeout,
        };
        tokio::spawn(run_socket(url.to_owned(), timeouts, rx, events));

        Ok(Box::new(WebSocketTransport { tx, closing: false }))
    }
}

#[derive(Clone, Copy)]
struct Timeouts {
    connect: Duration,
    close: Duration,
}

enum Outbound {
    Text(String),
    Close,
}

/// Handle to a spawned socket task.
struct WebSocketTransport {
    tx: mpsc::UnboundedSender<Outbound>,
    closing: bool,
}

impl Transport for WebSocketTransport {
    fn send(&mut self, text: String) -> Result<(), TransportError> {
        if self.closing {
            return Err(TransportError::NotConnected);
        }
        self.tx
            .send(Outbound::Text(text))
            .map_err(|_| TransportError::NotConnected)
    }

    fn close(&mut self) {
        if !self.closing {
            self.closing = true;
            let _ = self.tx.send(Outbound::Close);
        }
    }
}

async fn run_socket(
    url: String,
    timeouts: Timeouts,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: EventSink,
) {
    let generation = events.generation();
    let handshake = tokio::time::timeout(timeouts.connect, connect_async(url.as_str()));
    tokio::pin!(handshake);

    let stream = tokio::select! {
        result = &mut handshake => match result {
            Ok(Ok((stream, _response))) => stream,
            Ok(Err(e)) => {
                events.emit(TransportEvent::Error(TransportError::Connect(e.to_string())));
                events.emit(TransportEvent::Closed(CloseReason::new(None, "connect failed")));
                return;
            }
            Err(_) => {
                let ms = u64::try_from(timeouts.connect.as_millis()).unwrap_or(u64::MAX);
                events.emit(TransportEvent::Error(TransportError::Timeout(ms)));
                events.emit(TransportEvent::Closed(CloseReason::new(None, "connect timed out")));
                return;
            }
        },
        // Nothing but a close can be queued before the handshake completes.
        _ = outbound.recv() => {
            tracing::debug!(generation, "Close requested during handshake");
            events.emit(TransportEvent::Closed(CloseReason::new(None, "closed before open")));
            return;
        }
    };

    tracing::debug!(generation, "WebSocket handshake complete");
    events.emit(TransportEvent::Open);

    let (mut write, mut read) = stream.split();
    let mut closing = false;
    // Only armed once `closing` is set.
    let mut close_deadline = Instant::now();
    let mut close_reason: Option<CloseReason> = None;

    loop {
        tokio::select! {
            cmd = outbound.recv(), if !closing => match cmd {
                Some(Outbound::Text(text)) => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        events.emit(TransportEvent::Error(TransportError::Protocol(e.to_string())));
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    closing = true;
                    close_deadline = Instant::now() + timeouts.close;
                    match tokio::time::timeout_at(close_deadline, write.send(Message::Close(None))).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            tracing::debug!(generation, error = %e, "Failed to send close frame");
                            break;
                        }
                        Err(_) => {
                            close_reason = Some(CloseReason::new(None, "close timed out"));
                            break;
                        }
                    }
                }
            },
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    events.emit(TransportEvent::Message(Frame::Text(text.as_str().to_owned())));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    events.emit(TransportEvent::Message(Frame::Binary(bytes.to_vec())));
                }
                Some(Ok(Message::Close(frame))) => {
                    close_reason = Some(match frame {
                        Some(f) => CloseReason::new(Some(u16::from(f.code)), f.reason.as_str()),
                        None => CloseReason::default(),
                    });
                }
                Some(Ok(_)) => {}
                Some(Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed)) => break,
                Some(Err(e)) => {
                    events.emit(TransportEvent::Error(TransportError::Protocol(e.to_string())));
                    break;
                }
                None => break,
            },
            _ = tokio::time::sleep_until(close_deadline), if closing => {
                tracing::debug!(generation, "Peer did not finish the closing handshake");
                close_reason = Some(CloseReason::new(None, "close timed out"));
                break;
            }
        }
    }

    tracing::debug!(generation, "WebSocket closed");
    events.emit(TransportEvent::Closed(close_reason.unwrap_or_default()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_unparseable_address() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let connector = WebSocketConnector::default();

        let err = connector
            .open("not a url", EventSink::new(1, tx))
            .err()
            .expect("open should fail");
        assert!(matches!(err, TransportError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_rejects_non_websocket_scheme() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let connector = WebSocketConnector::default();

        let err = connector
            .open("http://localhost/stream", EventSink::new(1, tx))
            .err()
            .expect("open should fail");
        assert_eq!(err, TransportError::InvalidUrl("unsupported scheme 'http'".into()));
    }

    #[tokio::test]
    async fn test_unreachable_host_reports_error_then_close() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let connector = WebSocketConnector::new(Duration::from_secs(5));
        let _transport = connector
            .open(&format!("ws://{}/stream", addr), EventSink::new(7, tx))
            .unwrap();

        let (generation, first) = rx.recv().await.unwrap();
        assert_eq!(generation, 7);
        assert!(matches!(first, TransportEvent::Error(TransportError::Connect(_))));

        let (_, second) = rx.recv().await.unwrap();
        assert!(matches!(second, TransportEvent::Closed(_)));
    }
}
