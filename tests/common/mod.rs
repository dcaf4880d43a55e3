//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::WebSocketStream;

use resilient_stream::{Connector, EventSink, Observer, Transport, TransportError};

/// Upper bound for any single wait in a test.
pub const WAIT: Duration = Duration::from_secs(5);

/// Everything an [`Observer`] can report, flattened for assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum Seen {
    Open,
    Data(Value),
    Close,
    Error(String),
    Reconnect(u32),
}

/// Observer that forwards every callback into a channel.
pub fn recording_observer() -> (Observer, mpsc::UnboundedReceiver<Seen>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (t1, t2, t3, t4, t5) = (tx.clone(), tx.clone(), tx.clone(), tx.clone(), tx);

    let observer = Observer::new()
        .on_open(move || {
            let _ = t1.send(Seen::Open);
        })
        .on_data(move |v| {
            let _ = t2.send(Seen::Data(v));
        })
        .on_close(move |_| {
            let _ = t3.send(Seen::Close);
        })
        .on_error(move |e| {
            let _ = t4.send(Seen::Error(e.to_string()));
        })
        .on_reconnect_attempt(move |n| {
            let _ = t5.send(Seen::Reconnect(n));
        });

    (observer, rx)
}

/// Receive the next observation or fail the test after [`WAIT`].
pub async fn next_seen(rx: &mut mpsc::UnboundedReceiver<Seen>) -> Seen {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for observer callback")
        .expect("observer channel closed")
}

/// A connection handed out by [`ChannelConnector`].
pub struct OpenedConnection {
    pub url: String,
    pub events: EventSink,
    pub sent: Arc<Mutex<Vec<String>>>,
}

/// Connector whose transports are driven by the test through their [`EventSink`].
pub struct ChannelConnector {
    opened: mpsc::UnboundedSender<OpenedConnection>,
}

impl ChannelConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OpenedConnection>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { opened: tx }, rx)
    }
}

struct ChannelTransport {
    sent: Arc<Mutex<Vec<String>>>,
}

impl Transport for ChannelTransport {
    fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    fn close(&mut self) {}
}

impl Connector for ChannelConnector {
    fn open(&self, url: &str, events: EventSink) -> Result<Box<dyn Transport>, TransportError> {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let _ = self.opened.send(OpenedConnection {
            url: url.to_owned(),
            events,
            sent: sent.clone(),
        });
        Ok(Box::new(ChannelTransport { sent }))
    }
}

/// Start a WebSocket server on an ephemeral port.
///
/// `handler` runs once per accepted connection with the socket and the
/// request URI (path and query) the client asked for.
pub async fn start_ws_server<F, Fut>(handler: F) -> SocketAddr
where
    F: Fn(WebSocketStream<TcpStream>, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let handler = handler.clone();
            tokio::spawn(async move {
                let (uri_tx, uri_rx) = oneshot::channel();
                let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                    let _ = uri_tx.send(req.uri().to_string());
                    Ok(resp)
                };

                if let Ok(ws) = tokio_tungstenite::accept_hdr_async(socket, callback).await {
                    let uri = uri_rx.await.unwrap_or_default();
                    handler(ws, uri).await;
                }
            });
        }
    });

    addr
}
