//! Resilient stream client.
//!
//! # Data Flow
//! ```text
//! connect(url, options)
//!     → target.rs (query-token injection, auth frame, backoff policy)
//!     → driver.rs (single task: open → data* → close → backoff → reopen)
//!     → observer.rs (on_open / on_data / on_close / on_error / on_reconnect_attempt)
//! ```
//!
//! # Design Decisions
//! - The handle never blocks; all work happens on one spawned driver task
//! - Options are resolved once per `connect` into an immutable target
//! - Reconnection is unbounded unless `max_reconnect_attempts` is set

mod driver;
pub mod observer;
pub mod options;
pub mod state;
mod target;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::ClientError;
use crate::transport::{CloseReason, Connector, WebSocketConnector};
use driver::{Command, Driver};

pub use observer::Observer;
pub use options::ConnectOptions;
pub use state::ConnectionState;

/// Handle to a self-healing connection to a JSON streaming endpoint.
///
/// Must be created from within a Tokio runtime. Dropping the handle stops
/// the background task and closes any live connection without a final
/// `on_close`.
pub struct StreamClient {
    commands: mpsc::UnboundedSender<Command>,
    observer: Arc<ArcSwap<Observer>>,
    closed: Arc<AtomicBool>,
    state: watch::Receiver<ConnectionState>,
    _task: JoinHandle<()>,
}

impl StreamClient {
    /// Create a client that connects over WebSocket.
    pub fn new() -> Self {
        Self::with_connector(WebSocketConnector::default())
    }

    /// Create a client on top of an arbitrary transport.
    pub fn with_connector(connector: impl Connector) -> Self {
        let observer = Arc::new(ArcSwap::from_pointee(Observer::default()));
        let closed = Arc::new(AtomicBool::new(false));
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let (driver, events_rx) = Driver::new(
            Arc::new(connector),
            observer.clone(),
            closed.clone(),
            state_tx,
        );
        let task = tokio::spawn(driver.run(cmd_rx, events_rx));

        Self {
            commands: cmd_tx,
            observer,
            closed,
            state: state_rx,
            _task: task,
        }
    }

    /// Open (or replace) the connection to `url`.
    ///
    /// A previous connection is closed, its `on_close` fires, and the
    /// attempt counter restarts from zero.
    pub fn connect(&self, url: impl Into<String>, options: ConnectOptions) {
        self.closed.store(false, Ordering::SeqCst);
        let _ = self.commands.send(Command::Connect {
            url: url.into(),
            options,
        });
    }

    /// Stop reconnecting and close the active connection, if any.
    ///
    /// Reconnection is disabled before this returns; the transport close and
    /// the final `on_close` complete asynchronously. Calling it again is a no-op.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let _ = self.commands.send(Command::Close);
    }

    /// Replace all callbacks at once.
    pub fn set_observer(&self, observer: Observer) {
        self.observer.store(Arc::new(observer));
    }

    pub fn on_open(&self, f: impl Fn() + Send + Sync + 'static) {
        let f: observer::OnOpenCallback = Arc::new(f);
        self.update_observer(|o| o.on_open = Some(f.clone()));
    }

    pub fn on_data(&self, f: impl Fn(Value) + Send + Sync + 'static) {
        let f: observer::OnDataCallback = Arc::new(f);
        self.update_observer(|o| o.on_data = Some(f.clone()));
    }

    pub fn on_close(&self, f: impl Fn(&CloseReason) + Send + Sync + 'static) {
        let f: observer::OnCloseCallback = Arc::new(f);
        self.update_observer(|o| o.on_close = Some(f.clone()));
    }

    pub fn on_error(&self, f: impl Fn(&ClientError) + Send + Sync + 'static) {
        let f: observer::OnErrorCallback = Arc::new(f);
        self.update_observer(|o| o.on_error = Some(f.clone()));
    }

    pub fn on_reconnect_attempt(&self, f: impl Fn(u32) + Send + Sync + 'static) {
        let f: observer::OnReconnectAttemptCallback = Arc::new(f);
        self.update_observer(|o| o.on_reconnect_attempt = Some(f.clone()));
    }

    /// Current connection phase.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch channel that follows every phase change.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Resolve once the client has settled in `Closed`.
    pub async fn closed(&self) {
        let mut rx = self.state.clone();
        let _ = rx.wait_for(|s| *s == ConnectionState::Closed).await;
    }

    fn update_observer(&self, apply: impl Fn(&mut Observer)) {
        self.observer.rcu(|current| {
            let mut next = Observer::clone(current);
            apply(&mut next);
            next
        });
    }
}

impl Default for StreamClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamClient")
            .field("state", &self.state())
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}
