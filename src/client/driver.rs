//! Background task that owns the connection lifecycle.
//!
//! # Responsibilities
//! - Resolve targets and open transports
//! - Translate transport events into observer callbacks
//! - Schedule reconnects with backoff
//!
//! # Data Flow
//! ```text
//! StreamClient ──Command──┐
//! socket task ──(generation, TransportEvent)──┼──▶ select! ──▶ Driver ──▶ Observer
//! reconnect deadline ─────┘
//! ```
//!
//! # Design Decisions
//! - Single task; every callback runs here, so callbacks never overlap
//! - Events from a replaced transport are dropped by generation
//! - `closed` is shared with the handle so `close()` takes effect before its command is processed

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};

use crate::client::observer::Observer;
use crate::client::options::ConnectOptions;
use crate::client::state::{ConnectionState, Phase};
use crate::client::target::Target;
use crate::error::ClientError;
use crate::observability::metrics;
use crate::transport::{CloseReason, Connector, EventSink, Frame, TransportEvent};

pub(crate) type EventReceiver = mpsc::UnboundedReceiver<(u64, TransportEvent)>;

/// Requests from the public handle.
#[derive(Debug)]
pub(crate) enum Command {
    Connect { url: String, options: ConnectOptions },
    Close,
}

pub(crate) struct Driver {
    connector: Arc<dyn Connector>,
    observer: Arc<ArcSwap<Observer>>,
    closed: Arc<AtomicBool>,
    state_tx: watch::Sender<ConnectionState>,
    events_tx: mpsc::UnboundedSender<(u64, TransportEvent)>,
    target: Option<Target>,
    phase: Phase,
    attempts: u32,
    generation: u64,
}

impl Driver {
    pub fn new(
        connector: Arc<dyn Connector>,
        observer: Arc<ArcSwap<Observer>>,
        closed: Arc<AtomicBool>,
        state_tx: watch::Sender<ConnectionState>,
    ) -> (Self, EventReceiver) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let driver = Self {
            connector,
            observer,
            closed,
            state_tx,
            events_tx,
            target: None,
            phase: Phase::Idle,
            attempts: 0,
            generation: 0,
        };
        (driver, events_rx)
    }

    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>, mut events: EventReceiver) {
        loop {
            let deadline = self.phase.deadline();

            tokio::select! {
                biased;

                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => {
                        self.shutdown();
                        break;
                    }
                },
                Some((generation, event)) = events.recv() => {
                    self.handle_event(generation, event);
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.reconnect_due();
                }
            }
        }
    }

    pub fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect { url, options } => self.connect(url, options),
            Command::Close => self.close(),
        }
    }

    pub fn handle_event(&mut self, generation: u64, event: TransportEvent) {
        if generation != self.generation || !self.phase.has_transport() {
            tracing::trace!(generation, current = self.generation, "Dropping stale transport event");
            return;
        }

        match event {
            TransportEvent::Open => self.on_open(),
            TransportEvent::Message(frame) => self.on_frame(frame),
            TransportEvent::Error(err) => {
                tracing::warn!(generation, error = %err, "Transport error");
                self.report_error(ClientError::Transport(err));
            }
            TransportEvent::Closed(reason) => self.on_closed(reason),
        }
    }

    fn connect(&mut self, url: String, options: ConnectOptions) {
        self.release_for_replacement();

        let target = Target::resolve(url, &options);
        tracing::info!(
            url = %target.base_url,
            should_reconnect = target.should_reconnect,
            auth = options.auth_token.is_some(),
            auth_as_query = options.auth_as_query,
            "Connecting"
        );

        self.attempts = 0;
        self.target = Some(target);
        self.open();
    }

    /// Drop whatever the previous target left behind without scheduling a reconnect.
    fn release_for_replacement(&mut self) {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Connecting { mut transport } | Phase::Open { mut transport } => {
                transport.close();
                metrics::record_connection_closed();
                self.notify_close(&CloseReason::new(None, "replaced by new connect"));
            }
            Phase::Closing { .. } => {
                self.notify_close(&CloseReason::new(None, "replaced by new connect"));
            }
            Phase::ReconnectPending { attempt, .. } => {
                tracing::debug!(attempt, "Cancelled pending reconnect");
            }
            Phase::Idle | Phase::Closed => {}
        }
    }

    fn close(&mut self) {
        self.phase = match std::mem::replace(&mut self.phase, Phase::Closed) {
            Phase::Connecting { mut transport } | Phase::Open { mut transport } => {
                tracing::info!(generation = self.generation, "Closing connection");
                transport.close();
                Phase::Closing { _transport: transport }
            }
            Phase::ReconnectPending { attempt, .. } => {
                tracing::debug!(attempt, "Cancelled pending reconnect");
                Phase::Closed
            }
            closing @ Phase::Closing { .. } => closing,
            Phase::Idle | Phase::Closed => Phase::Closed,
        };
        self.publish();
    }

    fn shutdown(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Phase::Connecting { mut transport } | Phase::Open { mut transport } =
            std::mem::replace(&mut self.phase, Phase::Closed)
        {
            transport.close();
            metrics::record_connection_closed();
        }
        self.publish();
        tracing::debug!("Client handle dropped, driver stopped");
    }

    fn open(&mut self) {
        let Some(target) = &self.target else {
            return;
        };
        let url = target.url.clone();

        self.generation += 1;
        let sink = EventSink::new(self.generation, self.events_tx.clone());

        match self.connector.open(&url, sink) {
            Ok(transport) => {
                tracing::debug!(generation = self.generation, "Transport opening");
                self.phase = Phase::Connecting { transport };
                self.publish();
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to open transport");
                self.phase = Phase::Idle;
                self.report_error(ClientError::Transport(err));
                self.after_disconnect();
            }
        }
    }

    fn on_open(&mut self) {
        let mut transport = match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Connecting { transport } => transport,
            other => {
                self.phase = other;
                return;
            }
        };

        self.attempts = 0;
        metrics::record_connection_opened();
        tracing::info!(generation = self.generation, "Connection open");

        self.observer().notify_open();

        if let Some(msg) = self.target.as_ref().and_then(|t| t.auth_message.clone()) {
            if let Err(e) = transport.send(msg) {
                tracing::debug!(error = %e, "Failed to send auth message");
            }
        }

        self.phase = Phase::Open { transport };
        self.publish();
    }

    fn on_frame(&mut self, frame: Frame) {
        if !matches!(self.phase, Phase::Open { .. }) {
            return;
        }

        let parsed = match &frame {
            Frame::Text(text) => serde_json::from_str::<Value>(text),
            Frame::Binary(bytes) => serde_json::from_slice::<Value>(bytes),
        };

        match parsed {
            Ok(value) => {
                metrics::record_frame(true);
                self.observer().notify_data(value);
            }
            Err(e) => {
                metrics::record_frame(false);
                tracing::trace!(error = %e, "Dropping unparseable frame");
            }
        }
    }

    fn on_closed(&mut self, reason: CloseReason) {
        let was_closing = matches!(self.phase, Phase::Closing { .. });
        self.phase = if was_closing { Phase::Closed } else { Phase::Idle };

        metrics::record_connection_closed();
        tracing::info!(generation = self.generation, reason = %reason, "Connection closed");
        self.notify_close(&reason);

        if !was_closing {
            self.after_disconnect();
        } else {
            self.publish();
        }
    }

    /// Reconnect if still enabled, otherwise settle in `Closed`.
    fn after_disconnect(&mut self) {
        if self.reconnect_enabled() {
            self.schedule_reconnect();
        } else {
            self.phase = Phase::Closed;
            self.publish();
        }
    }

    pub(crate) fn schedule_reconnect(&mut self) {
        let Some(target) = &self.target else {
            return;
        };
        let backoff = target.backoff;

        if let Some(max) = target.max_attempts {
            if self.attempts >= max {
                tracing::warn!(attempts = self.attempts, "Max reconnect attempts reached");
                self.phase = Phase::Closed;
                self.report_error(ClientError::ReconnectExhausted(self.attempts));
                self.publish();
                return;
            }
        }

        self.attempts += 1;
        let attempt = self.attempts;
        metrics::record_reconnect_attempt();
        self.observer().notify_reconnect_attempt(attempt);

        let delay = backoff.delay(attempt);
        tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "Scheduling reconnect");

        // Replacing the phase drops any previously armed deadline.
        self.phase = Phase::ReconnectPending {
            attempt,
            deadline: Instant::now() + delay,
        };
        self.publish();
    }

    pub(crate) fn reconnect_due(&mut self) {
        let Phase::ReconnectPending { attempt, .. } = self.phase else {
            return;
        };

        if !self.reconnect_enabled() {
            self.phase = Phase::Closed;
            self.publish();
            return;
        }

        tracing::debug!(attempt, "Reconnecting");
        self.phase = Phase::Idle;
        self.open();
    }

    fn reconnect_enabled(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
            && self.target.as_ref().is_some_and(|t| t.should_reconnect)
    }

    fn report_error(&self, err: ClientError) {
        metrics::record_error(err.kind());
        self.observer().notify_error(&err);
    }

    fn notify_close(&self, reason: &CloseReason) {
        self.observer().notify_close(reason);
    }

    fn observer(&self) -> Arc<Observer> {
        self.observer.load_full()
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.phase.state());
    }

    #[cfg(test)]
    pub(crate) fn phase(&self) -> &Phase {
        &self.phase
    }

    #[cfg(test)]
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }
}
