//! Consumer callbacks for connection lifecycle and data events.
//!
//! All callbacks are optional and may be replaced at any time, either as a
//! whole ([`StreamClient::set_observer`](crate::StreamClient::set_observer))
//! or one at a time.
//!
//! # Panics in callbacks
//!
//! A callback that panics is caught at the call site, logged at `warn`, and
//! otherwise ignored. The client's bookkeeping continues as if the callback
//! had returned normally; in particular a panicking `on_reconnect_attempt`
//! does not prevent the reconnect from being armed.
//!
//! # Example
//!
//! ```rust,no_run
//! use resilient_stream::{ConnectOptions, Observer, StreamClient};
//!
//! # async fn example() {
//! let client = StreamClient::new();
//! client.set_observer(
//!     Observer::new()
//!         .on_open(|| println!("connected"))
//!         .on_data(|value| println!("{}", value))
//!         .on_reconnect_attempt(|n| println!("reconnect #{}", n)),
//! );
//! client.connect("wss://example.com/stream", ConnectOptions::default());
//! # }
//! ```

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;

use crate::error::ClientError;
use crate::transport::CloseReason;

pub type OnOpenCallback = Arc<dyn Fn() + Send + Sync>;
pub type OnDataCallback = Arc<dyn Fn(Value) + Send + Sync>;
pub type OnCloseCallback = Arc<dyn Fn(&CloseReason) + Send + Sync>;
pub type OnErrorCallback = Arc<dyn Fn(&ClientError) + Send + Sync>;
pub type OnReconnectAttemptCallback = Arc<dyn Fn(u32) + Send + Sync>;

/// Set of optional lifecycle callbacks.
#[derive(Clone, Default)]
pub struct Observer {
    pub(crate) on_open: Option<OnOpenCallback>,
    pub(crate) on_data: Option<OnDataCallback>,
    pub(crate) on_close: Option<OnCloseCallback>,
    pub(crate) on_error: Option<OnErrorCallback>,
    pub(crate) on_reconnect_attempt: Option<OnReconnectAttemptCallback>,
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("on_open", &self.on_open.is_some())
            .field("on_data", &self.on_data.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_reconnect_attempt", &self.on_reconnect_attempt.is_some())
            .finish()
    }
}

impl Observer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoked once each time a connection is established.
    pub fn on_open(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_open = Some(Arc::new(f));
        self
    }

    /// Invoked once per inbound frame that parses as JSON.
    pub fn on_data(mut self, f: impl Fn(Value) + Send + Sync + 'static) -> Self {
        self.on_data = Some(Arc::new(f));
        self
    }

    /// Invoked once per connection termination, including the last one after `close()`.
    pub fn on_close(mut self, f: impl Fn(&CloseReason) + Send + Sync + 'static) -> Self {
        self.on_close = Some(Arc::new(f));
        self
    }

    /// Invoked on transport errors and open failures. Parse failures are never reported.
    pub fn on_error(mut self, f: impl Fn(&ClientError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Invoked just before each reconnect is scheduled with the 1-based attempt number.
    pub fn on_reconnect_attempt(mut self, f: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.on_reconnect_attempt = Some(Arc::new(f));
        self
    }

    pub(crate) fn notify_open(&self) {
        if let Some(cb) = &self.on_open {
            guarded("on_open", || cb());
        }
    }

    pub(crate) fn notify_data(&self, value: Value) {
        if let Some(cb) = &self.on_data {
            guarded("on_data", || cb(value));
        }
    }

    pub(crate) fn notify_close(&self, reason: &CloseReason) {
        if let Some(cb) = &self.on_close {
            guarded("on_close", || cb(reason));
        }
    }

    pub(crate) fn notify_error(&self, error: &ClientError) {
        if let Some(cb) = &self.on_error {
            guarded("on_error", || cb(error));
        }
    }

    pub(crate) fn notify_reconnect_attempt(&self, attempt: u32) {
        if let Some(cb) = &self.on_reconnect_attempt {
            guarded("on_reconnect_attempt", || cb(attempt));
        }
    }
}

fn guarded(callback: &'static str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        tracing::warn!(callback, "Observer callback panicked; ignoring");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_missing_callbacks_are_noops() {
        let observer = Observer::new();
        observer.notify_open();
        observer.notify_data(Value::Null);
        observer.notify_close(&CloseReason::default());
        observer.notify_reconnect_attempt(1);
    }

    #[test]
    fn test_panicking_callback_is_contained() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let observer = Observer::new().on_reconnect_attempt(move |n| {
            c.fetch_add(n, Ordering::SeqCst);
            panic!("observer bug");
        });

        observer.notify_reconnect_attempt(3);
        observer.notify_reconnect_attempt(4);
        assert_eq!(calls.load(Ordering::SeqCst), 7);
    }
}
