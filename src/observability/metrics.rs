//! Metrics collection and exposition.
//!
//! # Metrics
//! - `stream_client_connections_total` (counter): successful opens
//! - `stream_client_connected` (gauge): 1 while a connection is open
//! - `stream_client_reconnect_attempts_total` (counter): reconnects scheduled
//! - `stream_client_frames_total` (counter): inbound frames by `outcome` (parsed, dropped)
//! - `stream_client_errors_total` (counter): errors reported to the observer by `kind`
//!
//! Recording is a no-op until a recorder is installed with [`init_metrics`].

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_connection_opened() {
    counter!("stream_client_connections_total").increment(1);
    gauge!("stream_client_connected").set(1.0);
}

pub fn record_connection_closed() {
    gauge!("stream_client_connected").set(0.0);
}

pub fn record_reconnect_attempt() {
    counter!("stream_client_reconnect_attempts_total").increment(1);
}

pub fn record_frame(parsed: bool) {
    let outcome = if parsed { "parsed" } else { "dropped" };
    counter!("stream_client_frames_total", "outcome" => outcome).increment(1);
}

pub fn record_error(kind: &'static str) {
    counter!("stream_client_errors_total", "kind" => kind).increment(1);
}
