//! resilient-stream CLI
//!
//! Follows a JSON WebSocket stream and prints each parsed message to stdout
//! as one compact JSON line. Reconnects with jittered exponential backoff
//! until interrupted.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌────────────┐   ┌────────────┐   ┌──────────────────────────────────┐
//!   │  config    │──▶│   flags    │──▶│          StreamClient            │
//!   │  (TOML)    │   │  (clap)    │   │  ┌────────┐   ┌───────────────┐  │
//!   └────────────┘   └────────────┘   │  │ driver │──▶│ websocket     │◀─┼──── Server
//!                                     │  │  task  │◀──│ socket task   │  │
//!                                     │  └───┬────┘   └───────────────┘  │
//!                                     └──────┼───────────────────────────┘
//!                                            ▼
//!                                  on_data → stdout (JSON lines)
//!                                  lifecycle → tracing (stderr), metrics
//! ```

use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use resilient_stream::config::{self, ClientConfig, ConfigError, LogFormat};
use resilient_stream::lifecycle::shutdown_signal;
use resilient_stream::observability::{logging, metrics};
use resilient_stream::{Observer, StreamClient, WebSocketConnector};

/// How long to wait for the final close after a shutdown signal.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "resilient-stream")]
#[command(about = "Follow a JSON WebSocket stream with automatic reconnection", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stream address (overrides `stream.url`).
    #[arg(short, long)]
    url: Option<String>,

    /// Authentication token.
    #[arg(long, env = "RESILIENT_STREAM_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Send the token as a query parameter instead of an auth message.
    #[arg(long)]
    auth_as_query: bool,

    /// Exit after the first disconnect instead of reconnecting.
    #[arg(long)]
    no_reconnect: bool,

    /// Ceiling for reconnect delays in milliseconds.
    #[arg(long)]
    max_reconnect_delay_ms: Option<u64>,

    /// Give up after this many consecutive reconnect attempts.
    #[arg(long)]
    max_reconnect_attempts: Option<u32>,

    /// Log format: pretty or json.
    #[arg(long, value_parser = parse_log_format)]
    log_format: Option<LogFormat>,
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    match s.to_ascii_lowercase().as_str() {
        "pretty" => Ok(LogFormat::Pretty),
        "json" => Ok(LogFormat::Json),
        other => Err(format!("unknown log format '{}'", other)),
    }
}

impl Cli {
    fn apply(self, config: &mut ClientConfig) {
        let opts = &mut config.stream.options;
        if let Some(url) = self.url {
            config.stream.url = url;
        }
        if let Some(token) = self.token {
            opts.auth_token = Some(token);
        }
        if self.auth_as_query {
            opts.auth_as_query = true;
        }
        if self.no_reconnect {
            opts.should_reconnect = false;
        }
        if let Some(ms) = self.max_reconnect_delay_ms {
            opts.max_reconnect_delay_ms = ms;
        }
        if let Some(n) = self.max_reconnect_attempts {
            opts.max_reconnect_attempts = Some(n);
        }
        if let Some(format) = self.log_format {
            config.observability.log_format = format;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::read_config(path)?,
        None => ClientConfig::default(),
    };
    cli.apply(&mut config);
    config::validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability);
    tracing::info!("resilient-stream v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let connector = WebSocketConnector::new(Duration::from_secs(config.transport.connect_timeout_secs))
        .with_close_timeout(Duration::from_secs(config.transport.close_timeout_secs));
    let client = StreamClient::with_connector(connector);
    client.set_observer(
        Observer::new()
            .on_open(|| tracing::info!("Stream connected"))
            .on_data(|value| {
                let mut out = std::io::stdout().lock();
                if writeln!(out, "{}", value).is_err() {
                    tracing::warn!("Failed to write message to stdout");
                }
            })
            .on_close(|reason| tracing::info!(reason = %reason, "Stream disconnected"))
            .on_error(|err| tracing::warn!(error = %err, "Stream error"))
            .on_reconnect_attempt(|attempt| tracing::info!(attempt, "Reconnecting")),
    );

    client.connect(config.stream.url.clone(), config.stream.options.clone());

    tokio::select! {
        _ = shutdown_signal() => {
            client.close();
            if tokio::time::timeout(CLOSE_GRACE, client.closed()).await.is_err() {
                tracing::warn!("Timed out waiting for the stream to close");
            }
        }
        _ = client.closed() => {
            tracing::info!("Stream closed, not reconnecting");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
