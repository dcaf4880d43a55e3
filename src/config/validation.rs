//! Configuration validation.
//!
//! Serde handles syntax; this checks values. All problems are collected
//! rather than stopping at the first one.

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::ClientConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let stream = &config.stream;

    if stream.url.trim().is_empty() {
        errors.push(ValidationError::new("stream.url", "must be set"));
    } else {
        match Url::parse(&stream.url) {
            Ok(url) if matches!(url.scheme(), "ws" | "wss") => {}
            Ok(url) => errors.push(ValidationError::new(
                "stream.url",
                format!("scheme must be ws or wss, got '{}'", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new("stream.url", e.to_string())),
        }
    }

    if stream.options.max_reconnect_delay_ms == 0 {
        errors.push(ValidationError::new("stream.max_reconnect_delay_ms", "must be greater than 0"));
    }

    if matches!(stream.options.auth_token.as_deref(), Some(t) if t.is_empty()) {
        errors.push(ValidationError::new("stream.auth_token", "must not be empty when set"));
    }

    if config.transport.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("transport.connect_timeout_secs", "must be greater than 0"));
    }

    if config.transport.close_timeout_secs == 0 {
        errors.push(ValidationError::new("transport.close_timeout_secs", "must be greater than 0"));
    }

    let obs = &config.observability;
    if !LOG_LEVELS.contains(&obs.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", obs.log_level),
        ));
    }

    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", obs.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ClientConfig {
        let mut config = ClientConfig::default();
        config.stream.url = "wss://example.com/stream".into();
        config
    }

    #[test]
    fn test_accepts_valid_config() {
        assert_eq!(validate_config(&valid()), Ok(()));
    }

    #[test]
    fn test_default_config_needs_url() {
        let errors = validate_config(&ClientConfig::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::new("stream.url", "must be set")]);
    }

    #[test]
    fn test_collects_every_problem() {
        let mut config = valid();
        config.stream.url = "https://example.com".into();
        config.stream.options.max_reconnect_delay_ms = 0;
        config.stream.options.auth_token = Some(String::new());
        config.transport.connect_timeout_secs = 0;
        config.transport.close_timeout_secs = 0;
        config.observability.log_level = "loud".into();
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "nowhere".into();

        let fields: Vec<_> = validate_config(&config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.field)
            .collect();

        assert_eq!(
            fields,
            vec![
                "stream.url",
                "stream.max_reconnect_delay_ms",
                "stream.auth_token",
                "transport.connect_timeout_secs",
                "transport.close_timeout_secs",
                "observability.log_level",
                "observability.metrics_address",
            ]
        );
    }

    #[test]
    fn test_metrics_address_ignored_when_disabled() {
        let mut config = valid();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());
    }
}
