//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ClientConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML configuration file without semantic validation.
///
/// Use this when overrides are applied before validating.
pub fn read_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse configuration from a TOML string.
pub fn parse_config(content: &str) -> Result<ClientConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;

    #[test]
    fn test_parses_full_file() {
        let config = parse_config(
            r#"
            [stream]
            url = "wss://example.com/stream?x=1"
            should_reconnect = true
            max_reconnect_delay_ms = 5000
            auth_token = "secret"
            auth_as_query = true
            jitter_ms = 0
            max_reconnect_attempts = 7

            [transport]
            connect_timeout_secs = 3
            close_timeout_secs = 2

            [observability]
            log_level = "debug"
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.stream.url, "wss://example.com/stream?x=1");
        assert_eq!(config.stream.options.max_reconnect_delay_ms, 5000);
        assert_eq!(config.stream.options.auth_token.as_deref(), Some("secret"));
        assert!(config.stream.options.auth_as_query);
        assert_eq!(config.stream.options.jitter_ms, 0);
        assert_eq!(config.stream.options.max_reconnect_attempts, Some(7));
        assert_eq!(config.transport.connect_timeout_secs, 3);
        assert_eq!(config.transport.close_timeout_secs, 2);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn test_minimal_file_uses_defaults() {
        let config = parse_config("[stream]\nurl = \"ws://localhost:9000/ws\"\n").unwrap();

        assert!(config.stream.options.should_reconnect);
        assert_eq!(config.stream.options.max_reconnect_delay_ms, 30_000);
        assert_eq!(config.stream.options.jitter_ms, 1000);
        assert_eq!(config.transport.connect_timeout_secs, 10);
        assert_eq!(config.transport.close_timeout_secs, 5);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(matches!(parse_config("[stream"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_reports_validation_errors() {
        let path = std::env::temp_dir().join(format!("resilient-stream-{}.toml", std::process::id()));
        fs::write(&path, "[stream]\nurl = \"http://nope\"\nmax_reconnect_delay_ms = 0\n").unwrap();

        let err = load_config(&path).unwrap_err();
        let _ = fs::remove_file(&path);

        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {}", other),
        }
    }
}
