//! Connect-time resolution of address, auth and reconnect policy.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

use crate::client::options::ConnectOptions;
use crate::resilience::Backoff;

/// Characters left intact by `encodeURIComponent`-style encoding.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Frames the client itself sends.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutboundMessage<'a> {
    Auth { token: &'a str },
}

/// Immutable snapshot of everything `connect` was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Target {
    /// Address as passed by the caller; safe to log.
    pub base_url: String,
    /// Address actually opened, possibly carrying the token.
    pub url: String,
    /// Serialized auth frame to send right after open.
    pub auth_message: Option<String>,
    pub should_reconnect: bool,
    pub backoff: Backoff,
    pub max_attempts: Option<u32>,
}

impl Target {
    pub fn resolve(base_url: String, options: &ConnectOptions) -> Self {
        let token = options.auth_token.as_deref();

        let (url, auth_message) = match token {
            Some(token) if options.auth_as_query => (append_token_query(&base_url, token), None),
            Some(token) => (base_url.clone(), Some(auth_message(token))),
            None => (base_url.clone(), None),
        };

        Self {
            base_url,
            url,
            auth_message,
            should_reconnect: options.should_reconnect,
            backoff: Backoff::new(options.max_reconnect_delay(), options.jitter()),
            max_attempts: options.max_reconnect_attempts,
        }
    }
}

/// Append `token=<encoded>` using `&` when the address already has a query.
pub(crate) fn append_token_query(url: &str, token: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}token={}", url, separator, utf8_percent_encode(token, COMPONENT))
}

/// `{"type":"auth","token":"<token>"}`
pub(crate) fn auth_message(token: &str) -> String {
    serde_json::to_string(&OutboundMessage::Auth { token })
        .unwrap_or_else(|_| format!("{{\"type\":\"auth\",\"token\":{:?}}}", token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_token_uses_question_mark_without_existing_query() {
        let url = append_token_query("ws://host/stream", "abc");
        assert_eq!(url, "ws://host/stream?token=abc");
    }

    #[test]
    fn test_query_token_uses_ampersand_with_existing_query() {
        let url = append_token_query("ws://host/stream?x=1", "abc");
        assert_eq!(url, "ws://host/stream?x=1&token=abc");
    }

    #[test]
    fn test_query_token_is_percent_encoded() {
        let url = append_token_query("ws://host/s", "a b&c=d/é");
        assert_eq!(url, "ws://host/s?token=a%20b%26c%3Dd%2F%C3%A9");

        let url = append_token_query("ws://host/s", "A-z_0.9!~*'()");
        assert!(url.ends_with("?token=A-z_0.9!~*'()"));
    }

    #[test]
    fn test_auth_frame_shape() {
        let msg = auth_message("se\"cret");
        let value: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(value, serde_json::json!({"type": "auth", "token": "se\"cret"}));
    }

    #[test]
    fn test_resolve_with_query_auth_sends_no_frame() {
        let opts = ConnectOptions::default()
            .with_auth_token("t0k")
            .with_auth_as_query(true);
        let target = Target::resolve("wss://h/ws".into(), &opts);

        assert_eq!(target.url, "wss://h/ws?token=t0k");
        assert_eq!(target.base_url, "wss://h/ws");
        assert!(target.auth_message.is_none());
    }

    #[test]
    fn test_resolve_with_frame_auth_keeps_address() {
        let opts = ConnectOptions::default().with_auth_token("t0k");
        let target = Target::resolve("wss://h/ws".into(), &opts);

        assert_eq!(target.url, "wss://h/ws");
        assert_eq!(target.auth_message.as_deref(), Some(r#"{"type":"auth","token":"t0k"}"#));
    }

    #[test]
    fn test_resolve_without_token_is_untouched() {
        let opts = ConnectOptions::default().with_auth_as_query(true);
        let target = Target::resolve("ws://h/ws?x=1".into(), &opts);

        assert_eq!(target.url, "ws://h/ws?x=1");
        assert!(target.auth_message.is_none());
        assert!(target.should_reconnect);
        assert_eq!(target.max_attempts, None);
    }
}
