// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! HTTP Transport
//!
//! JSON-RPC 2.0 over HTTP POST, plus plain GET for the message stream,
//! using reqwest's blocking client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{json, Value};
use tracing::{trace, warn};

use super::{Transport, TransportError, TransportResult, INTERNAL_ERROR, PARSE_ERROR};
use crate::config::ClientConfig;

/// HTTP transport for the MAGE JSON-RPC endpoint.
///
/// # Example
///
/// ```ignore
/// use mage_core::{ClientConfig, transport::HttpTransport};
///
/// let transport = HttpTransport::new(&ClientConfig::new("game"))?;
/// ```
pub struct HttpTransport {
    client: Client,
    url: RwLock<String>,
    headers: RwLock<HeaderMap>,
    long_polling_timeout: Duration,
    next_id: AtomicU64,
}

const USER_AGENT: &str = concat!("mage-core/", env!("CARGO_PKG_VERSION"));

impl HttpTransport {
    /// Creates a new HTTP transport from the client configuration.
    pub fn new(config: &ClientConfig) -> TransportResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransportError::connector(format!("HTTP client init failed: {}", e)))?;

        Ok(HttpTransport {
            client,
            url: RwLock::new(config.rpc_url()),
            headers: RwLock::new(HeaderMap::new()),
            long_polling_timeout: config.long_polling_timeout,
            next_id: AtomicU64::new(1),
        })
    }

    /// Builds the JSON-RPC 2.0 request envelope.
    fn envelope(&self, method: &str, params: &Value) -> Value {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut request = json!({
            "jsonrpc": "2.0",
            "method": method,
            "id": id,
        });
        if !params.is_null() {
            request["params"] = params.clone();
        }
        request
    }

    /// Extracts `result` from a JSON-RPC response, mapping `error` objects to faults.
    fn unwrap_response(mut body: Value) -> TransportResult<Value> {
        if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
            let code = error
                .get("code")
                .and_then(Value::as_i64)
                .and_then(|c| i32::try_from(c).ok())
                .unwrap_or(INTERNAL_ERROR);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("JSON-RPC error without message")
                .to_string();
            return Err(TransportError::new(code, message));
        }

        match body.get_mut("result") {
            Some(result) => Ok(result.take()),
            None => Err(TransportError::new(
                INTERNAL_ERROR,
                "Invalid JSON-RPC response: missing result",
            )),
        }
    }
}

impl Transport for HttpTransport {
    fn set_url(&self, url: &str) {
        *self.url.write() = url.to_string();
    }

    fn url(&self) -> String {
        self.url.read().clone()
    }

    fn set_header(&self, name: &str, value: &str) {
        let parsed = HeaderName::from_bytes(name.as_bytes())
            .ok()
            .zip(HeaderValue::from_str(value).ok());
        match parsed {
            Some((name, value)) => {
                self.headers.write().insert(name, value);
            }
            None => warn!(header = name, "Ignoring header with invalid name or value"),
        }
    }

    fn remove_header(&self, name: &str) {
        if let Ok(name) = HeaderName::from_bytes(name.as_bytes()) {
            self.headers.write().remove(name);
        }
    }

    fn call(&self, method: &str, params: &Value) -> TransportResult<Value> {
        let url = self.url();
        let headers = self.headers.read().clone();
        let request = self.envelope(method, params);

        trace!(%url, method, "JSON-RPC request");

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(&request)
            .send()
            .map_err(|e| TransportError::connector(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::connector(format!(
                "HTTP error: {}",
                status.as_u16()
            )));
        }

        let text = response
            .text()
            .map_err(|e| TransportError::connector(e.to_string()))?;
        let body: Value = serde_json::from_str(&text)
            .map_err(|e| TransportError::new(PARSE_ERROR, format!("Invalid JSON response: {}", e)))?;

        Self::unwrap_response(body)
    }

    fn get(&self, url: &str) -> TransportResult<String> {
        trace!(%url, "Message stream request");

        let response = self
            .client
            .get(url)
            .timeout(self.long_polling_timeout)
            .send()
            .map_err(|e| TransportError::connector(format!("Unable to pull events: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::connector(format!(
                "Unable to pull events: HTTP error {}",
                status.as_u16()
            )));
        }

        response
            .text()
            .map_err(|e| TransportError::connector(format!("Unable to pull events: {}", e)))
    }
}

// INLINE_TEST_REQUIRED: Tests private envelope and response unwrapping
#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> HttpTransport {
        HttpTransport::new(&ClientConfig::new("game")).unwrap()
    }

    #[test]
    fn test_new_transport_uses_config_url() {
        let transport = transport();
        assert_eq!(transport.url(), "http://localhost:8080/game/jsonrpc");
    }

    #[test]
    fn test_user_agent_carries_crate_version() {
        assert_eq!(
            USER_AGENT,
            format!("mage-core/{}", env!("CARGO_PKG_VERSION"))
        );
        assert!(!USER_AGENT.ends_with('/'));
    }

    #[test]
    fn test_envelope_increments_id() {
        let transport = transport();
        let first = transport.envelope("user.login", &json!({ "name": "bob" }));
        let second = transport.envelope("user.logout", &Value::Null);

        assert_eq!(first["jsonrpc"], "2.0");
        assert_eq!(first["method"], "user.login");
        assert_eq!(first["params"]["name"], "bob");
        assert_eq!(first["id"], 1);
        assert_eq!(second["id"], 2);
        assert!(second.get("params").is_none());
    }

    #[test]
    fn test_unwrap_response_result() {
        let result = HttpTransport::unwrap_response(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": { "ok": true }
        }))
        .unwrap();
        assert_eq!(result, json!({ "ok": true }));
    }

    #[test]
    fn test_unwrap_response_error_object() {
        let err = HttpTransport::unwrap_response(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32601, "message": "Method not found" }
        }))
        .unwrap_err();
        assert_eq!(err.code, -32601);
        assert_eq!(err.message, "Method not found");
    }

    #[test]
    fn test_unwrap_response_missing_result() {
        let err = HttpTransport::unwrap_response(json!({ "jsonrpc": "2.0", "id": 1 })).unwrap_err();
        assert_eq!(err.code, INTERNAL_ERROR);
    }

    #[test]
    fn test_headers_set_and_remove() {
        let transport = transport();
        transport.set_header("X-MAGE-SESSION", "abc");
        assert_eq!(
            transport.headers.read().get("x-mage-session").unwrap(),
            "abc"
        );

        transport.remove_header("X-MAGE-SESSION");
        assert!(transport.headers.read().get("x-mage-session").is_none());

        // Removing twice is fine
        transport.remove_header("X-MAGE-SESSION");
    }

    #[test]
    fn test_invalid_header_value_is_ignored() {
        let transport = transport();
        transport.set_header("X-MAGE-SESSION", "bad\nvalue");
        assert!(transport.headers.read().is_empty());
    }

    #[test]
    fn test_call_connection_refused_is_connector_fault() {
        let transport = transport();
        transport.set_url("http://127.0.0.1:1/game/jsonrpc");
        let err = transport.call("user.hello", &Value::Null).unwrap_err();
        assert_eq!(err.code, crate::transport::CLIENT_CONNECTOR_ERROR);
    }
}
