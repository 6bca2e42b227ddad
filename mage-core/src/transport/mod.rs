// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Transport Layer
//!
//! Platform-agnostic abstraction over the JSON-RPC endpoint and the
//! message stream side channel.
//!
//! # Architecture
//!
//! - **Transport trait**: blocking interface used by the call engine and the poller
//! - **MockTransport**: scripted transport for tests
//! - **HttpTransport**: JSON-RPC 2.0 over HTTP (feature `http`)

mod mock;

#[cfg(feature = "http")]
mod http;

use serde_json::Value;
use thiserror::Error;

pub use mock::{MockTransport, RecordedCall};

#[cfg(feature = "http")]
pub use http::HttpTransport;

/// Header carrying the session key on every JSON-RPC request.
pub const SESSION_HEADER: &str = "X-MAGE-SESSION";

/// Fault code for failures below the JSON-RPC layer (connect, HTTP status, timeout).
pub const CLIENT_CONNECTOR_ERROR: i32 = -32003;

/// Fault code for a response body that is not valid JSON.
pub const PARSE_ERROR: i32 = -32700;

/// Fault code for a JSON-RPC response carrying neither `result` nor `error`.
pub const INTERNAL_ERROR: i32 = -32603;

/// Transport-level fault.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (code {code})")]
pub struct TransportError {
    /// Numeric fault code.
    pub code: i32,
    /// Fault description.
    pub message: String,
}

impl TransportError {
    /// Creates a fault with an explicit code.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        TransportError {
            code,
            message: message.into(),
        }
    }

    /// Creates a connector fault (the request never produced a usable HTTP response).
    pub fn connector(message: impl Into<String>) -> Self {
        Self::new(CLIENT_CONNECTOR_ERROR, message)
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Transport used by the RPC client.
///
/// All methods take `&self`: one transport is shared between the caller's
/// thread, background call tasks and the poller, so implementations keep
/// their mutable state (URL, default headers) behind their own locks.
///
/// # Example
///
/// ```ignore
/// use mage_core::transport::{MockTransport, Transport};
/// use serde_json::json;
///
/// let transport = MockTransport::new();
/// transport.queue_response(json!({ "ok": true }));
/// transport.set_url("http://localhost:8080/game/jsonrpc");
/// let response = transport.call("user.hello", &json!({}))?;
/// ```
pub trait Transport: Send + Sync {
    /// Replaces the JSON-RPC endpoint URL used by subsequent calls.
    fn set_url(&self, url: &str);

    /// Returns the current JSON-RPC endpoint URL.
    fn url(&self) -> String;

    /// Adds or replaces a default header sent with every JSON-RPC call.
    fn set_header(&self, name: &str, value: &str);

    /// Removes a default header. Safe to call when the header is absent.
    fn remove_header(&self, name: &str);

    /// Performs one JSON-RPC round trip and returns the `result` value.
    fn call(&self, method: &str, params: &Value) -> TransportResult<Value>;

    /// Performs a plain HTTP GET and returns the response body.
    ///
    /// Used by the message stream side channel, which does not carry the
    /// default headers (the session key travels in the query string).
    fn get(&self, url: &str) -> TransportResult<String>;
}
