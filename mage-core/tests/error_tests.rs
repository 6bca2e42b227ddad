//! Tests for error
//! Extracted from error.rs

use mage_core::transport::{CLIENT_CONNECTOR_ERROR, PARSE_ERROR};
use mage_core::*;

#[test]
fn test_error_display() {
    let err = MageError::client("No session key registered.");
    assert_eq!(err.to_string(), "client error: No session key registered.");

    let err = MageError::Rpc {
        code: PARSE_ERROR,
        message: "Invalid JSON response".into(),
    };
    assert_eq!(
        err.to_string(),
        "MAGE RPC error: Invalid JSON response (code -32700)"
    );

    let err = MageError::Application {
        code: "E_BANNED".into(),
    };
    assert_eq!(err.to_string(), "MAGE error message received: E_BANNED");
}

#[test]
fn test_error_kinds_and_codes() {
    let client = MageError::client("oops");
    assert_eq!(client.kind(), ErrorKind::Client);
    assert_eq!(client.code(), "client");

    let rpc = MageError::from(TransportError::connector("refused"));
    assert_eq!(rpc.kind(), ErrorKind::Rpc);
    assert_eq!(rpc.code(), "-32003");

    let app = MageError::Application { code: "E1".into() };
    assert_eq!(app.kind(), ErrorKind::Application);
    assert_eq!(app.code(), "E1");
}

#[test]
fn test_transport_error_conversion_keeps_fields() {
    let err: MageError = TransportError::new(-32601, "Method not found").into();
    assert_eq!(
        err,
        MageError::Rpc {
            code: -32601,
            message: "Method not found".into()
        }
    );
}

#[test]
fn test_connector_fault_code() {
    assert_eq!(
        TransportError::connector("x").code,
        CLIENT_CONNECTOR_ERROR
    );
}
