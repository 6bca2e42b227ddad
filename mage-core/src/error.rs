// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Error Types
//!
//! Unified error type for every MAGE client operation.

use thiserror::Error;

use crate::transport::TransportError;

/// Category of a [`MageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Local misuse or local failure (no session, poller already running,
    /// malformed server content).
    Client,
    /// The transport layer failed (connection refused, bad HTTP status,
    /// unreadable JSON-RPC envelope).
    Rpc,
    /// The server answered with a well-formed `errorCode`.
    Application,
}

/// Unified error type for MAGE operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MageError {
    /// Client-side error.
    #[error("client error: {0}")]
    Client(String),

    /// Transport fault reported by the RPC layer.
    #[error("MAGE RPC error: {message} (code {code})")]
    Rpc {
        /// Numeric fault code from the transport.
        code: i32,
        /// Fault description.
        message: String,
    },

    /// Error message sent back by the application.
    #[error("MAGE error message received: {code}")]
    Application {
        /// Server supplied error code.
        code: String,
    },
}

impl MageError {
    /// Creates a client error.
    pub fn client(message: impl Into<String>) -> Self {
        MageError::Client(message.into())
    }

    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MageError::Client(_) => ErrorKind::Client,
            MageError::Rpc { .. } => ErrorKind::Rpc,
            MageError::Application { .. } => ErrorKind::Application,
        }
    }

    /// Returns the error code as a string.
    ///
    /// Transport faults render their numeric code, application errors
    /// return the server code verbatim.
    pub fn code(&self) -> String {
        match self {
            MageError::Client(_) => "client".to_string(),
            MageError::Rpc { code, .. } => code.to_string(),
            MageError::Application { code } => code.clone(),
        }
    }
}

impl From<TransportError> for MageError {
    fn from(err: TransportError) -> Self {
        MageError::Rpc {
            code: err.code,
            message: err.message,
        }
    }
}

/// Result type for MAGE operations.
pub type MageResult<T> = Result<T, MageError>;
