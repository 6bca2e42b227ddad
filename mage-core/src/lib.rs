// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! MAGE Core Library
//!
//! Client SDK for MAGE game servers: JSON-RPC calls, session handling and
//! delivery of server events pushed through the message stream.
//!
//! Without the `threaded` feature only the synchronous core is compiled
//! (`call`, `pull_events`, observers).

mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod msgstream;
#[cfg(feature = "threaded")]
pub mod threaded;
pub mod transport;

pub use client::RpcClient;
pub use config::ClientConfig;
pub use connection::Endpoint;
pub use error::{ErrorKind, MageError, MageResult};
pub use events::{CallbackObserver, Event, EventObserver, MalformedEvent, ObserverId};
pub use msgstream::PollingMode;
#[cfg(feature = "threaded")]
pub use threaded::{CallFuture, TaskId};
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::{MockTransport, Transport, TransportError};
