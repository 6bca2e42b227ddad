// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! RPC Client
//!
//! Main entry point: connection setters, synchronous calls, event
//! observers and single-shot message stream pulls. The background engine
//! (futures, fire-and-forget tasks, the poller) is added by the
//! `threaded` feature.
//!
//! # Example
//!
//! ```ignore
//! use mage_core::{ClientConfig, RpcClient};
//! use serde_json::json;
//!
//! let client = RpcClient::new(ClientConfig::new("game"))?;
//! let response = client.call("user.register", &json!({ "username": "bob" }))?;
//! ```

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::ClientConfig;
use crate::connection::{Connection, Endpoint};
use crate::error::{MageError, MageResult};
use crate::events::{Event, EventObserver, ObserverId, ObserverRegistry};
use crate::msgstream::{parse_stream_body, ChannelBatch, PendingConfirmations, PollingMode, StreamBody};
use crate::transport::Transport;

#[cfg(feature = "http")]
use crate::transport::HttpTransport;

#[cfg(feature = "threaded")]
use crate::threaded::ThreadedState;

/// State shared between the client handle and its background threads.
pub(crate) struct Shared<T> {
    pub(crate) connection: Connection,
    pub(crate) transport: T,
    pub(crate) observers: ObserverRegistry,
    pub(crate) confirmations: PendingConfirmations,
}

impl<T: Transport> Shared<T> {
    /// Performs a call and handles the application level envelope.
    pub(crate) fn call(&self, method: &str, params: &Value) -> MageResult<Value> {
        trace!(method, "RPC call");

        let response = self.transport.call(method, params).map_err(|e| {
            debug!(method, code = e.code, error = %e.message, "RPC call failed");
            MageError::from(e)
        })?;

        if let Some(code) = response.get("errorCode").filter(|c| !c.is_null()) {
            let code = match code {
                Value::String(code) => code.clone(),
                other => other.to_string(),
            };
            debug!(method, %code, "Server returned an error code");
            return Err(MageError::Application { code });
        }

        if let Some(events) = response.get("myEvents").and_then(Value::as_array) {
            self.deliver_inline_events(events)?;
        }

        Ok(response)
    }

    /// Broadcasts the entries of a `myEvents` array.
    fn deliver_inline_events(&self, entries: &[Value]) -> MageResult<usize> {
        let mut delivered = 0;
        let mut malformed = 0;

        for entry in entries {
            match Event::from_inline(entry) {
                Ok(event) => {
                    debug!(event = %event.name, "Delivering inline event");
                    self.observers.broadcast(&event);
                    delivered += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Skipping malformed inline event");
                    malformed += 1;
                }
            }
        }

        if malformed > 0 {
            return Err(MageError::client(format!(
                "{} of {} inline events were malformed",
                malformed,
                entries.len()
            )));
        }
        Ok(delivered)
    }

    /// Runs one message stream cycle.
    pub(crate) fn pull_events(&self, mode: PollingMode) -> MageResult<usize> {
        let sent = self.confirmations.snapshot();
        let url = self.connection.msg_stream_url(mode, &sent)?;

        let body = self.transport.get(&url).map_err(|e| {
            debug!(code = e.code, error = %e.message, "Message stream request failed");
            MageError::from(e)
        })?;

        // The server has seen the ids once it answered.
        self.confirmations.acknowledge(&sent);

        match parse_stream_body(&body)? {
            StreamBody::Empty => Ok(0),
            StreamBody::Heartbeat => {
                trace!("Message stream heartbeat");
                Ok(0)
            }
            StreamBody::Messages(batches) => self.deliver_batches(batches),
        }
    }

    fn deliver_batches(&self, batches: Vec<ChannelBatch>) -> MageResult<usize> {
        let mut delivered = 0;
        let mut malformed = 0;

        for batch in batches {
            for event in batch.events {
                match event {
                    Ok(event) => {
                        debug!(channel = %batch.channel, event = %event.name, "Delivering event");
                        self.observers.broadcast(&event);
                        delivered += 1;
                    }
                    Err(e) => {
                        warn!(channel = %batch.channel, error = %e, "Skipping malformed event");
                        malformed += 1;
                    }
                }
            }
            self.confirmations.push(batch.channel);
        }

        if malformed > 0 {
            return Err(MageError::client(format!(
                "{} received events have an invalid format.",
                malformed
            )));
        }
        Ok(delivered)
    }
}

/// Client for one MAGE application.
///
/// Every method takes `&self`; the client can be shared between threads
/// behind an `Arc`. Dropping it stops the poller and cancels outstanding
/// background calls.
pub struct RpcClient<T: Transport> {
    pub(crate) shared: Arc<Shared<T>>,
    #[cfg(feature = "threaded")]
    pub(crate) threaded: ThreadedState,
}

#[cfg(feature = "http")]
impl RpcClient<HttpTransport> {
    /// Creates a client talking HTTP to the configured endpoint.
    pub fn new(config: ClientConfig) -> MageResult<Self> {
        let transport = HttpTransport::new(&config).map_err(|e| {
            MageError::client(format!("Unable to create the HTTP transport: {}", e.message))
        })?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> RpcClient<T> {
    /// Creates a client on top of an existing transport.
    ///
    /// The transport URL is set from the configuration, and the session
    /// header is installed if the configuration carries a session key.
    pub fn with_transport(config: ClientConfig, transport: T) -> MageResult<Self> {
        config.validate()?;

        let connection = Connection::new(&config);
        transport.set_url(&connection.url());

        let shared = Arc::new(Shared {
            connection,
            transport,
            observers: ObserverRegistry::new(),
            confirmations: PendingConfirmations::new(),
        });

        if let Some(session_key) = config.session_key.as_deref() {
            shared.connection.set_session(&shared.transport, session_key);
        }

        Ok(RpcClient {
            shared,
            #[cfg(feature = "threaded")]
            threaded: ThreadedState::new(&config),
        })
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &T {
        &self.shared.transport
    }

    // === Calls ===

    /// Calls a user command and waits for the response.
    ///
    /// Fails with [`MageError::Rpc`] on transport faults, with
    /// [`MageError::Application`] when the response carries an `errorCode`,
    /// and with [`MageError::Client`] when inline events were malformed
    /// (well-formed ones are still delivered).
    pub fn call(&self, method: &str, params: &Value) -> MageResult<Value> {
        self.shared.call(method, params)
    }

    /// Runs one message stream cycle on the calling thread.
    ///
    /// Returns the number of events delivered to observers. Channel keys
    /// of this response are confirmed with the next pull.
    pub fn pull_events(&self, mode: PollingMode) -> MageResult<usize> {
        self.shared.pull_events(mode)
    }

    // === Connection ===

    /// Sets the URL scheme.
    pub fn set_protocol(&self, protocol: &str) {
        let url = self
            .shared
            .connection
            .update_endpoint(&self.shared.transport, |e| e.protocol = protocol.to_string());
        debug!(%url, "Protocol changed");
    }

    /// Sets the domain.
    pub fn set_domain(&self, domain: &str) {
        let url = self
            .shared
            .connection
            .update_endpoint(&self.shared.transport, |e| e.domain = domain.to_string());
        debug!(%url, "Domain changed");
    }

    /// Sets the application name.
    pub fn set_application(&self, application: &str) {
        let url = self
            .shared
            .connection
            .update_endpoint(&self.shared.transport, |e| {
                e.application = application.to_string()
            });
        debug!(%url, "Application changed");
    }

    /// Returns the URL scheme.
    pub fn protocol(&self) -> String {
        self.shared.connection.endpoint().protocol
    }

    /// Returns the domain.
    pub fn domain(&self) -> String {
        self.shared.connection.endpoint().domain
    }

    /// Returns the application name.
    pub fn application(&self) -> String {
        self.shared.connection.endpoint().application
    }

    /// Returns a copy of the current endpoint.
    pub fn endpoint(&self) -> Endpoint {
        self.shared.connection.endpoint()
    }

    /// Returns the JSON-RPC endpoint URL.
    pub fn url(&self) -> String {
        self.shared.connection.url()
    }

    /// Returns the message stream URL the next pull would request.
    pub fn msg_stream_url(&self, mode: PollingMode) -> MageResult<String> {
        let pending = self.shared.confirmations.snapshot();
        self.shared.connection.msg_stream_url(mode, &pending)
    }

    /// Stores a session key and sends it with every subsequent call.
    ///
    /// Switching to a different key drops the channel keys awaiting
    /// confirmation; they belong to the previous session.
    pub fn set_session(&self, session_key: &str) {
        let previous = self
            .shared
            .connection
            .set_session(&self.shared.transport, session_key);
        if previous.as_deref() != Some(session_key) {
            self.shared.confirmations.clear();
        }
        debug!("Session key set");
    }

    /// Forgets the session key and the channel keys awaiting confirmation.
    pub fn clear_session(&self) {
        self.shared.connection.clear_session(&self.shared.transport);
        self.shared.confirmations.clear();
        debug!("Session key cleared");
    }

    /// Returns the session key, if one is set.
    pub fn session_key(&self) -> Option<String> {
        self.shared.connection.session_key()
    }

    /// Returns true if a session key is set.
    pub fn has_session(&self) -> bool {
        self.session_key().is_some()
    }

    /// Returns the channel keys awaiting confirmation.
    pub fn pending_confirmations(&self) -> Vec<String> {
        self.shared.confirmations.snapshot()
    }

    // === Observers ===

    /// Registers an observer.
    ///
    /// The client only keeps a weak reference; the observer is dropped
    /// from the list once the caller releases its last `Arc`.
    pub fn add_observer<O>(&self, observer: &Arc<O>) -> ObserverId
    where
        O: EventObserver + 'static,
    {
        self.shared.observers.add(observer)
    }

    /// Unregisters an observer. Returns false if it was not registered.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.shared.observers.remove(id)
    }

    /// Returns the number of live observers.
    pub fn observer_count(&self) -> usize {
        self.shared.observers.len()
    }

    /// Broadcasts an event to every observer, as if the server sent it.
    pub fn receive_event(&self, name: &str, data: Option<Value>) {
        self.shared.observers.broadcast(&Event::new(name, data));
    }
}
