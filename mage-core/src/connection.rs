// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Connection State
//!
//! Endpoint (protocol, domain, application) and session key of a client.
//!
//! The two live behind separate locks: changing the domain never waits on
//! a session update, and neither waits on the poller's confirmation
//! bookkeeping. Every endpoint change is pushed into the transport before
//! the setter returns.

use parking_lot::Mutex;
use url::form_urlencoded::byte_serialize;

use crate::config::ClientConfig;
use crate::error::{MageError, MageResult};
use crate::msgstream::PollingMode;
use crate::transport::{Transport, SESSION_HEADER};

/// Where the MAGE application lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// URL scheme.
    pub protocol: String,
    /// Host, optionally with port.
    pub domain: String,
    /// Application name.
    pub application: String,
}

impl Endpoint {
    /// Returns `protocol://domain/application/jsonrpc`.
    pub fn rpc_url(&self) -> String {
        format!(
            "{}://{}/{}/jsonrpc",
            self.protocol, self.domain, self.application
        )
    }

    /// Returns `protocol://domain/msgstream`.
    pub fn msg_stream_base(&self) -> String {
        format!("{}://{}/msgstream", self.protocol, self.domain)
    }
}

/// Endpoint and session state shared by calls and the poller.
pub struct Connection {
    endpoint: Mutex<Endpoint>,
    session_key: Mutex<Option<String>>,
}

impl Connection {
    /// Creates the connection state from a configuration.
    ///
    /// The initial session key, if any, is installed by the client so the
    /// transport header is set as well.
    pub fn new(config: &ClientConfig) -> Self {
        Connection {
            endpoint: Mutex::new(Endpoint {
                protocol: config.protocol.clone(),
                domain: config.domain.clone(),
                application: config.application.clone(),
            }),
            session_key: Mutex::new(None),
        }
    }

    /// Returns a copy of the current endpoint.
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint.lock().clone()
    }

    /// Returns the JSON-RPC endpoint URL.
    pub fn url(&self) -> String {
        self.endpoint.lock().rpc_url()
    }

    /// Applies a change to the endpoint and pushes the new URL into the transport.
    ///
    /// The lock is kept while the transport is updated so concurrent
    /// setters reach the transport in the same order they changed the state.
    pub fn update_endpoint<T, F>(&self, transport: &T, apply: F) -> String
    where
        T: Transport + ?Sized,
        F: FnOnce(&mut Endpoint),
    {
        let mut endpoint = self.endpoint.lock();
        apply(&mut endpoint);
        let url = endpoint.rpc_url();
        transport.set_url(&url);
        url
    }

    /// Stores the session key and installs the session header.
    ///
    /// Returns the previous key.
    pub fn set_session<T>(&self, transport: &T, session_key: &str) -> Option<String>
    where
        T: Transport + ?Sized,
    {
        let mut current = self.session_key.lock();
        transport.set_header(SESSION_HEADER, session_key);
        current.replace(session_key.to_string())
    }

    /// Forgets the session key and removes the session header.
    ///
    /// Safe to call when no session is set. Returns the previous key.
    pub fn clear_session<T>(&self, transport: &T) -> Option<String>
    where
        T: Transport + ?Sized,
    {
        let mut current = self.session_key.lock();
        transport.remove_header(SESSION_HEADER);
        current.take()
    }

    /// Returns the session key, if a non-empty one is set.
    pub fn session_key(&self) -> Option<String> {
        self.session_key
            .lock()
            .as_ref()
            .filter(|key| !key.is_empty())
            .cloned()
    }

    /// Builds the message stream URL.
    ///
    /// `confirm_ids` are the channel keys delivered by the previous poll;
    /// sending them acknowledges those batches.
    pub fn msg_stream_url(&self, mode: PollingMode, confirm_ids: &[String]) -> MageResult<String> {
        let base = self.endpoint.lock().msg_stream_base();
        let session_key = self
            .session_key()
            .ok_or_else(|| MageError::client("No session key registered."))?;

        let mut url = format!(
            "{}?transport={}&sessionKey={}",
            base,
            mode.as_str(),
            encode(&session_key)
        );

        if !confirm_ids.is_empty() {
            let ids: Vec<String> = confirm_ids.iter().map(|id| encode(id)).collect();
            url.push_str("&confirmIds=");
            url.push_str(&ids.join(","));
        }

        Ok(url)
    }
}

fn encode(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}
