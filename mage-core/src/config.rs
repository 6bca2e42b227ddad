// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Client Configuration
//!
//! Connection target and timing knobs for [`RpcClient`](crate::RpcClient).

use std::time::Duration;

use crate::error::{MageError, MageResult};

/// Default MAGE domain (host and port).
pub const DEFAULT_DOMAIN: &str = "localhost:8080";

/// Default URL scheme.
pub const DEFAULT_PROTOCOL: &str = "http";

/// Default wait between two short polling requests.
pub const DEFAULT_SHORT_POLLING_INTERVAL: Duration = Duration::from_secs(5);

/// Configuration for an RPC client.
///
/// # Example
///
/// ```ignore
/// use mage_core::ClientConfig;
///
/// let config = ClientConfig::new("game")
///     .with_domain("mage.example.com")
///     .with_protocol("https");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// MAGE application name.
    pub application: String,
    /// Domain (host, optionally with port).
    pub domain: String,
    /// URL scheme, `http` or `https`.
    pub protocol: String,
    /// Session key to install on creation.
    pub session_key: Option<String>,
    /// Timeout for a JSON-RPC round trip.
    pub request_timeout: Duration,
    /// Timeout for a message stream request (the server holds long polls open).
    pub long_polling_timeout: Duration,
    /// Wait between two short polling requests.
    pub short_polling_interval: Duration,
    /// Minimum wait before polling again after a failed poll cycle.
    pub poll_retry_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            application: String::new(),
            domain: DEFAULT_DOMAIN.to_string(),
            protocol: DEFAULT_PROTOCOL.to_string(),
            session_key: None,
            request_timeout: Duration::from_secs(30),
            long_polling_timeout: Duration::from_secs(60),
            short_polling_interval: DEFAULT_SHORT_POLLING_INTERVAL,
            poll_retry_delay: Duration::from_secs(1),
        }
    }
}

impl ClientConfig {
    /// Creates a config for the given application with default domain and protocol.
    pub fn new(application: &str) -> Self {
        ClientConfig {
            application: application.to_string(),
            ..Default::default()
        }
    }

    /// Reads the configuration from `MAGE_*` environment variables.
    ///
    /// See [`ClientConfig::from_lookup`] for the variable names.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from a variable lookup.
    ///
    /// Recognised keys: `MAGE_APPLICATION`, `MAGE_DOMAIN`, `MAGE_PROTOCOL`,
    /// `MAGE_SESSION_KEY`. Missing or empty values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let defaults = ClientConfig::default();

        ClientConfig {
            application: get("MAGE_APPLICATION").unwrap_or(defaults.application),
            domain: get("MAGE_DOMAIN").unwrap_or(defaults.domain),
            protocol: get("MAGE_PROTOCOL").unwrap_or(defaults.protocol),
            session_key: get("MAGE_SESSION_KEY"),
            ..defaults
        }
    }

    /// Sets the application name.
    pub fn with_application(mut self, application: &str) -> Self {
        self.application = application.to_string();
        self
    }

    /// Sets the domain.
    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domain = domain.to_string();
        self
    }

    /// Sets the URL scheme.
    pub fn with_protocol(mut self, protocol: &str) -> Self {
        self.protocol = protocol.to_string();
        self
    }

    /// Sets an initial session key.
    pub fn with_session_key(mut self, session_key: &str) -> Self {
        self.session_key = Some(session_key.to_string());
        self
    }

    /// Sets the JSON-RPC request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the message stream request timeout.
    pub fn with_long_polling_timeout(mut self, timeout: Duration) -> Self {
        self.long_polling_timeout = timeout;
        self
    }

    /// Sets the short polling interval.
    pub fn with_short_polling_interval(mut self, interval: Duration) -> Self {
        self.short_polling_interval = interval;
        self
    }

    /// Sets the delay applied after a failed poll cycle.
    pub fn with_poll_retry_delay(mut self, delay: Duration) -> Self {
        self.poll_retry_delay = delay;
        self
    }

    /// Returns the JSON-RPC endpoint URL for this configuration.
    pub fn rpc_url(&self) -> String {
        format!(
            "{}://{}/{}/jsonrpc",
            self.protocol, self.domain, self.application
        )
    }

    /// Checks that the endpoint fields are usable.
    pub fn validate(&self) -> MageResult<()> {
        if self.protocol.is_empty() {
            return Err(MageError::client("Protocol must not be empty"));
        }
        if self.domain.is_empty() {
            return Err(MageError::client("Domain must not be empty"));
        }
        if self.application.is_empty() {
            return Err(MageError::client("Application must not be empty"));
        }
        Ok(())
    }
}
