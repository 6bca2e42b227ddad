// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Message Stream
//!
//! Decoding of `/msgstream` responses and bookkeeping of the channel keys
//! that still have to be confirmed.
//!
//! A response body is empty (nothing pending), the heartbeat marker `HB`,
//! or a JSON object mapping channel keys to arrays of event entries:
//!
//! ```text
//! {"batch1": [["evt"], ["greet", {"who": "bob"}]]}
//! ```
//!
//! A batch is confirmed by listing its channel key in the `confirmIds`
//! parameter of the *next* request, so delivery and acknowledgment are
//! always separated by one round trip.

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MageError, MageResult};
use crate::events::{Event, MalformedEvent};

/// Body sent by the server as a liveness signal.
pub const HEARTBEAT: &str = "HB";

/// Message stream transport mode.
///
/// Serializes to the same value as the `transport` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollingMode {
    /// Wait a fixed interval between requests.
    ShortPolling,
    /// Request again immediately; the server holds the request open.
    #[default]
    LongPolling,
}

impl PollingMode {
    /// Returns the value of the `transport` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            PollingMode::ShortPolling => "shortpolling",
            PollingMode::LongPolling => "longpolling",
        }
    }
}

impl fmt::Display for PollingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events received for one channel key.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelBatch {
    /// Channel key to confirm on the next request.
    pub channel: String,
    /// Decoded entries, in server order.
    pub events: Vec<Result<Event, MalformedEvent>>,
}

/// Decoded message stream response.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamBody {
    /// Nothing pending.
    Empty,
    /// Server heartbeat.
    Heartbeat,
    /// Pending batches.
    Messages(Vec<ChannelBatch>),
}

/// Decodes a message stream response body.
pub fn parse_stream_body(body: &str) -> MageResult<StreamBody> {
    if body.is_empty() {
        return Ok(StreamBody::Empty);
    }
    if body == HEARTBEAT {
        return Ok(StreamBody::Heartbeat);
    }

    let parsed: Value = serde_json::from_str(body).map_err(|_| {
        MageError::client("Unable to parse the received content from the message stream.")
    })?;
    let Value::Object(channels) = parsed else {
        return Err(MageError::client(
            "Unable to parse the received content from the message stream.",
        ));
    };

    let batches = channels
        .into_iter()
        .map(|(channel, entries)| {
            let events = match entries.as_array() {
                Some(entries) => entries.iter().map(Event::from_entry).collect(),
                None => vec![Err(MalformedEvent::NotAnArray)],
            };
            ChannelBatch { channel, events }
        })
        .collect();

    Ok(StreamBody::Messages(batches))
}

/// Channel keys delivered but not yet confirmed.
#[derive(Debug, Default)]
pub struct PendingConfirmations {
    ids: Mutex<Vec<String>>,
}

impl PendingConfirmations {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pending keys in delivery order.
    pub fn snapshot(&self) -> Vec<String> {
        self.ids.lock().clone()
    }

    /// Records a delivered channel key.
    pub fn push(&self, channel: String) {
        self.ids.lock().push(channel);
    }

    /// Drops the keys that were sent with a request the server answered.
    ///
    /// Keys recorded after `sent` was taken stay pending.
    pub fn acknowledge(&self, sent: &[String]) {
        if sent.is_empty() {
            return;
        }
        let mut ids = self.ids.lock();
        if ids.starts_with(sent) {
            ids.drain(..sent.len());
        } else {
            ids.retain(|id| !sent.contains(id));
        }
    }

    /// Drops every pending key.
    pub fn clear(&self) {
        self.ids.lock().clear();
    }

    /// Returns the number of pending keys.
    pub fn len(&self) -> usize {
        self.ids.lock().len()
    }

    /// Returns true if nothing awaits confirmation.
    pub fn is_empty(&self) -> bool {
        self.ids.lock().is_empty()
    }
}
