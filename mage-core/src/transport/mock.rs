// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Mock Transport
//!
//! Scripted transport for tests and offline development.

use std::collections::{BTreeMap, VecDeque};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};

use super::{Transport, TransportError, TransportResult};

/// A JSON-RPC call seen by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Endpoint URL at the time of the call.
    pub url: String,
    /// Method name.
    pub method: String,
    /// Request parameters.
    pub params: Value,
    /// Default headers at the time of the call.
    pub headers: BTreeMap<String, String>,
}

#[derive(Default)]
struct MockState {
    url: String,
    headers: BTreeMap<String, String>,
    call_responses: VecDeque<TransportResult<Value>>,
    get_responses: VecDeque<TransportResult<String>>,
    calls: Vec<RecordedCall>,
    get_requests: Vec<String>,
    call_delay: Option<Duration>,
}

/// Mock transport.
///
/// Responses are consumed in FIFO order. When the call queue is empty a
/// call answers `{}`; when the GET queue is empty a GET answers with an
/// empty body (nothing to deliver).
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    /// Creates an empty mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful JSON-RPC result.
    pub fn queue_response(&self, response: Value) {
        self.state.lock().call_responses.push_back(Ok(response));
    }

    /// Queues a transport fault for the next JSON-RPC call.
    pub fn queue_error(&self, error: TransportError) {
        self.state.lock().call_responses.push_back(Err(error));
    }

    /// Queues a message stream body.
    pub fn queue_get_body(&self, body: &str) {
        self.state
            .lock()
            .get_responses
            .push_back(Ok(body.to_string()));
    }

    /// Queues a message stream fault.
    pub fn queue_get_error(&self, error: TransportError) {
        self.state.lock().get_responses.push_back(Err(error));
    }

    /// Makes every JSON-RPC call sleep before answering.
    pub fn set_call_delay(&self, delay: Duration) {
        self.state.lock().call_delay = Some(delay);
    }

    /// Returns every JSON-RPC call performed so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Returns the number of JSON-RPC calls performed so far.
    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Returns every URL requested through [`Transport::get`].
    pub fn get_requests(&self) -> Vec<String> {
        self.state.lock().get_requests.clone()
    }

    /// Returns the current value of a default header.
    pub fn header(&self, name: &str) -> Option<String> {
        self.state.lock().headers.get(name).cloned()
    }
}

impl Transport for MockTransport {
    fn set_url(&self, url: &str) {
        self.state.lock().url = url.to_string();
    }

    fn url(&self) -> String {
        self.state.lock().url.clone()
    }

    fn set_header(&self, name: &str, value: &str) {
        self.state
            .lock()
            .headers
            .insert(name.to_string(), value.to_string());
    }

    fn remove_header(&self, name: &str) {
        self.state.lock().headers.remove(name);
    }

    fn call(&self, method: &str, params: &Value) -> TransportResult<Value> {
        let delay = {
            let mut state = self.state.lock();
            let record = RecordedCall {
                url: state.url.clone(),
                method: method.to_string(),
                params: params.clone(),
                headers: state.headers.clone(),
            };
            state.calls.push(record);
            state.call_delay
        };

        // Sleep outside the lock so concurrent calls overlap.
        if let Some(delay) = delay {
            thread::sleep(delay);
        }

        self.state
            .lock()
            .call_responses
            .pop_front()
            .unwrap_or_else(|| Ok(json!({})))
    }

    fn get(&self, url: &str) -> TransportResult<String> {
        let mut state = self.state.lock();
        state.get_requests.push(url.to_string());
        state
            .get_responses
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}
