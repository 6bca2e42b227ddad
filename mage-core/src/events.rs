// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Event System
//!
//! Server events and the observers they are broadcast to.
//!
//! Events reach the client two ways: inline, in the `myEvents` array of a
//! call response, and through the message stream side channel. Both use the
//! same entry shape, a JSON array `[name]` or `[name, data]`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// An event pushed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name, e.g. `session.set`.
    pub name: String,
    /// Optional payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Reasons an event entry could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedEvent {
    /// The inline entry is not a JSON string.
    #[error("event entry is not a string")]
    NotAString,

    /// The inline entry is not valid JSON.
    #[error("event entry is not valid JSON: {0}")]
    InvalidJson(String),

    /// The entry is not a JSON array.
    #[error("event entry is not an array")]
    NotAnArray,

    /// The entry array has the wrong number of elements.
    #[error("event entry has {0} elements, expected 1 or 2")]
    WrongArity(usize),

    /// The first element is not a string.
    #[error("event name is not a string")]
    InvalidName,
}

impl Event {
    /// Creates an event.
    pub fn new(name: &str, data: Option<Value>) -> Self {
        Event {
            name: name.to_string(),
            data,
        }
    }

    /// Decodes an `[name]` or `[name, data]` entry.
    pub fn from_entry(entry: &Value) -> Result<Self, MalformedEvent> {
        let items = entry.as_array().ok_or(MalformedEvent::NotAnArray)?;

        let (name, data) = match items.as_slice() {
            [name] => (name, None),
            [name, data] => (name, Some(data.clone())),
            other => return Err(MalformedEvent::WrongArity(other.len())),
        };

        let name = name.as_str().ok_or(MalformedEvent::InvalidName)?;
        Ok(Event::new(name, data))
    }

    /// Decodes an entry serialized as JSON text, as found in `myEvents`.
    pub fn from_json_str(raw: &str) -> Result<Self, MalformedEvent> {
        let entry: Value =
            serde_json::from_str(raw).map_err(|e| MalformedEvent::InvalidJson(e.to_string()))?;
        Self::from_entry(&entry)
    }

    /// Decodes one element of a `myEvents` array.
    pub fn from_inline(element: &Value) -> Result<Self, MalformedEvent> {
        let raw = element.as_str().ok_or(MalformedEvent::NotAString)?;
        Self::from_json_str(raw)
    }
}

/// Observer trait.
///
/// Implement this trait to receive server events.
pub trait EventObserver: Send + Sync {
    /// Called for every broadcast event.
    fn receive_event(&self, name: &str, data: Option<&Value>);
}

/// Simple callback-based observer.
///
/// Wraps a closure for easy event handling.
pub struct CallbackObserver<F>
where
    F: Fn(&str, Option<&Value>) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackObserver<F>
where
    F: Fn(&str, Option<&Value>) + Send + Sync,
{
    /// Creates a new callback observer.
    pub fn new(callback: F) -> Self {
        CallbackObserver { callback }
    }
}

impl<F> EventObserver for CallbackObserver<F>
where
    F: Fn(&str, Option<&Value>) + Send + Sync,
{
    fn receive_event(&self, name: &str, data: Option<&Value>) {
        (self.callback)(name, data);
    }
}

/// Handle returned when registering an observer, used to remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Registry of observers.
///
/// Holds non-owning references: an observer stays registered only as long
/// as its owner keeps an `Arc` to it. Broadcasts from different threads
/// never interleave. The broadcast lock is reentrant, so an observer may
/// use the client (calls carrying inline events, manual events,
/// registration) from inside [`EventObserver::receive_event`]. Each
/// broadcast delivers to the observers registered when it started.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Mutex<Vec<(ObserverId, Weak<dyn EventObserver>)>>,
    broadcasting: ReentrantMutex<()>,
    next_id: AtomicU64,
}

impl ObserverRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an observer.
    pub fn add<O>(&self, observer: &Arc<O>) -> ObserverId
    where
        O: EventObserver + 'static,
    {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let weak = Arc::downgrade(observer);
        let weak: Weak<dyn EventObserver> = weak;
        self.observers.lock().push((id, weak));
        id
    }

    /// Removes an observer. Returns false if it was not registered.
    pub fn remove(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Returns the number of live observers.
    pub fn len(&self) -> usize {
        self.observers
            .lock()
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }

    /// Returns true if no live observer is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers an event to every live observer, in registration order.
    ///
    /// Returns the number of observers that received it.
    pub fn broadcast(&self, event: &Event) -> usize {
        let _broadcasting = self.broadcasting.lock();

        let snapshot: Vec<Weak<dyn EventObserver>> = {
            let mut observers = self.observers.lock();
            observers.retain(|(_, weak)| weak.strong_count() > 0);
            observers.iter().map(|(_, weak)| weak.clone()).collect()
        };

        let mut delivered = 0;
        for weak in &snapshot {
            if let Some(observer) = weak.upgrade() {
                observer.receive_event(&event.name, event.data.as_ref());
                delivered += 1;
            }
        }
        delivered
    }
}

// INLINE_TEST_REQUIRED: Tests pruning of the private observer list
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropped_observer_is_pruned_on_broadcast() {
        let registry = ObserverRegistry::new();
        let observer = Arc::new(CallbackObserver::new(|_, _| {}));
        registry.add(&observer);
        drop(observer);

        assert_eq!(registry.observers.lock().len(), 1);
        registry.broadcast(&Event::new("ping", None));
        assert!(registry.observers.lock().is_empty());
    }
}
