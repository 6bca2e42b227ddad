// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Background Engine
//!
//! Futures, fire-and-forget calls and the event poller.
//!
//! # Architecture
//!
//! - **CallFuture**: eager (own thread) or deferred (runs on `wait`)
//! - **TaskRegistry**: fire-and-forget calls, each with its own cancel flag
//! - **Poller**: one message stream thread per client
//!
//! Cancelling a call only suppresses the delivery of its result. The
//! request itself may already have reached the server.

mod future;
mod poller;
mod tasks;

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info};

pub use future::CallFuture;
pub use tasks::{CancelToken, TaskId};

use crate::client::RpcClient;
use crate::config::ClientConfig;
use crate::error::{MageError, MageResult};
use crate::msgstream::PollingMode;
use crate::transport::Transport;
use poller::{Poller, PollerSettings};
use tasks::TaskRegistry;

/// Background state owned by a client.
pub(crate) struct ThreadedState {
    tasks: TaskRegistry,
    poller: Mutex<Option<Poller>>,
    settings: PollerSettings,
}

impl ThreadedState {
    pub(crate) fn new(config: &ClientConfig) -> Self {
        ThreadedState {
            tasks: TaskRegistry::new(),
            poller: Mutex::new(None),
            settings: PollerSettings::from_config(config),
        }
    }

    fn stop_poller(&self) -> bool {
        // Taken out under the lock, stopped outside it: the poller thread
        // may be the caller.
        let poller = self.poller.lock().take();
        match poller {
            Some(mut poller) => {
                poller.stop();
                true
            }
            None => false,
        }
    }
}

impl<T: Transport + 'static> RpcClient<T> {
    // === Futures ===

    /// Calls a user command and returns a future of its response.
    ///
    /// With `run_eagerly` the call starts now on its own thread; otherwise
    /// it runs on the thread that calls [`CallFuture::wait`]. Fails with
    /// [`MageError::Client`] if the thread cannot be started.
    pub fn call_future(
        &self,
        method: &str,
        params: Value,
        run_eagerly: bool,
    ) -> MageResult<CallFuture<MageResult<Value>>> {
        let shared = Arc::clone(&self.shared);
        let method = method.to_string();
        let body = move || shared.call(&method, &params);

        if run_eagerly {
            CallFuture::eager(body)
        } else {
            Ok(CallFuture::deferred(body))
        }
    }

    /// Calls a user command and hands the outcome to `callback`.
    ///
    /// The returned future resolves once the callback has returned.
    pub fn call_with_callback<F>(
        &self,
        method: &str,
        params: Value,
        callback: F,
        run_eagerly: bool,
    ) -> MageResult<CallFuture<()>>
    where
        F: FnOnce(MageResult<Value>) + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        let method = method.to_string();
        let body = move || callback(shared.call(&method, &params));

        if run_eagerly {
            CallFuture::eager(body)
        } else {
            Ok(CallFuture::deferred(body))
        }
    }

    // === Fire-and-forget ===

    /// Calls a user command on a background thread.
    ///
    /// The callback is skipped if the task is cancelled before it runs.
    pub fn spawn_call<F>(&self, method: &str, params: Value, callback: F) -> MageResult<TaskId>
    where
        F: FnOnce(MageResult<Value>) + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        let method = method.to_string();

        self.threaded.tasks.spawn(move |token| {
            if token.is_cancelled() {
                return;
            }
            let result = shared.call(&method, &params);
            if token.is_cancelled() {
                debug!(method = %method, "Dropping result of a cancelled call");
                return;
            }
            callback(result);
        })
    }

    /// Waits for a background call. No-op if it is unknown, finished or cancelled.
    pub fn join(&self, task: TaskId) {
        self.threaded.tasks.join(task);
    }

    /// Cancels a background call. Returns false if the id is unknown.
    pub fn cancel(&self, task: TaskId) -> bool {
        self.threaded.tasks.cancel(task)
    }

    /// Cancels every outstanding background call.
    pub fn cancel_all(&self) {
        let cancelled = self.threaded.tasks.cancel_all();
        if cancelled > 0 {
            debug!(cancelled, "Cancelled background calls");
        }
    }

    /// Returns the number of outstanding background calls.
    pub fn pending_tasks(&self) -> usize {
        self.threaded.tasks.len()
    }

    // === Polling ===

    /// Starts the event poller.
    ///
    /// Requires a session key. Only one poller runs per client.
    pub fn start_polling(&self, mode: PollingMode) -> MageResult<()> {
        let mut poller = self.threaded.poller.lock();

        if poller.as_ref().is_some_and(Poller::is_running) {
            return Err(MageError::client("A polling thread is already running."));
        }
        if !self.has_session() {
            return Err(MageError::client("No session key registered."));
        }

        *poller = Some(Poller::start(
            Arc::clone(&self.shared),
            mode,
            self.threaded.settings,
        )?);
        info!(%mode, "Event poller started");
        Ok(())
    }

    /// Stops the event poller. No-op if it is not running.
    pub fn stop_polling(&self) {
        if self.threaded.stop_poller() {
            info!("Event poller stopped");
        }
    }

    /// Returns true while the poller runs.
    pub fn is_polling(&self) -> bool {
        self.threaded
            .poller
            .lock()
            .as_ref()
            .is_some_and(Poller::is_running)
    }
}

impl<T: Transport> Drop for RpcClient<T> {
    fn drop(&mut self) {
        self.threaded.stop_poller();
        self.threaded.tasks.cancel_all();
    }
}
