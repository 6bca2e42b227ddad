// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Background Tasks
//!
//! Registry of fire-and-forget calls and their cancellation flags.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{MageError, MageResult};

/// Identifier of a background call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(Uuid);

impl TaskId {
    fn new() -> Self {
        TaskId(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cancellation flag of one task.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct TaskHandle {
    token: CancelToken,
    thread: JoinHandle<()>,
}

/// Outstanding background tasks.
///
/// A task removes itself when its body returns. The registry lock is held
/// while a task is spawned, so that removal always finds the entry.
#[derive(Default)]
pub(crate) struct TaskRegistry {
    tasks: Arc<Mutex<HashMap<TaskId, TaskHandle>>>,
}

impl TaskRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Spawns `body` on a new thread and registers it.
    pub(crate) fn spawn<F>(&self, body: F) -> MageResult<TaskId>
    where
        F: FnOnce(&CancelToken) + Send + 'static,
    {
        let id = TaskId::new();
        let token = CancelToken::default();
        let task_token = token.clone();
        let registry = Arc::clone(&self.tasks);

        let mut tasks = self.tasks.lock();
        let thread = thread::Builder::new()
            .name("mage-task".to_string())
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&task_token)));
                registry.lock().remove(&id);
                if outcome.is_err() {
                    warn!(task = %id, "Background call panicked");
                }
            })
            .map_err(|e| MageError::client(format!("Unable to start a call thread: {}", e)))?;
        tasks.insert(id, TaskHandle { token, thread });
        debug!(task = %id, "Background call spawned");

        Ok(id)
    }

    /// Waits for a task. No-op for unknown, finished or cancelled tasks.
    pub(crate) fn join(&self, id: TaskId) {
        let handle = self.tasks.lock().remove(&id);
        if let Some(handle) = handle {
            // A task joining itself from its own callback.
            if handle.thread.thread().id() == thread::current().id() {
                return;
            }
            if handle.thread.join().is_err() {
                warn!(task = %id, "Background call thread panicked");
            }
        }
    }

    /// Cancels a task and forgets it. Returns false if the id is unknown.
    pub(crate) fn cancel(&self, id: TaskId) -> bool {
        match self.tasks.lock().remove(&id) {
            Some(handle) => {
                handle.token.cancel();
                debug!(task = %id, "Background call cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancels every outstanding task. Returns how many were cancelled.
    pub(crate) fn cancel_all(&self) -> usize {
        let drained: Vec<TaskHandle> = self.tasks.lock().drain().map(|(_, h)| h).collect();
        for handle in &drained {
            handle.token.cancel();
        }
        drained.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.lock().len()
    }
}
