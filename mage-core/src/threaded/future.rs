// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Call Futures

use std::panic;
use std::thread::{self, JoinHandle};

use crate::error::{MageError, MageResult};

/// Result of a call that runs now on its own thread, or later on the
/// thread that waits for it.
#[must_use = "a deferred call does nothing until `wait` is called"]
pub struct CallFuture<T> {
    inner: Inner<T>,
}

enum Inner<T> {
    Deferred(Box<dyn FnOnce() -> T + Send>),
    Eager(JoinHandle<T>),
}

impl<T: Send + 'static> CallFuture<T> {
    /// Starts `body` on a new thread.
    pub(crate) fn eager<F>(body: F) -> MageResult<Self>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name("mage-call".to_string())
            .spawn(body)
            .map_err(|e| MageError::client(format!("Unable to start a call thread: {}", e)))?;

        Ok(CallFuture {
            inner: Inner::Eager(handle),
        })
    }

    /// Keeps `body` until the future is waited on.
    pub(crate) fn deferred<F>(body: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        CallFuture {
            inner: Inner::Deferred(Box::new(body)),
        }
    }
}

impl<T> CallFuture<T> {
    /// Blocks until the value is available.
    ///
    /// A deferred call runs on the current thread. A panic raised by an
    /// eager call is propagated here.
    pub fn wait(self) -> T {
        match self.inner {
            Inner::Deferred(body) => body(),
            Inner::Eager(handle) => match handle.join() {
                Ok(value) => value,
                Err(payload) => panic::resume_unwind(payload),
            },
        }
    }

    /// Returns true if the call only runs once waited on.
    pub fn is_deferred(&self) -> bool {
        matches!(self.inner, Inner::Deferred(_))
    }

    /// Returns true if an eager call has completed.
    pub fn is_finished(&self) -> bool {
        match &self.inner {
            Inner::Deferred(_) => false,
            Inner::Eager(handle) => handle.is_finished(),
        }
    }
}
