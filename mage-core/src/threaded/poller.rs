// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Event Poller
//!
//! Background thread that pulls the message stream until stopped.
//!
//! Each cycle waits on a condition variable, so a stop request wakes the
//! thread immediately instead of letting it sleep out the interval. A
//! request already in flight is not interrupted; stopping during a long
//! poll returns once that request completes or times out.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::client::Shared;
use crate::config::ClientConfig;
use crate::error::{MageError, MageResult};
use crate::msgstream::PollingMode;
use crate::transport::Transport;

/// Timing of the poll loop.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PollerSettings {
    pub(crate) short_polling_interval: Duration,
    pub(crate) poll_retry_delay: Duration,
}

impl PollerSettings {
    pub(crate) fn from_config(config: &ClientConfig) -> Self {
        PollerSettings {
            short_polling_interval: config.short_polling_interval,
            poll_retry_delay: config.poll_retry_delay,
        }
    }

    fn interval(&self, mode: PollingMode) -> Duration {
        match mode {
            PollingMode::ShortPolling => self.short_polling_interval,
            PollingMode::LongPolling => Duration::ZERO,
        }
    }

    fn retry_interval(&self, mode: PollingMode) -> Duration {
        self.interval(mode).max(self.poll_retry_delay)
    }
}

#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

impl StopSignal {
    fn stop(&self) {
        *self.stopped.lock() = true;
        self.condvar.notify_all();
    }

    /// Waits up to `timeout`. Returns true if a stop was requested.
    fn wait(&self, timeout: Duration) -> bool {
        let mut stopped = self.stopped.lock();
        if !*stopped && !timeout.is_zero() {
            self.condvar
                .wait_while_for(&mut stopped, |stopped| !*stopped, timeout);
        }
        *stopped
    }
}

/// A running poll loop.
pub(crate) struct Poller {
    signal: Arc<StopSignal>,
    thread: Option<JoinHandle<()>>,
}

impl Poller {
    /// Spawns the poll loop.
    pub(crate) fn start<T>(
        shared: Arc<Shared<T>>,
        mode: PollingMode,
        settings: PollerSettings,
    ) -> MageResult<Self>
    where
        T: Transport + 'static,
    {
        let signal = Arc::new(StopSignal::default());
        let loop_signal = Arc::clone(&signal);

        let thread = thread::Builder::new()
            .name("mage-poller".to_string())
            .spawn(move || run(&shared, &loop_signal, mode, settings))
            .map_err(|e| MageError::client(format!("Unable to start the polling thread: {}", e)))?;

        Ok(Poller {
            signal,
            thread: Some(thread),
        })
    }

    pub(crate) fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }

    /// Signals the loop and waits for it to exit.
    ///
    /// Called from the poller thread itself (an observer stopping the
    /// poller), the loop is only signalled.
    pub(crate) fn stop(&mut self) {
        self.signal.stop();
        if let Some(thread) = self.thread.take() {
            if thread.thread().id() == thread::current().id() {
                return;
            }
            if thread.join().is_err() {
                warn!("Polling thread panicked");
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<T: Transport>(
    shared: &Shared<T>,
    signal: &StopSignal,
    mode: PollingMode,
    settings: PollerSettings,
) {
    let mut wait = settings.interval(mode);

    while !signal.wait(wait) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| shared.pull_events(mode)));

        wait = match outcome {
            Ok(Ok(delivered)) => {
                if delivered > 0 {
                    debug!(delivered, "Poll cycle delivered events");
                }
                settings.interval(mode)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Poll cycle failed");
                settings.retry_interval(mode)
            }
            Err(_) => {
                warn!("Event observer panicked during a poll cycle");
                settings.retry_interval(mode)
            }
        };
    }

    debug!("Polling thread exiting");
}

// INLINE_TEST_REQUIRED: Tests the private stop signal and interval selection
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_stop_wakes_waiter() {
        let signal = Arc::new(StopSignal::default());
        let waiter = Arc::clone(&signal);

        let started = Instant::now();
        let handle = thread::spawn(move || waiter.wait(Duration::from_secs(30)));
        thread::sleep(Duration::from_millis(20));
        signal.stop();

        assert!(handle.join().unwrap());
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_wait_times_out_without_stop() {
        let signal = StopSignal::default();
        assert!(!signal.wait(Duration::from_millis(10)));
        assert!(!signal.wait(Duration::ZERO));
    }

    #[test]
    fn test_retry_interval_is_at_least_retry_delay() {
        let settings = PollerSettings {
            short_polling_interval: Duration::from_secs(5),
            poll_retry_delay: Duration::from_secs(1),
        };

        assert_eq!(settings.interval(PollingMode::LongPolling), Duration::ZERO);
        assert_eq!(
            settings.retry_interval(PollingMode::LongPolling),
            Duration::from_secs(1)
        );
        assert_eq!(
            settings.retry_interval(PollingMode::ShortPolling),
            Duration::from_secs(5)
        );
    }
}
