//! Cancellable single-slot timer.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Runs an action after a quiescence window, restarting the window on every
/// new schedule.
///
/// At most one timer is armed at a time. Scheduling cancels the armed timer
/// before arming the new one. Once a timer fires, its action runs as a
/// detached task and is no longer affected by `schedule` or `cancel`.
///
/// Must be used from within a Tokio runtime.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    armed: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            armed: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Arm the timer to run `action` once the window elapses.
    pub fn schedule<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let window = self.window;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            tokio::spawn(action);
        });

        if let Some(previous) = self.slot().replace(timer) {
            previous.abort();
        }
    }

    /// Disarm the timer. Returns whether a timer was still waiting.
    pub fn cancel(&self) -> bool {
        self.slot().take().is_some_and(|timer| {
            let waiting = !timer.is_finished();
            timer.abort();
            waiting
        })
    }

    /// Whether a timer is armed and has not fired yet.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.slot()
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }

    fn slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.armed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
