//! Cancellable scheduled tasks.
//!
//! Every timer-driven effect in the conductor (reveal increments, simulated
//! speech) runs as a [`ScheduledTask`]. The task body performs its side
//! effects through a [`TaskGuard`]; the guard holds a lock while the effect
//! runs and refuses to run it once the task is cancelled. After
//! [`ScheduledTask::cancel`] returns, no further effect can happen, even if
//! the tokio task is still parked on a timer somewhere.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Liveness guard handed to a task body
#[derive(Clone, Debug)]
pub struct TaskGuard {
    live: Arc<Mutex<bool>>,
}

impl TaskGuard {
    fn new(live: bool) -> Self {
        Self {
            live: Arc::new(Mutex::new(live)),
        }
    }

    /// Run `effect` if the task is still live.
    ///
    /// Returns `None` when the task was cancelled or already finished.
    /// `effect` runs under the guard lock and must not block or re-enter
    /// the guard.
    pub fn run<R>(&self, effect: impl FnOnce() -> R) -> Option<R> {
        let live = self.live.lock();
        if *live {
            Some(effect())
        } else {
            None
        }
    }

    /// Run a final `effect` and retire the task in one step.
    pub fn finish<R>(&self, effect: impl FnOnce() -> R) -> Option<R> {
        let mut live = self.live.lock();
        if !*live {
            return None;
        }
        *live = false;
        Some(effect())
    }

    /// Whether the task can still produce effects
    pub fn is_live(&self) -> bool {
        *self.live.lock()
    }

    /// Retire the guard, returning whether it was live
    fn retire(&self) -> bool {
        std::mem::replace(&mut *self.live.lock(), false)
    }
}

/// Handle to a spawned, cancellable task
///
/// Dropping the handle cancels the task.
#[derive(Debug)]
pub struct ScheduledTask {
    guard: TaskGuard,
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    /// Spawn `body` on the current tokio runtime.
    ///
    /// The body must call [`TaskGuard::finish`] on its natural exit so the
    /// handle stops reporting itself active.
    pub fn spawn<F, Fut>(body: F) -> Self
    where
        F: FnOnce(TaskGuard) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let guard = TaskGuard::new(true);
        let handle = tokio::spawn(body(guard.clone()));
        Self {
            guard,
            handle: Some(handle),
        }
    }

    /// A handle for work that already finished synchronously
    #[must_use]
    pub fn completed() -> Self {
        Self {
            guard: TaskGuard::new(false),
            handle: None,
        }
    }

    /// Cancel the task.
    ///
    /// Returns `true` if the task was still live, i.e. this call is what
    /// stopped it. Cancelling twice is a no-op.
    pub fn cancel(&mut self) -> bool {
        let was_live = self.guard.retire();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        was_live
    }

    /// Whether the task can still produce effects
    pub fn is_active(&self) -> bool {
        self.guard.is_live()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
