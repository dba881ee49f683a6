//! Scheduler backed by tokio's `LocalSet`.

use pledge_core::{Scheduler, SchedulerHandle, Task};
use std::time::Duration;
use tracing::trace;

/// Spawns every task onto the current [`tokio::task::LocalSet`].
///
/// Tasks spawned from the same set run in submission order. Using the
/// scheduler outside of a `LocalSet` panics, the same as
/// [`tokio::task::spawn_local`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalScheduler;

impl LocalScheduler {
    pub fn handle() -> SchedulerHandle {
        SchedulerHandle::new(LocalScheduler)
    }

    /// Run `task` on the local set once `delay` has elapsed.
    pub fn schedule_after(&self, delay: Duration, task: impl FnOnce() + 'static) {
        trace!(?delay, "local timer registered");
        tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }
}

impl Scheduler for LocalScheduler {
    fn schedule(&self, task: Task) {
        tokio::task::spawn_local(async move { task() });
    }
}
