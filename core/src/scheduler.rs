//! Scheduler - the Deferral Seam
//!
//! Deferred values never call user code within the extent of the call that
//! triggered it. Instead they hand a zero-argument task to a [`Scheduler`],
//! which runs it on a later turn.
//!
//! This crate ships no scheduler of its own. `pledge-runtime` provides a
//! manually pumped `TaskQueue` and a tokio `LocalScheduler`.

use std::fmt;
use std::rc::Rc;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + 'static>;

/// Runs tasks on a later turn of a single-threaded loop.
///
/// Implementations must preserve submission order for tasks scheduled
/// without delay, and must never run a task synchronously inside
/// [`Scheduler::schedule`].
pub trait Scheduler {
    fn schedule(&self, task: Task);
}

/// Cloneable, type-erased handle to the scheduler a deferred value uses.
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Rc<dyn Scheduler>,
}

impl SchedulerHandle {
    pub fn new<S: Scheduler + 'static>(scheduler: S) -> Self {
        Self {
            inner: Rc::new(scheduler),
        }
    }

    /// Schedule a closure without boxing it at the call site.
    pub fn defer(&self, task: impl FnOnce() + 'static) {
        tracing::trace!("deferring task to a later turn");
        self.inner.schedule(Box::new(task));
    }

    /// Check whether two handles point at the same scheduler instance.
    pub fn same_as(&self, other: &SchedulerHandle) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<Rc<dyn Scheduler>> for SchedulerHandle {
    fn from(inner: Rc<dyn Scheduler>) -> Self {
        Self { inner }
    }
}

impl fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::ManualQueue;
    use std::cell::RefCell;

    #[test]
    fn test_defer_never_runs_synchronously() {
        let queue = ManualQueue::default();
        let handle = queue.handle();
        let log = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&log);
        handle.defer(move || sink.borrow_mut().push("ran"));
        assert!(log.borrow().is_empty());

        assert_eq!(queue.drain(), 1);
        assert_eq!(*log.borrow(), vec!["ran"]);
    }

    #[test]
    fn test_same_as_compares_instances() {
        let queue = ManualQueue::default();
        let a = queue.handle();
        let b = a.clone();
        let c = ManualQueue::default().handle();

        assert!(a.same_as(&b));
        assert!(!a.same_as(&c));
    }

    #[test]
    fn test_from_shared_scheduler() {
        let queue = ManualQueue::default();
        let shared: Rc<dyn Scheduler> = Rc::new(queue.clone());
        let a = SchedulerHandle::from(Rc::clone(&shared));
        let b: SchedulerHandle = shared.into();
        assert!(a.same_as(&b));

        a.defer(|| {});
        b.defer(|| {});
        assert_eq!(queue.pending(), 2);
        assert_eq!(queue.drain(), 2);
    }
}
