//! # Deferred: the eventual result of an operation
//!
//! A [`Deferred`] is a cheap handle (`Rc`) to shared settlement state. Clones
//! observe the same state; identity is pointer identity.
//!
//! Construction runs the executor synchronously, but whatever the executor's
//! capabilities decide only lands on a later turn of the scheduler, so
//! reactions attached right after construction are never missed.

use crate::resolution::{Entry, Rejecter, Resolver, Seal};
use crate::scheduler::SchedulerHandle;
use crate::state::{Core, Reaction, State};
use crate::{Payload, Reason};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Diagnostic identifier, unique per process. Has no effect on behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeferredId(u64);

impl DeferredId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeferredId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deferred#{}", self.0)
    }
}

struct Shared<T, E> {
    id: DeferredId,
    scheduler: SchedulerHandle,
    core: RefCell<Core<T, E>>,
}

/// A value that will eventually be fulfilled with `T` or rejected with `E`.
pub struct Deferred<T, E> {
    shared: Rc<Shared<T, E>>,
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T, E> Deferred<T, E> {
    pub fn id(&self) -> DeferredId {
        self.shared.id
    }

    /// The scheduler reactions of this value (and values chained from it) run on.
    pub fn scheduler(&self) -> &SchedulerHandle {
        &self.shared.scheduler
    }

    /// Reference identity: true only for clones of the same deferred value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    pub fn is_pending(&self) -> bool {
        self.shared.core.borrow().state().is_pending()
    }
}

impl<T: Payload, E: Reason> Deferred<T, E> {
    pub(crate) fn pending(scheduler: &SchedulerHandle) -> Self {
        let id = DeferredId::next();
        trace!(deferred = %id, "created");
        Self {
            shared: Rc::new(Shared {
                id,
                scheduler: scheduler.clone(),
                core: RefCell::new(Core::new()),
            }),
        }
    }

    /// Create a deferred value driven by `executor`.
    ///
    /// The executor runs immediately with the resolve and reject
    /// capabilities. Only the first capability call counts, and its effect
    /// is applied on a later turn.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let answer = Deferred::<u32, AppError>::new(&scheduler, |resolve, _reject| {
    ///     resolve.fulfill(42);
    /// });
    /// ```
    pub fn new<F>(scheduler: &SchedulerHandle, executor: F) -> Self
    where
        F: FnOnce(Resolver<T, E>, Rejecter<T, E>),
    {
        Self::try_new(scheduler, |resolve, reject| {
            executor(resolve, reject);
            Ok(())
        })
    }

    /// Like [`Deferred::new`], but an `Err` from the executor rejects the
    /// value, unless a capability already fired.
    pub fn try_new<F>(scheduler: &SchedulerHandle, executor: F) -> Self
    where
        F: FnOnce(Resolver<T, E>, Rejecter<T, E>) -> Result<(), E>,
    {
        let (deferred, resolve, reject) = Self::channel(scheduler);
        if let Err(reason) = executor(resolve, reject.clone()) {
            debug!(deferred = %deferred.id(), "executor failed");
            reject.reject(reason);
        }
        deferred
    }

    /// Create a pending value together with its capabilities, for producers
    /// that settle it outside of an executor.
    pub fn channel(scheduler: &SchedulerHandle) -> (Self, Resolver<T, E>, Rejecter<T, E>) {
        let deferred = Self::pending(scheduler);
        let seal = Seal::default();
        let resolve = Resolver::new(deferred.clone(), seal.clone(), Entry::Scheduled);
        let reject = Rejecter::new(deferred.clone(), seal, Entry::Scheduled);
        (deferred, resolve, reject)
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> State<T, E> {
        self.shared.core.borrow().state().clone()
    }

    pub(crate) fn settle_fulfilled(&self, value: T) {
        let reactions = self.shared.core.borrow_mut().fulfil(value.clone());
        let Some(reactions) = reactions else {
            trace!(deferred = %self.id(), "already settled; fulfilment ignored");
            return;
        };
        debug!(deferred = %self.id(), reactions = reactions.len(), "fulfilled");
        for reaction in reactions {
            reaction(value.clone());
        }
    }

    pub(crate) fn settle_rejected(&self, reason: E) {
        let reactions = self.shared.core.borrow_mut().reject(reason.clone());
        let Some(reactions) = reactions else {
            trace!(deferred = %self.id(), "already settled; rejection ignored");
            return;
        };
        debug!(deferred = %self.id(), reactions = reactions.len(), "rejected");
        for reaction in reactions {
            reaction(reason.clone());
        }
    }

    /// Queue a reaction pair, or run the matching one right away if settled.
    ///
    /// Reactions run synchronously from here; callers that invoke user code
    /// wrap it in a scheduled task first.
    pub(crate) fn subscribe(&self, on_fulfilled: Reaction<T>, on_rejected: Reaction<E>) {
        let settled = self.shared.core.borrow().settled();
        match settled {
            None => self
                .shared
                .core
                .borrow_mut()
                .enqueue(on_fulfilled, on_rejected),
            Some(Ok(value)) => on_fulfilled(value),
            Some(Err(reason)) => on_rejected(reason),
        }
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("id", &self.id())
            .field("state", &self.shared.core.borrow().state().label())
            .finish()
    }
}
