//! Chaining - `then` and the sugar built on it
//!
//! Each chaining call returns a new *dependent* deferred value. The handler
//! registered for the receiver's outcome runs on a later turn; what it
//! returns goes through the resolution procedure to settle the dependent.
//!
//! Handlers report failure by returning `Err(reason)`, which rejects the
//! dependent. An absent handler passes the state and payload through as-is.

use crate::deferred::Deferred;
use crate::resolution::{self, Resolution};
use crate::scheduler::SchedulerHandle;
use crate::state::Reaction;
use crate::{Payload, Reason};
use std::cell::Cell;
use std::rc::Rc;
use tracing::{debug, trace};

/// A boxed reaction handler: receives the payload `P`, produces an outcome
/// for a `Deferred<U, E>`.
pub type Handler<P, U, E> = Box<dyn FnOnce(P) -> Result<Resolution<U, E>, E>>;

enum Step<P, U, E> {
    Call(Handler<P, U, E>),
    PassThrough(Box<dyn FnOnce(P) -> Result<U, E>>),
}

impl<P: 'static, U: Payload, E: Reason> Step<P, U, E> {
    fn run(self, payload: P, dependent: &Deferred<U, E>) {
        match self {
            Step::PassThrough(forward) => match forward(payload) {
                Ok(value) => dependent.settle_fulfilled(value),
                Err(reason) => dependent.settle_rejected(reason),
            },
            Step::Call(handler) => match handler(payload) {
                Ok(outcome) => resolution::resolve(dependent, outcome),
                Err(reason) => {
                    debug!(deferred = %dependent.id(), "handler failed");
                    dependent.settle_rejected(reason);
                }
            },
        }
    }

    /// Wrap the step so it runs on a later turn once the payload arrives.
    fn into_reaction(self, dependent: Deferred<U, E>) -> Reaction<P> {
        Box::new(move |payload| {
            let scheduler = dependent.scheduler().clone();
            scheduler.defer(move || self.run(payload, &dependent));
        })
    }
}

impl<T: Payload, E: Reason> Deferred<T, E> {
    fn chain<U: Payload>(
        &self,
        on_fulfilled: Step<T, U, E>,
        on_rejected: Step<E, U, E>,
    ) -> Deferred<U, E> {
        let dependent = Deferred::pending(self.scheduler());
        trace!(parent = %self.id(), dependent = %dependent.id(), "chained");
        self.subscribe(
            on_fulfilled.into_reaction(dependent.clone()),
            on_rejected.into_reaction(dependent.clone()),
        );
        dependent
    }

    /// Register a handler for each outcome and get the dependent value.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let label = count.then(
    ///     |n| Ok(Resolution::Value(format!("{n} items"))),
    ///     |_err| Ok(Resolution::Value("unknown".to_string())),
    /// );
    /// ```
    pub fn then<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Deferred<U, E>
    where
        U: Payload,
        F: FnOnce(T) -> Result<Resolution<U, E>, E> + 'static,
        R: FnOnce(E) -> Result<Resolution<U, E>, E> + 'static,
    {
        self.chain(
            Step::Call(Box::new(on_fulfilled)),
            Step::Call(Box::new(on_rejected)),
        )
    }

    /// `then` with optional handlers; `None` passes that outcome through.
    pub fn then_with(
        &self,
        on_fulfilled: Option<Handler<T, T, E>>,
        on_rejected: Option<Handler<E, T, E>>,
    ) -> Deferred<T, E> {
        let on_fulfilled = match on_fulfilled {
            Some(handler) => Step::Call(handler),
            None => Step::PassThrough(Box::new(Ok::<T, E>)),
        };
        let on_rejected = match on_rejected {
            Some(handler) => Step::Call(handler),
            None => Step::PassThrough(Box::new(Err::<T, E>)),
        };
        self.chain(on_fulfilled, on_rejected)
    }

    /// Handle the fulfilment only; a rejection passes through.
    pub fn and_then<U, F>(&self, on_fulfilled: F) -> Deferred<U, E>
    where
        U: Payload,
        F: FnOnce(T) -> Result<Resolution<U, E>, E> + 'static,
    {
        self.chain(
            Step::Call(Box::new(on_fulfilled)),
            Step::PassThrough(Box::new(Err::<U, E>)),
        )
    }

    /// Transform the fulfilment value.
    pub fn map<U, F>(&self, f: F) -> Deferred<U, E>
    where
        U: Payload,
        F: FnOnce(T) -> U + 'static,
    {
        self.and_then(move |value| Ok(Resolution::Value(f(value))))
    }

    /// Handle the rejection only; a fulfilment passes through.
    pub fn catch<R>(&self, on_rejected: R) -> Deferred<T, E>
    where
        R: FnOnce(E) -> Result<Resolution<T, E>, E> + 'static,
    {
        self.chain(
            Step::PassThrough(Box::new(Ok::<T, E>)),
            Step::Call(Box::new(on_rejected)),
        )
    }

    /// Run a side effect once settled, keeping the original outcome.
    ///
    /// An `Err` from `on_finally` replaces the outcome with that rejection.
    pub fn finally<F>(&self, on_finally: F) -> Deferred<T, E>
    where
        F: FnOnce() -> Result<(), E> + 'static,
    {
        self.finally_await(move || on_finally().map(Resolution::Value))
    }

    /// Like [`Deferred::finally`], but waits for the outcome `on_finally`
    /// returns (a deferred value or thenable) before passing the original
    /// outcome on. If that outcome rejects, the dependent rejects with it.
    pub fn finally_await<X, F>(&self, on_finally: F) -> Deferred<T, E>
    where
        X: Payload,
        F: FnOnce() -> Result<Resolution<X, E>, E> + 'static,
    {
        let hook = FinallyHook::new(self.scheduler(), on_finally);
        let on_reason = hook.clone();
        self.then(
            move |value| {
                Ok(match hook.fire::<X, E>()? {
                    Some(gate) => Resolution::Deferred(gate.map(move |_| value)),
                    None => Resolution::Value(value),
                })
            },
            move |reason| match on_reason.fire::<X, E>()? {
                Some(gate) => {
                    let replaced = gate.and_then(move |_: X| Err::<Resolution<T, E>, E>(reason));
                    Ok(Resolution::Deferred(replaced))
                }
                None => Err(reason),
            },
        )
    }
}

/// The `finally` callback, shared by both reaction paths. Only one path ever
/// fires.
struct FinallyHook<F> {
    scheduler: SchedulerHandle,
    callback: Rc<Cell<Option<F>>>,
}

impl<F> Clone for FinallyHook<F> {
    fn clone(&self) -> Self {
        Self {
            scheduler: self.scheduler.clone(),
            callback: Rc::clone(&self.callback),
        }
    }
}

impl<F> FinallyHook<F> {
    fn new(scheduler: &SchedulerHandle, callback: F) -> Self {
        Self {
            scheduler: scheduler.clone(),
            callback: Rc::new(Cell::new(Some(callback))),
        }
    }

    /// Run the callback and wrap its outcome in a deferred value to wait on.
    fn fire<X, E>(&self) -> Result<Option<Deferred<X, E>>, E>
    where
        X: Payload,
        E: Reason,
        F: FnOnce() -> Result<Resolution<X, E>, E>,
    {
        let Some(callback) = self.callback.take() else {
            return Ok(None);
        };
        let outcome = callback()?;
        Ok(Some(Deferred::resolve(&self.scheduler, outcome)))
    }
}
