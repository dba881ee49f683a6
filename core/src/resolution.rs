//! Resolution - deciding how an outcome settles a deferred value
//!
//! Every path that settles a deferred value from an arbitrary outcome (an
//! executor's resolve capability, a reaction's return value, a thenable's
//! resolve capability) funnels through [`resolve`]:
//!
//! 1. the outcome *is* the target → reject with a self-resolution error
//! 2. the outcome is another [`Deferred`] → adopt its eventual state
//! 3. the outcome is a [`Thenable`] → assimilate it through its own `then`
//! 4. anything else → fulfil with the plain value
//!
//! Steps 2 and 3 recurse: a thenable may resolve with another thenable, which
//! is unwrapped again. The identity check in step 1 is the only cycle guard.

use crate::deferred::Deferred;
use crate::error::DeferredError;
use crate::{Payload, Reason};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// An outcome to be folded into a deferred value.
pub enum Resolution<T, E> {
    /// A plain value; fulfils the target directly.
    Value(T),
    /// Another deferred value whose state the target adopts.
    Deferred(Deferred<T, E>),
    /// A foreign object exposing a `then` capability.
    Thenable(Box<dyn Thenable<T, E>>),
}

impl<T, E> Resolution<T, E> {
    pub fn thenable(thenable: impl Thenable<T, E> + 'static) -> Self {
        Resolution::Thenable(Box::new(thenable))
    }
}

impl<T, E> From<Deferred<T, E>> for Resolution<T, E> {
    fn from(deferred: Deferred<T, E>) -> Self {
        Resolution::Deferred(deferred)
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Resolution<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Resolution::Deferred(deferred) => {
                f.debug_tuple("Deferred").field(&deferred.id()).finish()
            }
            Resolution::Thenable(_) => f.write_str("Thenable(..)"),
        }
    }
}

/// The duck-typed interop contract: anything with a callable `then`.
///
/// Foreign deferred-value implementations share no base type with
/// [`Deferred`]; implementing this trait is all they need to be chained.
/// Any `FnOnce(Resolver, Rejecter) -> Result<(), E>` closure is a thenable.
pub trait Thenable<T, E> {
    /// Look up the `then` member before it is invoked.
    ///
    /// An error here rejects the target and `then` is never called.
    fn probe(&self) -> Result<(), E> {
        Ok(())
    }

    /// Subscribe the two capabilities. Only the first capability call has
    /// any effect. Returning `Err` before either capability fired rejects
    /// the target; after that the error is ignored.
    fn then(self: Box<Self>, resolve: Resolver<T, E>, reject: Rejecter<T, E>) -> Result<(), E>;
}

impl<T, E, F> Thenable<T, E> for F
where
    F: FnOnce(Resolver<T, E>, Rejecter<T, E>) -> Result<(), E>,
{
    fn then(self: Box<Self>, resolve: Resolver<T, E>, reject: Rejecter<T, E>) -> Result<(), E> {
        (*self)(resolve, reject)
    }
}

/// Shared first-call-wins guard for a capability pair.
#[derive(Clone, Default)]
pub(crate) struct Seal(Rc<Cell<bool>>);

impl Seal {
    /// Trip the seal. Returns `true` only for the first caller.
    pub(crate) fn trip(&self) -> bool {
        !self.0.replace(true)
    }

    pub(crate) fn is_tripped(&self) -> bool {
        self.0.get()
    }
}

/// When a capability's effect happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Entry {
    /// Executor and channel capabilities: settle on a later turn.
    Scheduled,
    /// Thenable capabilities: re-enter the procedure in place.
    Immediate,
}

/// The resolve capability handed to executors and thenables.
pub struct Resolver<T, E> {
    target: Deferred<T, E>,
    seal: Seal,
    entry: Entry,
}

impl<T, E> Clone for Resolver<T, E> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            seal: self.seal.clone(),
            entry: self.entry,
        }
    }
}

impl<T: Payload, E: Reason> Resolver<T, E> {
    pub(crate) fn new(target: Deferred<T, E>, seal: Seal, entry: Entry) -> Self {
        Self {
            target,
            seal,
            entry,
        }
    }

    /// Resolve the target with an outcome, unwrapping deferred values and
    /// thenables. Ignored once either capability of the pair has fired.
    pub fn resolve(&self, outcome: impl Into<Resolution<T, E>>) {
        if !self.seal.trip() {
            trace!(deferred = %self.target.id(), "resolve capability already used");
            return;
        }
        let outcome = outcome.into();
        match self.entry {
            Entry::Immediate => resolve(&self.target, outcome),
            Entry::Scheduled => {
                let target = self.target.clone();
                self.target
                    .scheduler()
                    .defer(move || resolve(&target, outcome));
            }
        }
    }

    /// Shorthand for `resolve(Resolution::Value(value))`.
    pub fn fulfill(&self, value: T) {
        self.resolve(Resolution::Value(value));
    }

    pub fn is_sealed(&self) -> bool {
        self.seal.is_tripped()
    }
}

impl<T, E> fmt::Debug for Resolver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("target", &self.target.id())
            .field("sealed", &self.seal.is_tripped())
            .finish()
    }
}

/// The reject capability handed to executors and thenables.
pub struct Rejecter<T, E> {
    target: Deferred<T, E>,
    seal: Seal,
    entry: Entry,
}

impl<T, E> Clone for Rejecter<T, E> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            seal: self.seal.clone(),
            entry: self.entry,
        }
    }
}

impl<T: Payload, E: Reason> Rejecter<T, E> {
    pub(crate) fn new(target: Deferred<T, E>, seal: Seal, entry: Entry) -> Self {
        Self {
            target,
            seal,
            entry,
        }
    }

    /// Reject the target with `reason`, stored as-is.
    pub fn reject(&self, reason: E) {
        if !self.seal.trip() {
            trace!(deferred = %self.target.id(), "reject capability already used");
            return;
        }
        match self.entry {
            Entry::Immediate => self.target.settle_rejected(reason),
            Entry::Scheduled => {
                let target = self.target.clone();
                self.target
                    .scheduler()
                    .defer(move || target.settle_rejected(reason));
            }
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.seal.is_tripped()
    }
}

impl<T, E> fmt::Debug for Rejecter<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejecter")
            .field("target", &self.target.id())
            .field("sealed", &self.seal.is_tripped())
            .finish()
    }
}

/// Fold `outcome` into `target`.
pub(crate) fn resolve<T: Payload, E: Reason>(target: &Deferred<T, E>, outcome: Resolution<T, E>) {
    match outcome {
        Resolution::Deferred(source) if source.ptr_eq(target) => {
            warn!(deferred = %target.id(), "deferred value resolved with itself");
            target.settle_rejected(E::from(DeferredError::SelfResolution { id: target.id() }));
        }
        Resolution::Deferred(source) => adopt(target, &source),
        Resolution::Thenable(thenable) => assimilate(target, thenable),
        Resolution::Value(value) => target.settle_fulfilled(value),
    }
}

fn adopt<T: Payload, E: Reason>(target: &Deferred<T, E>, source: &Deferred<T, E>) {
    trace!(deferred = %target.id(), source = %source.id(), "adopting state");
    let on_value = target.clone();
    let on_reason = target.clone();
    source.subscribe(
        Box::new(move |value| on_value.settle_fulfilled(value)),
        Box::new(move |reason| on_reason.settle_rejected(reason)),
    );
}

fn assimilate<T: Payload, E: Reason>(target: &Deferred<T, E>, thenable: Box<dyn Thenable<T, E>>) {
    if let Err(reason) = thenable.probe() {
        debug!(deferred = %target.id(), "then lookup failed");
        target.settle_rejected(reason);
        return;
    }

    let seal = Seal::default();
    let resolver = Resolver::new(target.clone(), seal.clone(), Entry::Immediate);
    let rejecter = Rejecter::new(target.clone(), seal.clone(), Entry::Immediate);

    if let Err(reason) = thenable.then(resolver, rejecter) {
        if seal.trip() {
            target.settle_rejected(reason);
        } else {
            debug!(deferred = %target.id(), "thenable failed after settling; error swallowed");
        }
    }
}
