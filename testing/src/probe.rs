//! Observing settlement through the public API.

use pledge_core::{Deferred, Payload, Reason, Resolution};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Records the outcome of a deferred value as seen by a `then` reaction.
///
/// Because reactions run on a later turn, a probe only fills in after the
/// scheduler has been pumped.
pub struct Probe<T, E> {
    outcome: Rc<RefCell<Option<Result<T, E>>>>,
    calls: Rc<Cell<usize>>,
}

impl<T, E> Clone for Probe<T, E> {
    fn clone(&self) -> Self {
        Self {
            outcome: Rc::clone(&self.outcome),
            calls: Rc::clone(&self.calls),
        }
    }
}

impl<T: Clone, E: Clone> Probe<T, E> {
    pub fn outcome(&self) -> Option<Result<T, E>> {
        self.outcome.borrow().clone()
    }

    pub fn value(&self) -> Option<T> {
        self.outcome().and_then(Result::ok)
    }

    pub fn reason(&self) -> Option<E> {
        self.outcome().and_then(Result::err)
    }

    pub fn is_settled(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    /// How many times a reaction fired. Anything other than 0 or 1 is a bug.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

/// Attach a probe to `deferred`.
pub fn observe<T: Payload, E: Reason>(deferred: &Deferred<T, E>) -> Probe<T, E> {
    let probe = Probe {
        outcome: Rc::default(),
        calls: Rc::default(),
    };
    let on_value = probe.clone();
    let on_reason = probe.clone();
    deferred.then(
        move |value| {
            on_value.calls.set(on_value.calls.get() + 1);
            *on_value.outcome.borrow_mut() = Some(Ok(value));
            Ok(Resolution::Value(()))
        },
        move |reason| {
            on_reason.calls.set(on_reason.calls.get() + 1);
            *on_reason.outcome.borrow_mut() = Some(Err(reason));
            Ok(Resolution::Value(()))
        },
    );
    probe
}

/// The current state of `deferred` as JSON, e.g.
/// `{"state":"fulfilled","payload":3}`.
pub fn snapshot<T, E>(deferred: &Deferred<T, E>) -> serde_json::Result<serde_json::Value>
where
    T: Payload + Serialize,
    E: Reason + Serialize,
{
    serde_json::to_value(deferred.state())
}
