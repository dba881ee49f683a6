//! A foreign thenable driven by a script.

use pledge_core::{Payload, Reason, Rejecter, Resolution, Resolver, SchedulerHandle, Thenable};
use std::cell::Cell;
use std::rc::Rc;

enum Action<T, E> {
    Resolve(Resolution<T, E>),
    Reject(E),
}

/// A thenable that replays a fixed sequence of capability calls.
///
/// Useful for checking the first-call-wins rule and error handling around
/// `then`:
///
/// ```rust,ignore
/// let misbehaving = ScriptedThenable::new()
///     .fulfill(1)
///     .reject(TestFault::msg("ignored"))
///     .fail_with(TestFault::msg("also ignored"));
/// ```
pub struct ScriptedThenable<T, E> {
    actions: Vec<Action<T, E>>,
    probe_error: Option<E>,
    then_error: Option<E>,
    later: Option<SchedulerHandle>,
    then_calls: Rc<Cell<usize>>,
}

impl<T, E> Default for ScriptedThenable<T, E> {
    fn default() -> Self {
        Self {
            actions: Vec::new(),
            probe_error: None,
            then_error: None,
            later: None,
            then_calls: Rc::default(),
        }
    }
}

impl<T: Payload, E: Reason> ScriptedThenable<T, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fulfill(self, value: T) -> Self {
        self.resolve(Resolution::Value(value))
    }

    pub fn resolve(mut self, outcome: impl Into<Resolution<T, E>>) -> Self {
        self.actions.push(Action::Resolve(outcome.into()));
        self
    }

    pub fn reject(mut self, reason: E) -> Self {
        self.actions.push(Action::Reject(reason));
        self
    }

    /// Return this error from `then` after the scripted calls.
    pub fn fail_with(mut self, reason: E) -> Self {
        self.then_error = Some(reason);
        self
    }

    /// Fail the lookup of `then`; the script never runs.
    pub fn fail_probe(mut self, reason: E) -> Self {
        self.probe_error = Some(reason);
        self
    }

    /// Play the script on a later turn of `scheduler` instead of inside `then`.
    pub fn on_later_turn(mut self, scheduler: &SchedulerHandle) -> Self {
        self.later = Some(scheduler.clone());
        self
    }

    /// Counter of `then` invocations, readable after the thenable is consumed.
    pub fn then_calls(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.then_calls)
    }

    /// Box into a [`Resolution`].
    pub fn into_resolution(self) -> Resolution<T, E> {
        Resolution::thenable(self)
    }
}

fn play<T: Payload, E: Reason>(
    actions: Vec<Action<T, E>>,
    resolve: Resolver<T, E>,
    reject: Rejecter<T, E>,
) {
    for action in actions {
        match action {
            Action::Resolve(outcome) => resolve.resolve(outcome),
            Action::Reject(reason) => reject.reject(reason),
        }
    }
}

impl<T: Payload, E: Reason> Thenable<T, E> for ScriptedThenable<T, E> {
    fn probe(&self) -> Result<(), E> {
        match &self.probe_error {
            Some(reason) => Err(reason.clone()),
            None => Ok(()),
        }
    }

    fn then(self: Box<Self>, resolve: Resolver<T, E>, reject: Rejecter<T, E>) -> Result<(), E> {
        let this = *self;
        this.then_calls.set(this.then_calls.get() + 1);
        match this.later {
            Some(scheduler) => {
                let actions = this.actions;
                scheduler.defer(move || play(actions, resolve, reject));
            }
            None => play(this.actions, resolve, reject),
        }
        match this.then_error {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }
}

impl<T: Payload, E: Reason> From<ScriptedThenable<T, E>> for Resolution<T, E> {
    fn from(thenable: ScriptedThenable<T, E>) -> Self {
        thenable.into_resolution()
    }
}
