//! State - the Settlement Core
//!
//! A deferred value moves through exactly one transition:
//!
//! ```text
//! Pending ──► Fulfilled(T)
//!    └──────► Rejected(E)
//! ```
//!
//! [`Core`] owns that state and the two reaction lists. It never calls a
//! reaction itself; it hands the drained list back so the caller can release
//! its `RefCell` borrow first and then run user code.

use serde::{Deserialize, Serialize};

/// The observable state of a deferred value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "payload", rename_all = "snake_case")]
pub enum State<T, E> {
    /// Not settled yet
    Pending,
    /// Settled successfully with a value
    Fulfilled(T),
    /// Settled with a rejection reason
    Rejected(E),
}

impl<T, E> State<T, E> {
    pub fn is_pending(&self) -> bool {
        matches!(self, State::Pending)
    }

    /// Check if the state has left `Pending`
    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }

    pub fn is_fulfilled(&self) -> bool {
        matches!(self, State::Fulfilled(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, State::Rejected(_))
    }

    /// A short label for logs and `Debug` output.
    pub fn label(&self) -> &'static str {
        match self {
            State::Pending => "pending",
            State::Fulfilled(_) => "fulfilled",
            State::Rejected(_) => "rejected",
        }
    }

    /// Convert a settled state into a `Result`, `None` while pending.
    pub fn into_result(self) -> Option<Result<T, E>> {
        match self {
            State::Pending => None,
            State::Fulfilled(value) => Some(Ok(value)),
            State::Rejected(reason) => Some(Err(reason)),
        }
    }
}

/// A callback waiting for one kind of settlement.
pub(crate) type Reaction<P> = Box<dyn FnOnce(P)>;

pub(crate) struct Core<T, E> {
    state: State<T, E>,
    fulfill_reactions: Vec<Reaction<T>>,
    reject_reactions: Vec<Reaction<E>>,
}

impl<T, E> Core<T, E> {
    pub(crate) fn new() -> Self {
        Self {
            state: State::Pending,
            fulfill_reactions: Vec::new(),
            reject_reactions: Vec::new(),
        }
    }

    pub(crate) fn state(&self) -> &State<T, E> {
        &self.state
    }

    /// Queue a reaction pair. Only valid while pending.
    pub(crate) fn enqueue(&mut self, on_fulfilled: Reaction<T>, on_rejected: Reaction<E>) {
        debug_assert!(self.state.is_pending());
        self.fulfill_reactions.push(on_fulfilled);
        self.reject_reactions.push(on_rejected);
    }

    #[cfg(test)]
    pub(crate) fn queued(&self) -> usize {
        self.fulfill_reactions.len()
    }

    /// Move to `Fulfilled`. Returns the reactions to run, or `None` if the
    /// core was already settled.
    pub(crate) fn fulfil(&mut self, value: T) -> Option<Vec<Reaction<T>>> {
        if self.state.is_settled() {
            return None;
        }
        self.state = State::Fulfilled(value);
        self.reject_reactions.clear();
        Some(std::mem::take(&mut self.fulfill_reactions))
    }

    /// Move to `Rejected`. Returns the reactions to run, or `None` if the
    /// core was already settled.
    pub(crate) fn reject(&mut self, reason: E) -> Option<Vec<Reaction<E>>> {
        if self.state.is_settled() {
            return None;
        }
        self.state = State::Rejected(reason);
        self.fulfill_reactions.clear();
        Some(std::mem::take(&mut self.reject_reactions))
    }
}

impl<T: Clone, E: Clone> Core<T, E> {
    /// Snapshot of the settled payload, `None` while pending.
    pub(crate) fn settled(&self) -> Option<Result<T, E>> {
        self.state.clone().into_result()
    }
}
