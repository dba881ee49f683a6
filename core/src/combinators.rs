//! Combinators - constructors and joins built from `resolve` + `then`
//!
//! `all`, `race`, `all_settled` and `any` refuse an empty input with
//! [`DeferredError::EmptySequence`], returned synchronously rather than as a
//! rejection.

use crate::deferred::Deferred;
use crate::error::DeferredError;
use crate::outcome::SettledOutcome;
use crate::resolution::Resolution;
use crate::scheduler::SchedulerHandle;
use crate::{Payload, Reason};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::debug;

fn collect_inputs<T, E, I>(
    combinator: &'static str,
    items: I,
) -> Result<Vec<Resolution<T, E>>, DeferredError>
where
    I: IntoIterator,
    I::Item: Into<Resolution<T, E>>,
{
    let inputs: Vec<Resolution<T, E>> = items.into_iter().map(Into::into).collect();
    if inputs.is_empty() {
        return Err(DeferredError::EmptySequence { combinator });
    }
    debug!(combinator, inputs = inputs.len(), "joining");
    Ok(inputs)
}

/// Slots for index-aligned results plus a countdown of unsettled inputs.
struct Tally<V> {
    slots: RefCell<Vec<Option<V>>>,
    remaining: Cell<usize>,
}

impl<V: Clone> Tally<V> {
    fn new(count: usize) -> Rc<Self> {
        Rc::new(Self {
            slots: RefCell::new(vec![None; count]),
            remaining: Cell::new(count),
        })
    }

    /// Record a result; returns every result in input order once the last
    /// slot is filled.
    fn record(&self, index: usize, value: V) -> Option<Vec<V>> {
        self.slots.borrow_mut()[index] = Some(value);
        self.remaining.set(self.remaining.get() - 1);
        if self.remaining.get() > 0 {
            return None;
        }
        Some(self.slots.borrow_mut().drain(..).flatten().collect())
    }
}

impl<T: Payload, E: Reason> Deferred<T, E> {
    /// A deferred value resolved with `outcome` on a later turn. Deferred
    /// values and thenables are unwrapped.
    pub fn resolve(scheduler: &SchedulerHandle, outcome: impl Into<Resolution<T, E>>) -> Self {
        let outcome = outcome.into();
        Self::new(scheduler, move |resolve, _| resolve.resolve(outcome))
    }

    /// A deferred value fulfilled with `value` on a later turn.
    pub fn fulfilled(scheduler: &SchedulerHandle, value: T) -> Self {
        Self::resolve(scheduler, Resolution::Value(value))
    }

    /// A deferred value rejected with `reason` on a later turn. The reason is
    /// stored as-is.
    pub fn reject(scheduler: &SchedulerHandle, reason: E) -> Self {
        Self::new(scheduler, move |_, reject| reject.reject(reason))
    }

    /// Wait for every input. Fulfils with the values in input order; rejects
    /// with the first rejection as soon as it happens.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let both: Deferred<Vec<User>, AppError> = Deferred::all(&scheduler, [alice, bob])?;
    /// ```
    pub fn all<I>(
        scheduler: &SchedulerHandle,
        items: I,
    ) -> Result<Deferred<Vec<T>, E>, DeferredError>
    where
        I: IntoIterator,
        I::Item: Into<Resolution<T, E>>,
    {
        let inputs = collect_inputs("all", items)?;
        let combined = Deferred::<Vec<T>, E>::pending(scheduler);
        let tally = Tally::new(inputs.len());

        for (index, input) in inputs.into_iter().enumerate() {
            let tally = Rc::clone(&tally);
            let on_value = combined.clone();
            let on_reason = combined.clone();
            Self::resolve(scheduler, input).then(
                move |value| {
                    if let Some(values) = tally.record(index, value) {
                        on_value.settle_fulfilled(values);
                    }
                    Ok(Resolution::Value(()))
                },
                move |reason| {
                    on_reason.settle_rejected(reason);
                    Ok(Resolution::Value(()))
                },
            );
        }
        Ok(combined)
    }

    /// Settle like whichever input settles first.
    pub fn race<I>(scheduler: &SchedulerHandle, items: I) -> Result<Deferred<T, E>, DeferredError>
    where
        I: IntoIterator,
        I::Item: Into<Resolution<T, E>>,
    {
        let inputs = collect_inputs("race", items)?;
        let combined = Self::pending(scheduler);

        for input in inputs {
            let on_value = combined.clone();
            let on_reason = combined.clone();
            Self::resolve(scheduler, input).then(
                move |value| {
                    on_value.settle_fulfilled(value);
                    Ok(Resolution::Value(()))
                },
                move |reason| {
                    on_reason.settle_rejected(reason);
                    Ok(Resolution::Value(()))
                },
            );
        }
        Ok(combined)
    }

    /// Wait for every input and report each outcome in input order. Never
    /// rejects.
    pub fn all_settled<I>(
        scheduler: &SchedulerHandle,
        items: I,
    ) -> Result<Deferred<Vec<SettledOutcome<T, E>>, E>, DeferredError>
    where
        I: IntoIterator,
        I::Item: Into<Resolution<T, E>>,
    {
        let inputs = collect_inputs("all_settled", items)?;
        let combined = Deferred::<Vec<SettledOutcome<T, E>>, E>::pending(scheduler);
        let tally = Tally::new(inputs.len());

        for (index, input) in inputs.into_iter().enumerate() {
            let on_value = (Rc::clone(&tally), combined.clone());
            let on_reason = (Rc::clone(&tally), combined.clone());
            Self::resolve(scheduler, input).then(
                move |value| {
                    let (tally, combined) = on_value;
                    if let Some(outcomes) = tally.record(index, SettledOutcome::Fulfilled(value)) {
                        combined.settle_fulfilled(outcomes);
                    }
                    Ok(Resolution::Value(()))
                },
                move |reason| {
                    let (tally, combined) = on_reason;
                    if let Some(outcomes) = tally.record(index, SettledOutcome::Rejected(reason)) {
                        combined.settle_fulfilled(outcomes);
                    }
                    Ok(Resolution::Value(()))
                },
            );
        }
        Ok(combined)
    }

    /// Fulfil with the first input to fulfil. If every input rejects, reject
    /// with [`DeferredError::AllRejected`].
    pub fn any<I>(scheduler: &SchedulerHandle, items: I) -> Result<Deferred<T, E>, DeferredError>
    where
        I: IntoIterator,
        I::Item: Into<Resolution<T, E>>,
    {
        let inputs = collect_inputs("any", items)?;
        let count = inputs.len();
        let combined = Self::pending(scheduler);
        let rejections = Rc::new(Cell::new(0usize));

        for input in inputs {
            let on_value = combined.clone();
            let on_reason = combined.clone();
            let rejections = Rc::clone(&rejections);
            Self::resolve(scheduler, input).then(
                move |value| {
                    on_value.settle_fulfilled(value);
                    Ok(Resolution::Value(()))
                },
                move |_reason| {
                    rejections.set(rejections.get() + 1);
                    if rejections.get() == count {
                        on_reason.settle_rejected(E::from(DeferredError::AllRejected { count }));
                    }
                    Ok(Resolution::Value(()))
                },
            );
        }
        Ok(combined)
    }
}
