//! In-crate helpers for unit tests. The richer, public toolkit lives in
//! `pledge-test`, which cannot be used here without a dependency cycle.

use crate::deferred::Deferred;
use crate::error::DeferredError;
use crate::scheduler::{Scheduler, SchedulerHandle, Task};
use crate::{Payload, Reason};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use thiserror::Error;

#[derive(Clone, Default)]
pub(crate) struct ManualQueue {
    tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl Scheduler for ManualQueue {
    fn schedule(&self, task: Task) {
        self.tasks.borrow_mut().push_back(task);
    }
}

impl ManualQueue {
    pub(crate) fn handle(&self) -> SchedulerHandle {
        SchedulerHandle::new(self.clone())
    }

    pub(crate) fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Run tasks (including ones they enqueue) until the queue is empty.
    pub(crate) fn drain(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.tasks.borrow_mut().pop_front();
            match next {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub(crate) enum Fault {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Deferred(#[from] DeferredError),
}

impl Fault {
    pub(crate) fn msg(text: &str) -> Self {
        Fault::Message(text.to_string())
    }
}

pub(crate) type Slot<T, E> = Rc<RefCell<Option<Result<T, E>>>>;

/// Capture the settlement of `deferred` without going through the scheduler.
pub(crate) fn observe<T: Payload, E: Reason>(deferred: &Deferred<T, E>) -> Slot<T, E> {
    let slot: Slot<T, E> = Rc::default();
    let on_value = Rc::clone(&slot);
    let on_reason = Rc::clone(&slot);
    deferred.subscribe(
        Box::new(move |value| *on_value.borrow_mut() = Some(Ok(value))),
        Box::new(move |reason| *on_reason.borrow_mut() = Some(Err(reason))),
    );
    slot
}
