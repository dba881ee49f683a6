//! TaskQueue - a manually pumped scheduler with a virtual clock
//!
//! Nothing runs until the owner turns the crank (`run_once`, `run_ready`,
//! `advance`, `run_until_idle`). That makes every interleaving reproducible,
//! which is what the test-suite and simulation drivers rely on.
//!
//! Time is a plain tick counter. Timers registered with
//! [`TaskQueue::schedule_after`] become ready once the clock reaches them;
//! timers due at the same tick run in registration order.

use crate::config::RuntimeConfig;
use crate::error::QueueError;
use pledge_core::{Scheduler, SchedulerHandle, Task};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace, warn};

#[derive(Default)]
struct QueueState {
    ready: VecDeque<Task>,
    /// Keyed by (due tick, registration sequence).
    timers: BTreeMap<(u64, u64), Task>,
    now: u64,
    next_seq: u64,
    executed: u64,
}

impl QueueState {
    fn next_due(&self) -> Option<u64> {
        self.timers.keys().next().map(|&(due, _)| due)
    }

    /// Move every timer due at or before `tick` to the ready queue.
    fn release_until(&mut self, tick: u64) -> usize {
        let later = self.timers.split_off(&(tick.saturating_add(1), 0));
        let due = std::mem::replace(&mut self.timers, later);
        let released = due.len();
        self.ready.extend(due.into_values());
        released
    }
}

/// Deterministic FIFO scheduler. Clones share the same queue.
#[derive(Clone, Default)]
pub struct TaskQueue {
    inner: Rc<RefCell<QueueState>>,
    max_turns: Option<u64>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &RuntimeConfig) -> Self {
        Self {
            inner: Rc::default(),
            max_turns: config.max_turns,
        }
    }

    /// Bound the number of tasks a single `run_until_idle` call may run.
    pub fn with_max_turns(mut self, limit: u64) -> Self {
        self.max_turns = Some(limit);
        self
    }

    /// Handle to pass to `Deferred` constructors.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle::new(self.clone())
    }

    /// Run `task` once the clock has advanced by `ticks`.
    pub fn schedule_after(&self, ticks: u64, task: impl FnOnce() + 'static) {
        let mut state = self.inner.borrow_mut();
        let due = state.now.saturating_add(ticks);
        let seq = state.next_seq;
        state.next_seq += 1;
        trace!(due, seq, "timer registered");
        state.timers.insert((due, seq), Box::new(task));
    }

    /// Current virtual time.
    pub fn now(&self) -> u64 {
        self.inner.borrow().now
    }

    /// Tasks ready to run, excluding timers.
    pub fn len(&self) -> usize {
        self.inner.borrow().ready.len()
    }

    pub fn timers(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    /// No ready tasks and no timers.
    pub fn is_idle(&self) -> bool {
        let state = self.inner.borrow();
        state.ready.is_empty() && state.timers.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total tasks run over the lifetime of the queue.
    pub fn executed(&self) -> u64 {
        self.inner.borrow().executed
    }

    /// Run the oldest ready task. Returns `false` if there was none.
    pub fn run_once(&self) -> bool {
        let next = self.inner.borrow_mut().ready.pop_front();
        let Some(task) = next else {
            return false;
        };
        task();
        self.inner.borrow_mut().executed += 1;
        true
    }

    /// Run ready tasks, including ones they schedule, until none are left.
    /// Timers are not touched.
    pub fn run_ready(&self) -> usize {
        let mut ran = 0;
        while self.run_once() {
            ran += 1;
        }
        ran
    }

    /// Move the clock forward by `ticks`, running every task that becomes
    /// ready on the way. Returns the number of tasks run.
    pub fn advance(&self, ticks: u64) -> usize {
        let target = self.now().saturating_add(ticks);
        let mut ran = self.run_ready();
        loop {
            let due = self.inner.borrow().next_due();
            match due {
                Some(due) if due <= target => {
                    let mut state = self.inner.borrow_mut();
                    state.now = due;
                    state.release_until(due);
                }
                _ => break,
            }
            ran += self.run_ready();
        }
        self.inner.borrow_mut().now = target;
        debug!(now = target, ran, "clock advanced");
        ran
    }

    /// Run until nothing is ready and no timers remain, jumping the clock to
    /// the next timer whenever the ready queue empties.
    pub fn run_until_idle(&self) -> Result<usize, QueueError> {
        let mut ran: u64 = 0;
        loop {
            if !self.is_empty() {
                if let Some(limit) = self.max_turns {
                    if ran >= limit {
                        warn!(limit, "turn limit reached");
                        return Err(QueueError::TurnLimitExceeded { limit });
                    }
                }
                self.run_once();
                ran += 1;
                continue;
            }

            let due = self.inner.borrow().next_due();
            let Some(due) = due else {
                debug!(ran, "queue idle");
                return Ok(ran as usize);
            };
            let mut state = self.inner.borrow_mut();
            state.now = due;
            let released = state.release_until(due);
            trace!(now = due, released, "clock jumped to next timer");
        }
    }
}

impl Scheduler for TaskQueue {
    fn schedule(&self, task: Task) {
        self.inner.borrow_mut().ready.push_back(task);
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("TaskQueue")
            .field("now", &state.now)
            .field("ready", &state.ready.len())
            .field("timers", &state.timers.len())
            .field("max_turns", &self.max_turns)
            .finish()
    }
}
