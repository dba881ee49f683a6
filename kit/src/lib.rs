//! Pledge facade crate.
//!
//! Re-exports the core deferred-value machinery and the runtime schedulers
//! with a single entry point.
//!
//! ```rust,ignore
//! use pledge::prelude::*;
//!
//! let queue = TaskQueue::new();
//! let answer = Deferred::<u32, MyError>::fulfilled(&queue.handle(), 41).map(|n| n + 1);
//! queue.run_until_idle()?;
//! assert_eq!(answer.state(), State::Fulfilled(42));
//! ```

pub use pledge_core as core;
pub use pledge_runtime as runtime;

pub use pledge_core::{
    Deferred, DeferredError, DeferredId, Handler, Payload, Reason, Rejecter, Resolution, Resolver,
    Scheduler, SchedulerHandle, Settled, SettledOutcome, State, Thenable,
};
pub use pledge_runtime::{LocalScheduler, QueueError, RuntimeConfig, TaskQueue, init_tracing};

pub mod prelude {
    pub use pledge_core::prelude::*;
    pub use pledge_runtime::prelude::*;
}
