//! Pledge core: deferred values with chaining, combinators and thenable
//! interop.
//!
//! Everything here is single-threaded (`Rc` + `RefCell`) and independent of
//! any particular event loop. Reactions are handed to a [`Scheduler`]; the
//! `pledge-runtime` crate provides a deterministic queue and a tokio-backed
//! one.

pub mod chain;
pub mod combinators;
pub mod deferred;
pub mod error;
pub mod future;
pub mod outcome;
pub mod resolution;
pub mod scheduler;
pub mod state;

#[cfg(test)]
mod testkit;

pub use chain::Handler;
pub use deferred::{Deferred, DeferredId};
pub use error::DeferredError;
pub use future::Settled;
pub use outcome::SettledOutcome;
pub use resolution::{Rejecter, Resolution, Resolver, Thenable};
pub use scheduler::{Scheduler, SchedulerHandle, Task};
pub use state::State;

/// Values a deferred value can be fulfilled with.
///
/// Settled values are handed to every reaction, so they must be cloneable.
pub trait Payload: Clone + 'static {}

impl<T: Clone + 'static> Payload for T {}

/// Reasons a deferred value can be rejected with.
///
/// The library raises its own failures (self-resolution, abandoned awaits,
/// `any` with no success) through `From<DeferredError>`.
pub trait Reason: Clone + From<DeferredError> + 'static {}

impl<E: Clone + From<DeferredError> + 'static> Reason for E {}

pub mod prelude {
    pub use crate::deferred::{Deferred, DeferredId};
    pub use crate::error::DeferredError;
    pub use crate::outcome::SettledOutcome;
    pub use crate::resolution::{Rejecter, Resolution, Resolver, Thenable};
    pub use crate::scheduler::{Scheduler, SchedulerHandle};
    pub use crate::state::State;
    pub use crate::{Payload, Reason};
}
