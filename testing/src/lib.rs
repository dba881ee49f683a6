//! Test utilities for code built on Pledge.
//!
//! * [`Probe`] / [`observe`] - record how a deferred value settled
//! * [`TestFault`] - a ready-made reason type
//! * [`ScriptedThenable`] - a foreign thenable with a fixed script
//! * [`delayed`] / [`delayed_reject`] - values that settle on a virtual timer
//! * `assert_fulfilled!`, `assert_rejected!`, `assert_pending!`

pub mod fault;
pub mod probe;
pub mod thenable;
pub mod timing;

pub use fault::TestFault;
pub use probe::{Probe, observe, snapshot};
pub use thenable::ScriptedThenable;
pub use timing::{delayed, delayed_reject};

#[doc(hidden)]
pub use pledge_core as __core;

/// Assert that a deferred value is fulfilled, optionally with a given value.
#[macro_export]
macro_rules! assert_fulfilled {
    ($deferred:expr) => {{
        let deferred = &$deferred;
        let state = deferred.state();
        assert!(
            state.is_fulfilled(),
            "expected {} to be fulfilled, but it is {}",
            deferred.id(),
            state.label()
        );
    }};
    ($deferred:expr, $expected:expr $(,)?) => {{
        let deferred = &$deferred;
        match deferred.state() {
            $crate::__core::State::Fulfilled(value) => assert_eq!(value, $expected),
            other => panic!(
                "expected {} to be fulfilled, but it is {}",
                deferred.id(),
                other.label()
            ),
        }
    }};
}

/// Assert that a deferred value is rejected, optionally with a given reason.
#[macro_export]
macro_rules! assert_rejected {
    ($deferred:expr) => {{
        let deferred = &$deferred;
        let state = deferred.state();
        assert!(
            state.is_rejected(),
            "expected {} to be rejected, but it is {}",
            deferred.id(),
            state.label()
        );
    }};
    ($deferred:expr, $expected:expr $(,)?) => {{
        let deferred = &$deferred;
        match deferred.state() {
            $crate::__core::State::Rejected(reason) => assert_eq!(reason, $expected),
            other => panic!(
                "expected {} to be rejected, but it is {}",
                deferred.id(),
                other.label()
            ),
        }
    }};
}

#[macro_export]
macro_rules! assert_pending {
    ($deferred:expr) => {{
        let deferred = &$deferred;
        assert!(
            deferred.is_pending(),
            "expected {} to be pending, but it is {}",
            deferred.id(),
            deferred.state().label()
        );
    }};
}
