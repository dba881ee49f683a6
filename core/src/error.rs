use crate::deferred::DeferredId;
use serde::Serialize;
use thiserror::Error;

/// Errors raised by the deferred-value machinery itself.
///
/// Apart from [`DeferredError::EmptySequence`], which combinators return
/// synchronously, these never escape as `Err` values from the API. They reach
/// callers as rejection reasons, converted through the `From<DeferredError>`
/// bound every reason type carries (see [`Reason`](crate::Reason)).
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeferredError {
    /// A reaction (or thenable) tried to settle a deferred value with itself.
    #[error("{id} cannot be resolved with itself")]
    SelfResolution { id: DeferredId },

    #[error("`{combinator}` requires a non-empty input sequence")]
    EmptySequence { combinator: &'static str },

    #[error("all {count} inputs passed to `any` were rejected")]
    AllRejected { count: usize },

    /// The deferred value was dropped while still pending.
    #[error("deferred value dropped before it settled")]
    Abandoned,
}
