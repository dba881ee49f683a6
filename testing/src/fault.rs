use pledge_core::DeferredError;
use serde::Serialize;
use thiserror::Error;

/// General-purpose rejection reason for tests.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TestFault {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Deferred(#[from] DeferredError),
}

impl TestFault {
    pub fn msg(text: impl Into<String>) -> Self {
        TestFault::Message(text.into())
    }

    /// The library error carried by this fault, if any.
    pub fn as_deferred(&self) -> Option<&DeferredError> {
        match self {
            TestFault::Deferred(err) => Some(err),
            TestFault::Message(_) => None,
        }
    }
}
