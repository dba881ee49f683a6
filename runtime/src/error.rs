use thiserror::Error;

/// Failures while driving a [`TaskQueue`](crate::TaskQueue).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// `run_until_idle` ran `limit` tasks and the queue was still busy.
    /// Usually a thenable that keeps re-scheduling itself.
    #[error("task queue still busy after {limit} turns")]
    TurnLimitExceeded { limit: u64 },
}
