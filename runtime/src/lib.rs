//! Pledge runtime: concrete schedulers plus configuration and tracing set-up.
//!
//! * [`TaskQueue`] - deterministic, manually pumped, with a virtual clock.
//! * [`LocalScheduler`] - runs tasks on the current tokio `LocalSet`.

pub mod config;
pub mod error;
pub mod local;
pub mod queue;
pub mod telemetry;

pub mod prelude {
    pub use crate::config::RuntimeConfig;
    pub use crate::error::QueueError;
    pub use crate::local::LocalScheduler;
    pub use crate::queue::TaskQueue;
}

pub use config::{LogFormat, RuntimeConfig, TelemetryConfig};
pub use error::QueueError;
pub use local::LocalScheduler;
pub use queue::TaskQueue;
pub use telemetry::init_tracing;
