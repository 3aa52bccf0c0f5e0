//! Error types for bounded process execution
//!
//! Only precondition failures are errors. Everything that happens once a
//! child has been asked to start (spawn failures included) is reported as
//! data on [`crate::ExecutionOutcome`].

use thiserror::Error;

/// Precondition failures raised before any process is spawned
#[derive(Debug, Error)]
pub enum ProcessError {
    /// A caller-supplied limit was zero or otherwise unusable
    #[error("Invalid limits: {0}")]
    InvalidLimits(String),

    /// The host operating system has no supported termination mechanism
    #[error("Unsupported host environment: {0}")]
    UnsupportedPlatform(&'static str),

    /// The spawn specification cannot describe a runnable command
    #[error("Invalid spawn specification: {0}")]
    InvalidSpawnSpec(String),
}

/// Result type for process operations
pub type Result<T> = std::result::Result<T, ProcessError>;
