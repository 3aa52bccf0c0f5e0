//! Error types for runbound-mcp

use runbound_process::ProcessError;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Hard failures of the `execute` operation
///
/// Raised before anything is spawned; every other failure is reported on
/// the outcome.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("Command cannot be empty")]
    EmptyCommand,

    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl ExecuteError {
    /// Whether the caller sent bad input (as opposed to a host problem)
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            ExecuteError::EmptyCommand
                | ExecuteError::Process(ProcessError::InvalidLimits(_))
                | ExecuteError::Process(ProcessError::InvalidSpawnSpec(_))
        )
    }
}
