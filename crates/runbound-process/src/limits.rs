//! Execution limits: wall-clock timeout and per-stream output ceiling
//!
//! Caller values above the hard caps are clamped, never rejected. Zero is a
//! precondition failure.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProcessError, Result};

/// Timeout applied when the caller omits one (1 minute)
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Hard upper bound for any timeout (10 minutes)
pub const MAX_TIMEOUT_MS: u64 = 600_000;

/// Per-stream byte ceiling applied when the caller omits one
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 64_000;

/// Hard upper bound for the per-stream byte ceiling
pub const MAX_OUTPUT_BYTES: usize = 2_000_000;

/// Values used when a request leaves a limit unset
///
/// Loaded from configuration; always kept within the hard caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitDefaults {
    pub timeout_ms: u64,
    pub max_output_bytes: usize,
}

impl Default for LimitDefaults {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

/// Effective limits for one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    timeout: Duration,
    max_bytes_per_stream: usize,
}

impl Limits {
    /// Resolve caller-supplied limits against the built-in defaults
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use runbound_process::Limits;
    ///
    /// let limits = Limits::resolve(Some(999_999_999), None).unwrap();
    /// assert_eq!(limits.timeout(), Duration::from_millis(600_000));
    /// assert_eq!(limits.max_bytes_per_stream(), 64_000);
    /// ```
    pub fn resolve(timeout_ms: Option<u64>, max_output_bytes: Option<u64>) -> Result<Self> {
        Self::resolve_with(&LimitDefaults::default(), timeout_ms, max_output_bytes)
    }

    /// Resolve caller-supplied limits against explicit defaults
    pub fn resolve_with(
        defaults: &LimitDefaults,
        timeout_ms: Option<u64>,
        max_output_bytes: Option<u64>,
    ) -> Result<Self> {
        let timeout_ms = match timeout_ms {
            Some(0) => {
                return Err(ProcessError::InvalidLimits(
                    "timeout_ms must be a positive integer".to_string(),
                ))
            }
            Some(ms) => ms,
            None => defaults.timeout_ms,
        };

        let max_output_bytes = match max_output_bytes {
            Some(0) => {
                return Err(ProcessError::InvalidLimits(
                    "max_output_bytes must be a positive integer".to_string(),
                ))
            }
            Some(bytes) => usize::try_from(bytes).unwrap_or(usize::MAX),
            None => defaults.max_output_bytes,
        };

        let limits = Self::clamped(timeout_ms, max_output_bytes);
        debug!(
            timeout_ms = %limits.timeout.as_millis(),
            max_bytes_per_stream = %limits.max_bytes_per_stream,
            "Resolved execution limits"
        );
        Ok(limits)
    }

    fn clamped(timeout_ms: u64, max_output_bytes: usize) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms.clamp(1, MAX_TIMEOUT_MS)),
            max_bytes_per_stream: max_output_bytes.clamp(1, MAX_OUTPUT_BYTES),
        }
    }

    /// Wall-clock budget for the child
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Byte ceiling applied independently to stdout and stderr
    pub fn max_bytes_per_stream(&self) -> usize {
        self.max_bytes_per_stream
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::clamped(DEFAULT_TIMEOUT_MS, DEFAULT_MAX_OUTPUT_BYTES)
    }
}
