//! Execution outcome and result assembly

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collector::OutputCollector;

/// Immutable record of one execution, handed back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Exit code (None = the process did not exit normally)
    pub exit_code: Option<i32>,
    /// Name of the terminating signal, e.g. `SIGKILL`
    pub signal: Option<String>,
    /// The wall-clock deadline fired before the process closed
    pub timed_out: bool,
    /// Either stream hit its byte ceiling
    pub truncated: bool,
    pub stdout: String,
    pub stderr: String,
    /// Spawn or mid-run failure description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock duration of the invocation in milliseconds
    pub duration_ms: u64,
}

impl ExecutionOutcome {
    /// Whether the outer protocol layer should mark the call as failed
    ///
    /// A missing exit code without timeout, truncation or error means the
    /// process was ended by an outside signal; that case is not an error.
    pub fn is_error(&self) -> bool {
        if self.timed_out || self.truncated || self.error.is_some() {
            return true;
        }
        matches!(self.exit_code, Some(code) if code != 0)
    }
}

/// Exit data captured when the deadline race settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledRun {
    pub exit_code: Option<i32>,
    pub signal: Option<String>,
    pub timed_out: bool,
    pub error: Option<String>,
    pub duration: Duration,
}

impl SettledRun {
    /// The child never started
    pub fn spawn_failed(error: impl Into<String>, duration: Duration) -> Self {
        Self {
            exit_code: None,
            signal: None,
            timed_out: false,
            error: Some(error.into()),
            duration,
        }
    }
}

/// Builds the final [`ExecutionOutcome`]
pub struct ResultAssembler;

impl ResultAssembler {
    /// Combine the settled exit data with both finalized streams
    pub fn assemble(
        run: SettledRun,
        stdout: OutputCollector,
        stderr: OutputCollector,
    ) -> ExecutionOutcome {
        let stdout = stdout.finalize();
        let stderr = stderr.finalize();

        ExecutionOutcome {
            exit_code: run.exit_code,
            signal: run.signal,
            timed_out: run.timed_out,
            truncated: stdout.truncated || stderr.truncated,
            stdout: stdout.text,
            stderr: stderr.text,
            error: run.error,
            duration_ms: u64::try_from(run.duration.as_millis()).unwrap_or(u64::MAX),
        }
    }
}
