//! # runbound-process
//!
//! **Purpose**: Bounded process execution for Runbound
//!
//! Spawns one command, captures stdout and stderr under a per-stream byte
//! ceiling, races the process against a wall-clock deadline and tears down
//! the whole process tree when the run times out or its output is cut.
//!
//! ## Features
//!
//! - **Bounded Capture**: Per-stream byte ceilings with truncation flags
//! - **Deadline Race**: Natural exit versus timeout, settled exactly once
//! - **Process Tree Kill**: Process groups on Unix, task trees on Windows
//! - **Structured Outcome**: Exit code, signal, timeout and truncation as data
//!
//! ## Usage
//!
//! ```rust,no_run
//! use runbound_process::{Limits, ProcessSupervisor, SpawnSpec};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let supervisor = ProcessSupervisor::new();
//!
//! let spec = SpawnSpec::new("sh").args(["-c", "ls -la"]);
//! let limits = Limits::resolve(Some(5_000), Some(4_096))?;
//!
//! let outcome = supervisor.run(spec, limits).await?;
//! if outcome.is_error() {
//!     eprintln!("command failed: {:?}", outcome.exit_code);
//! }
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod error;
pub mod limits;
pub mod outcome;
pub mod spec;
pub mod supervisor;
pub mod terminator;

pub use collector::{CollectedStream, OutputCollector, StreamKind};
pub use error::{ProcessError, Result};
pub use limits::{
    LimitDefaults, Limits, DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_TIMEOUT_MS, MAX_OUTPUT_BYTES,
    MAX_TIMEOUT_MS,
};
pub use outcome::{ExecutionOutcome, ResultAssembler, SettledRun};
pub use spec::SpawnSpec;
pub use supervisor::{ProcessSupervisor, RunState};
pub use terminator::{ProcessTreeTerminator, TreeTerminator};
