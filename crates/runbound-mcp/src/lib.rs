//! # runbound-mcp
//!
//! **Purpose**: MCP stdio server and CLI exposing bounded command execution
//!
//! Wraps [`runbound_process`] behind a single `execute` tool: the command line
//! runs through the host shell with a wall-clock timeout and a per-stream
//! output ceiling, and the whole process tree is torn down when either limit
//! is hit.
//!
//! ## Features
//!
//! - **Shell Selection**: `SHELL` (minus incompatible shells), configured override, OS fallback
//! - **Command Encoding**: `-c` for POSIX shells, `-EncodedCommand` for PowerShell
//! - **Layered Config**: defaults, TOML file, `RUNBOUND_` environment variables
//! - **JSON-RPC over stdio**: `initialize`, `ping`, `tools/list`, `tools/call`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use runbound_mcp::{CommandExecutor, ServerConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let executor = CommandExecutor::from_config(&ServerConfig::default());
//! let outcome = executor.execute("echo hello", None, Some(5_000), None).await?;
//! println!("{}", outcome.stdout);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod encoding;
pub mod error;
pub mod executor;
pub mod protocol;
pub mod response;
pub mod server;
pub mod shell;
pub mod types;

pub use config::{ConfigLoader, ServerConfig};
pub use encoding::{encode_command, encode_powershell};
pub use error::{ConfigError, ExecuteError};
pub use executor::CommandExecutor;
pub use protocol::{handle_mcp_request, serve, serve_stdio};
pub use server::RunboundMcp;
pub use shell::{Environment, ShellDetector, ShellInvocation, ShellKind};
pub use types::ExecuteToolInput;
