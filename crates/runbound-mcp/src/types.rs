//! MCP tool input types

use schemars::JsonSchema;

#[derive(Debug, Clone, serde::Deserialize, JsonSchema)]
pub struct ExecuteToolInput {
    /// Command line, run through the host shell
    pub command: String,
    /// Working directory; defaults to the server's own
    pub cwd: Option<String>,
    /// Wall-clock timeout in milliseconds (default 60000, capped at 600000)
    pub timeout_ms: Option<u64>,
    /// Byte ceiling applied to stdout and stderr independently (default 64000, capped at 2000000)
    pub max_output_bytes: Option<u64>,
}
