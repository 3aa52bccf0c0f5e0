//! MCP server exposing the `execute` tool

use std::path::Path;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData, ServerHandler,
};
use tracing::warn;

use crate::executor::CommandExecutor;
use crate::response;
use crate::types::ExecuteToolInput;

#[derive(Debug)]
pub struct RunboundMcp {
    executor: CommandExecutor,
    pub tool_router: ToolRouter<RunboundMcp>,
}

impl RunboundMcp {
    pub fn new(executor: CommandExecutor) -> Self {
        Self {
            executor,
            tool_router: Self::tool_router(),
        }
    }

    pub fn executor(&self) -> &CommandExecutor {
        &self.executor
    }
}

#[tool_router]
impl RunboundMcp {
    #[tool(
        name = "execute",
        description = "Run a shell command with a wall-clock timeout and a per-stream output ceiling. Returns stdout, stderr, exit code and flags for timeout and truncation. On timeout or truncation the whole process tree is terminated, including background children."
    )]
    pub async fn execute(
        &self,
        Parameters(input): Parameters<ExecuteToolInput>,
    ) -> Result<CallToolResult, ErrorData> {
        let cwd = input.cwd.as_deref().map(Path::new);
        let outcome = self
            .executor
            .execute(&input.command, cwd, input.timeout_ms, input.max_output_bytes)
            .await
            .map_err(|err| {
                if err.is_invalid_input() {
                    ErrorData::invalid_params(err.to_string(), None)
                } else {
                    warn!(error = %err, "execute failed");
                    ErrorData::internal_error(err.to_string(), None)
                }
            })?;

        Ok(response::outcome_result(&outcome))
    }
}

#[tool_handler]
impl ServerHandler for RunboundMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
