//! MCP protocol handlers
//!
//! Newline-delimited JSON-RPC 2.0 over stdio. Requests are handled
//! concurrently; responses are written as each one completes. Lines that
//! fail to decode are answered in place and never end the session.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use rmcp::{
    handler::server::wrapper::Parameters,
    model::{CallToolResult, ErrorCode},
    ErrorData,
};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::response::{tool_annotations, tool_title};
use crate::server::RunboundMcp;
use crate::types::ExecuteToolInput;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INTERNAL_ERROR: i32 = -32603;

/// Serve requests from `reader` until EOF, writing responses to `writer`
pub async fn serve<R, W>(mcp: Arc<RunboundMcp>, mut reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    let mut in_flight: JoinSet<Option<Value>> = JoinSet::new();

    loop {
        tokio::select! {
            read = reader.read_until(b'\n', &mut buf) => {
                if read? == 0 {
                    debug!("stdin closed");
                    break;
                }
                let line = std::mem::take(&mut buf);
                match decode_line(&line) {
                    Incoming::Blank => {}
                    Incoming::Rejected(response) => write_response(&mut writer, &response).await?,
                    Incoming::Message(request) => {
                        let mcp = Arc::clone(&mcp);
                        let id = request.get("id").cloned();
                        in_flight.spawn(respond_or_internal_error(id, async move {
                            handle_mcp_request(&mcp, &request).await
                        }));
                    }
                }
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                write_joined(&mut writer, joined).await?;
            }
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        write_joined(&mut writer, joined).await?;
    }

    info!("MCP session closed");
    Ok(())
}

/// Serve on the process's stdin/stdout
pub async fn serve_stdio(mcp: RunboundMcp) -> Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve(Arc::new(mcp), stdin, stdout).await
}

/// One raw input line after framing checks
enum Incoming {
    Blank,
    /// Not JSON; answered without reaching a handler
    Rejected(Value),
    Message(Value),
}

fn decode_line(line: &[u8]) -> Incoming {
    let start = line
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(line.len());
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |last| last + 1);
    let line = &line[start..end];
    if line.is_empty() {
        return Incoming::Blank;
    }

    let parsed = std::str::from_utf8(line)
        .map_err(|err| err.to_string())
        .and_then(|text| serde_json::from_str::<Value>(text).map_err(|err| err.to_string()));

    match parsed {
        Ok(message) => Incoming::Message(message),
        Err(err) => {
            warn!(error = %err, "Malformed JSON-RPC message");
            Incoming::Rejected(error_response(Value::Null, PARSE_ERROR, "Parse error"))
        }
    }
}

/// Run `handler` on its own task so a panic still answers the request
async fn respond_or_internal_error<F>(id: Option<Value>, handler: F) -> Option<Value>
where
    F: Future<Output = Option<Value>> + Send + 'static,
{
    match tokio::spawn(handler).await {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, id = ?id, "Request handler failed");
            id.map(|id| error_response(id, INTERNAL_ERROR, "Internal error"))
        }
    }
}

async fn write_joined<W>(
    writer: &mut W,
    joined: std::result::Result<Option<Value>, tokio::task::JoinError>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    match joined {
        Ok(Some(response)) => write_response(writer, &response).await,
        Ok(None) => Ok(()),
        Err(err) => {
            warn!(error = %err, "Request task cancelled");
            Ok(())
        }
    }
}

async fn write_response<W>(writer: &mut W, response: &Value) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let response_str = serde_json::to_string(response)? + "\n";
    writer.write_all(response_str.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Handle one raw input line
///
/// Returns `None` for blank lines and notifications.
pub async fn handle_line(mcp: &RunboundMcp, line: &[u8]) -> Option<Value> {
    match decode_line(line) {
        Incoming::Blank => None,
        Incoming::Rejected(response) => Some(response),
        Incoming::Message(request) => handle_mcp_request(mcp, &request).await,
    }
}

/// Handles MCP JSON-RPC protocol requests
///
/// Supports:
/// - `initialize`: Server initialization and capability negotiation
/// - `ping`: Liveness check
/// - `tools/list`: List available tools with metadata
/// - `tools/call`: Execute a specific tool
///
/// Messages without an `id` are notifications and get no response. A
/// message that is not a JSON object is an invalid request.
pub async fn handle_mcp_request(mcp: &RunboundMcp, request: &Value) -> Option<Value> {
    if !request.is_object() {
        warn!("JSON-RPC message is not an object");
        return Some(error_response(Value::Null, INVALID_REQUEST, "Invalid Request"));
    }

    let method = request["method"].as_str().unwrap_or("");
    let Some(id) = request.get("id").cloned() else {
        debug!(method = %method, "Notification received");
        return None;
    };

    let response = match method {
        "initialize" => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {
                        "listChanged": false
                    }
                },
                "serverInfo": {
                    "name": "runbound",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }
        }),
        "ping" => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {}
        }),
        "tools/list" => {
            let tools = mcp
                .tool_router
                .list_all()
                .into_iter()
                .map(|tool| {
                    let name = tool.name.as_ref();
                    json!({
                        "name": name,
                        "title": tool_title(name),
                        "description": tool.description,
                        "inputSchema": tool.input_schema,
                        "annotations": tool_annotations(name)
                    })
                })
                .collect::<Vec<_>>();
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "tools": tools
                }
            })
        }
        "tools/call" => {
            let tool_name = request["params"]["name"].as_str().unwrap_or("");
            let arguments = request["params"]["arguments"].clone();
            let result = call_tool(mcp, tool_name, arguments)
                .await
                .and_then(|result| {
                    serde_json::to_value(result)
                        .map_err(|err| ErrorData::internal_error(err.to_string(), None))
                });
            match result {
                Ok(result) => json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": result
                }),
                Err(err) => error_response(id, err.code.0, &err.message),
            }
        }
        _ => error_response(id, METHOD_NOT_FOUND, "Method not found"),
    };

    Some(response)
}

/// Calls a specific tool by name with the provided arguments
pub async fn call_tool(
    mcp: &RunboundMcp,
    tool_name: &str,
    arguments: Value,
) -> std::result::Result<CallToolResult, ErrorData> {
    match tool_name {
        "execute" => {
            let input: ExecuteToolInput = serde_json::from_value(arguments).map_err(|err| {
                ErrorData::invalid_params(format!("Invalid arguments: {}", err), None)
            })?;
            mcp.execute(Parameters(input)).await
        }
        _ => Err(ErrorData::new(
            ErrorCode::INVALID_PARAMS,
            format!("Unknown tool: {}", tool_name),
            None,
        )),
    }
}

pub fn error_response(id: Value, code: i32, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message
        }
    })
}
