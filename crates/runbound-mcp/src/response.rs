//! MCP response helpers
//!
//! Tool metadata for `tools/list` and rendering of execution outcomes.

use rmcp::model::{CallToolResult, Content};
use runbound_process::ExecutionOutcome;

/// Get human-readable title for a tool
pub fn tool_title(name: &str) -> &'static str {
    match name {
        "execute" => "Bounded Command Runner",
        _ => "Runbound Tool",
    }
}

/// Get tool metadata annotations (safety, idempotency, destructiveness)
pub fn tool_annotations(name: &str) -> serde_json::Value {
    let (safe, idempotent, destructive) = match name {
        "execute" => (false, false, true),
        _ => (true, true, false),
    };
    serde_json::json!({
        "audience": ["user", "assistant"],
        "priority": 0.85,
        "safe": safe,
        "idempotent": idempotent,
        "destructive": destructive
    })
}

/// Human-readable rendering of an outcome
///
/// Output format:
/// ```text
/// <stdout>
/// ...
/// </stdout>
/// <stderr>
/// ...
/// </stderr>
/// <exec_metadata>
/// exit_code: 0
/// ...
/// </exec_metadata>
/// ```
///
/// Empty streams are omitted.
pub fn format_outcome(outcome: &ExecutionOutcome) -> String {
    let mut output = Vec::new();

    for (tag, text) in [("stdout", &outcome.stdout), ("stderr", &outcome.stderr)] {
        if text.is_empty() {
            continue;
        }
        output.push(format!("<{}>", tag));
        output.push(text.trim_end_matches('\n').to_string());
        output.push(format!("</{}>", tag));
    }

    output.push("<exec_metadata>".to_string());
    match outcome.exit_code {
        Some(code) => output.push(format!("exit_code: {}", code)),
        None => output.push("exit_code: none".to_string()),
    }
    if let Some(signal) = &outcome.signal {
        output.push(format!("signal: {}", signal));
    }
    output.push(format!("duration_ms: {}", outcome.duration_ms));
    if outcome.timed_out {
        output.push("timed_out: true (process tree terminated at deadline)".to_string());
    }
    if outcome.truncated {
        output.push("truncated: true (output exceeded max_output_bytes)".to_string());
    }
    if let Some(error) = &outcome.error {
        output.push(format!("error: {}", error));
    }
    output.push("</exec_metadata>".to_string());

    output.join("\n")
}

/// Tool result carrying both the text rendering and the raw outcome
pub fn outcome_result(outcome: &ExecutionOutcome) -> CallToolResult {
    let structured = serde_json::to_value(outcome).ok();
    CallToolResult {
        content: vec![Content::text(format_outcome(outcome))],
        is_error: Some(outcome.is_error()),
        meta: None,
        structured_content: structured,
    }
}
