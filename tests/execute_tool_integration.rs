//! Integration Test Suite: `execute` tool from configuration to process teardown
//!
//! Exercises the MCP server, the command executor and the process supervisor
//! together against real shells.

#![cfg(unix)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use runbound_mcp::{
    handle_mcp_request, CommandExecutor, ConfigLoader, RunboundMcp, ServerConfig, ShellInvocation,
};
use runbound_process::{LimitDefaults, MAX_OUTPUT_BYTES};
use serde_json::{json, Value};
use tempfile::TempDir;

fn mcp() -> Arc<RunboundMcp> {
    Arc::new(RunboundMcp::new(CommandExecutor::new(
        ShellInvocation::new("/bin/sh"),
        LimitDefaults::default(),
    )))
}

fn call(id: u64, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": "execute", "arguments": arguments}
    })
}

fn pid_alive(pid: i32) -> bool {
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .map(|state| state != "Z" && state != "X")
            .unwrap_or(false),
        Err(_) => false,
    }
}

async fn eventually_gone(pid: i32) -> bool {
    for _ in 0..40 {
        if !pid_alive(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_concurrent_calls_do_not_share_output() {
    let server = mcp();

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let server = Arc::clone(&server);
            tokio::spawn(async move {
                let command = format!("sleep 0.{}; echo out-{i}; echo err-{i} >&2; exit {i}", 6 - i);
                let response = handle_mcp_request(&server, &call(i, json!({"command": command})))
                    .await
                    .unwrap();
                (i, response)
            })
        })
        .collect();

    for handle in handles {
        let (i, response) = handle.await.unwrap();
        let outcome = &response["result"]["structuredContent"];
        assert_eq!(response["id"], i);
        assert_eq!(outcome["stdout"], format!("out-{i}\n"));
        assert_eq!(outcome["stderr"], format!("err-{i}\n"));
        assert_eq!(outcome["exit_code"], i);
        assert_eq!(response["result"]["isError"], i != 0);
    }
}

#[tokio::test]
async fn test_timeout_tears_down_whole_tree() {
    let started = Instant::now();
    let response = handle_mcp_request(
        &mcp(),
        &call(
            1,
            json!({
                "command": "sleep 60 & echo $!; sh -c 'sleep 60' & echo $!; wait",
                "timeout_ms": 300
            }),
        ),
    )
    .await
    .unwrap();

    let outcome = &response["result"]["structuredContent"];
    assert_eq!(outcome["timed_out"], true);
    assert_eq!(outcome["exit_code"], Value::Null);
    assert!(started.elapsed() < Duration::from_secs(5));

    let pids: Vec<i32> = outcome["stdout"]
        .as_str()
        .unwrap()
        .lines()
        .map(|line| line.trim().parse().unwrap())
        .collect();
    assert_eq!(pids.len(), 2);
    for pid in pids {
        assert!(eventually_gone(pid).await, "pid {pid} survived the deadline");
    }
}

#[tokio::test]
async fn test_both_streams_capped_independently() {
    let response = handle_mcp_request(
        &mcp(),
        &call(
            2,
            json!({
                "command": "head -c 5000 /dev/zero | tr '\\0' a; head -c 10 /dev/zero | tr '\\0' b >&2",
                "max_output_bytes": 100
            }),
        ),
    )
    .await
    .unwrap();

    let outcome = &response["result"]["structuredContent"];
    assert_eq!(outcome["truncated"], true);
    assert_eq!(outcome["stdout"].as_str().unwrap(), "a".repeat(100));
    assert_eq!(outcome["stderr"].as_str().unwrap(), "b".repeat(10));
    assert_eq!(response["result"]["isError"], true);
}

#[tokio::test]
async fn test_oversized_output_limit_is_clamped() {
    let response = handle_mcp_request(
        &mcp(),
        &call(
            3,
            json!({
                "command": format!("head -c {} /dev/zero | tr '\\0' x", MAX_OUTPUT_BYTES + 1000),
                "max_output_bytes": u64::MAX
            }),
        ),
    )
    .await
    .unwrap();

    let outcome = &response["result"]["structuredContent"];
    assert_eq!(outcome["truncated"], true);
    assert_eq!(outcome["stdout"].as_str().unwrap().len(), MAX_OUTPUT_BYTES);
}

#[tokio::test]
async fn test_configured_defaults_flow_into_execution() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "shell = \"/bin/sh\"\ndefault_timeout_ms = 250\ndefault_max_output_bytes = 8\n",
    )
    .unwrap();

    let config: ServerConfig = ConfigLoader::with_path(&path)
        .with_env_prefix("RUNBOUND_ROOT_IT")
        .load()
        .unwrap();
    let executor = CommandExecutor::from_config(&config);

    let truncated = executor
        .execute("echo 0123456789abcdef", None, None, None)
        .await
        .unwrap();
    assert_eq!(truncated.stdout, "01234567");
    assert!(truncated.truncated);

    let timed_out = executor.execute("sleep 5", None, None, None).await.unwrap();
    assert!(timed_out.timed_out);
    assert!(timed_out.duration_ms < 5_000);
}

#[tokio::test]
async fn test_cwd_is_respected() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("marker.txt"), "here").unwrap();

    let response = handle_mcp_request(
        &mcp(),
        &call(
            4,
            json!({"command": "cat marker.txt", "cwd": dir.path().to_string_lossy()}),
        ),
    )
    .await
    .unwrap();

    assert_eq!(response["result"]["structuredContent"]["stdout"], "here");
    assert_eq!(response["result"]["isError"], false);
}
