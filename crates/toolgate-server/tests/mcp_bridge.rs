// crates/toolgate-server/tests/mcp_bridge.rs
// ============================================================================
// Module: MCP Bridge Integration Tests
// Description: End-to-end tests for the MCP bridge over the public API.
// Purpose: Ensure JSON-RPC wire shapes match the MCP method contract.
// Dependencies: toolgate-server, toolgate-core
// ============================================================================

//! ## Overview
//! Drives a full MCP exchange through the public payload API: initialize,
//! initialized notification, tools/list, and tools/call, asserting on the
//! serialized JSON-RPC envelopes.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use axum::http::StatusCode;
use serde_json::Value;
use serde_json::json;
use toolgate_core::RequestContext;
use toolgate_server::McpBridge;

use crate::common::sample_dispatcher;

fn sample_bridge() -> McpBridge {
    McpBridge::new(sample_dispatcher(), "toolgate", 1024 * 1024)
}

/// Sends one raw JSON-RPC payload and returns the serialized response.
async fn exchange(bridge: &McpBridge, payload: Value) -> Option<(StatusCode, Value)> {
    let bytes = payload.to_string().into_bytes();
    let request = match bridge.parse_payload(&bytes) {
        Ok(request) => request,
        Err((status, response)) => {
            let serialized = serde_json::to_value(&response).expect("serialize");
            return Some((status, serialized));
        }
    };
    let context = RequestContext::mcp_stdio();
    let (status, response) = bridge.handle_request(&context, request).await?;
    let serialized = serde_json::to_value(&response).expect("serialize");
    Some((status, serialized))
}

#[tokio::test]
async fn full_session_initializes_lists_and_calls() {
    let bridge = sample_bridge();

    let (status, init) = exchange(
        &bridge,
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}),
    )
    .await
    .expect("initialize response");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(init.get("jsonrpc"), Some(&json!("2.0")));
    assert_eq!(init.get("id"), Some(&json!(1)));
    assert_eq!(
        init.get("result").and_then(|result| result.get("protocolVersion")),
        Some(&json!("2024-11-05"))
    );

    let ack = exchange(
        &bridge,
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
    )
    .await;
    assert!(ack.is_none());

    let (_, listing) = exchange(
        &bridge,
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
    )
    .await
    .expect("list response");
    let tools = listing
        .get("result")
        .and_then(|result| result.get("tools"))
        .and_then(Value::as_array)
        .expect("tools");
    let names: Vec<&str> = tools
        .iter()
        .map(|tool| tool.get("name").and_then(Value::as_str).expect("name"))
        .collect();
    assert_eq!(names, vec!["echo", "who_am_i", "catalog_search"]);

    let (status, call) = exchange(
        &bridge,
        json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": {"name": "echo", "arguments": {"msg": "hi"}},
        }),
    )
    .await
    .expect("call response");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        call.get("result").and_then(|result| result.get("content")),
        Some(&json!([{"type": "text", "text": "hi!"}]))
    );
}

#[tokio::test]
async fn permissioned_tools_are_absent_and_denied() {
    let bridge = sample_bridge();
    let (_, listing) = exchange(
        &bridge,
        json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}),
    )
    .await
    .expect("list response");
    let tools = listing
        .get("result")
        .and_then(|result| result.get("tools"))
        .and_then(Value::as_array)
        .expect("tools");
    assert!(tools.iter().all(|tool| tool.get("name") != Some(&json!("add"))));

    let (status, denied) = exchange(
        &bridge,
        json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/call",
            "params": {"name": "add", "arguments": {"x": 1, "y": 2}},
        }),
    )
    .await
    .expect("denied response");
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        denied.get("error").and_then(|error| error.get("code")),
        Some(&json!(-32003))
    );
}

#[tokio::test]
async fn strict_argument_policy_matches_the_rest_bridge() {
    let bridge = sample_bridge();
    let (status, response) = exchange(
        &bridge,
        json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": {"name": "echo", "arguments": {"msg": "hi", "verbose": true}},
        }),
    )
    .await
    .expect("response");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = response.get("error").expect("error");
    assert_eq!(error.get("code"), Some(&json!(-32602)));
    let message = error.get("message").and_then(Value::as_str).expect("message");
    assert!(message.contains("verbose"));
}

#[tokio::test]
async fn adapted_tools_serve_over_mcp_with_defaults() {
    let bridge = sample_bridge();
    let (status, response) = exchange(
        &bridge,
        json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "tools/call",
            "params": {"name": "catalog_search", "arguments": {"query": "gears"}},
        }),
    )
    .await
    .expect("response");
    assert_eq!(status, StatusCode::OK);
    let text = response
        .get("result")
        .and_then(|result| result.get("content"))
        .and_then(Value::as_array)
        .and_then(|content| content[0].get("text"))
        .and_then(Value::as_str)
        .expect("text");
    let decoded: Value = serde_json::from_str(text).expect("decoded");
    assert_eq!(decoded, json!({"query": "gears", "limit": 3, "hits": []}));
}

#[tokio::test]
async fn malformed_payloads_yield_invalid_request() {
    let bridge = sample_bridge();
    let result = bridge.parse_payload(b"{not json");
    let (status, response) = match result {
        Err((status, response)) => {
            (status, serde_json::to_value(&response).expect("serialize"))
        }
        Ok(_) => panic!("expected parse failure"),
    };
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.get("error").and_then(|error| error.get("code")),
        Some(&json!(-32600))
    );
}

#[tokio::test]
async fn unknown_tools_yield_unknown_tool_errors() {
    let bridge = sample_bridge();
    let (status, response) = exchange(
        &bridge,
        json!({
            "jsonrpc": "2.0",
            "id": 6,
            "method": "tools/call",
            "params": {"name": "missing", "arguments": {}},
        }),
    )
    .await
    .expect("response");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.get("error").and_then(|error| error.get("message")),
        Some(&json!("unknown tool"))
    );
}
