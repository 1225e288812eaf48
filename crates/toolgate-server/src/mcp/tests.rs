// crates/toolgate-server/src/mcp/tests.rs
// ============================================================================
// Module: MCP Bridge Unit Tests
// Description: Unit tests for JSON-RPC handling and error code mapping.
// Purpose: Validate the MCP method set against the shared dispatcher.
// Dependencies: toolgate-server, toolgate-core
// ============================================================================

//! ## Overview
//! Exercises initialize, tools/list, tools/call, notification handling, and
//! the JSON-RPC error code mapping, all against an in-memory registry with
//! the anonymous identity.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use toolgate_core::HandlerFailure;
use toolgate_core::NoopCallAudit;
use toolgate_core::ParamKind;
use toolgate_core::ToolRegistration;
use toolgate_core::ToolRegistry;
use toolgate_core::ToolSchema;
use toolgate_core::ToolVersion;
use toolgate_core::handler_fn;

use super::*;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn sample_bridge() -> McpBridge {
    let mut registry = ToolRegistry::new();
    registry
        .register(ToolRegistration {
            name: "echo".to_string(),
            description: "Echoes the message".to_string(),
            version: ToolVersion::initial(),
            schema: ToolSchema::builder()
                .required("msg", ParamKind::String)
                .build()
                .expect("schema"),
            permissions: BTreeSet::new(),
            handler: handler_fn(|arguments| {
                let msg = arguments
                    .get("msg")
                    .and_then(Value::as_str)
                    .ok_or_else(|| HandlerFailure::new("msg missing"))?;
                Ok(Value::String(format!("{msg}!")))
            }),
        })
        .expect("echo");
    registry
        .register(ToolRegistration {
            name: "stats".to_string(),
            description: "Returns structured stats".to_string(),
            version: ToolVersion::initial(),
            schema: ToolSchema::empty(),
            permissions: BTreeSet::new(),
            handler: handler_fn(|_arguments| Ok(json!({"calls": 7}))),
        })
        .expect("stats");
    registry
        .register(ToolRegistration {
            name: "gated".to_string(),
            description: "Requires a permission".to_string(),
            version: ToolVersion::initial(),
            schema: ToolSchema::empty(),
            permissions: ["group1".to_string()].into_iter().collect(),
            handler: handler_fn(|_arguments| Ok(Value::Null)),
        })
        .expect("gated");
    let dispatcher = Dispatcher::new(Arc::new(registry), Arc::new(NoopCallAudit));
    McpBridge::new(dispatcher, "toolgate", 1024 * 1024)
}

fn request(method: &str, id: Value, params: Option<Value>) -> JsonRpcRequest {
    JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        id,
        method: method.to_string(),
        params,
    }
}

fn stdio_context() -> RequestContext {
    RequestContext::mcp_stdio()
}

async fn respond(bridge: &McpBridge, request: JsonRpcRequest) -> (StatusCode, JsonRpcResponse) {
    bridge.handle_request(&stdio_context(), request).await.expect("response")
}

// ============================================================================
// SECTION: Session Methods
// ============================================================================

#[tokio::test]
async fn initialize_reports_protocol_and_server_info() {
    let bridge = sample_bridge();
    let (status, response) = respond(&bridge, request("initialize", json!(1), None)).await;
    assert_eq!(status, StatusCode::OK);
    let result = response.result.expect("result");
    assert_eq!(result.get("protocolVersion"), Some(&json!("2024-11-05")));
    assert_eq!(
        result.get("serverInfo").and_then(|info| info.get("name")),
        Some(&json!("toolgate"))
    );
}

#[tokio::test]
async fn initialized_notification_gets_no_response() {
    let bridge = sample_bridge();
    let outcome = bridge
        .handle_request(
            &stdio_context(),
            request("notifications/initialized", Value::Null, None),
        )
        .await;
    assert!(outcome.is_none());
}

#[tokio::test]
async fn wrong_jsonrpc_version_is_rejected() {
    let bridge = sample_bridge();
    let bad = JsonRpcRequest {
        jsonrpc: "1.0".to_string(),
        id: json!(5),
        method: "tools/list".to_string(),
        params: None,
    };
    let (status, response) =
        bridge.handle_request(&stdio_context(), bad).await.expect("response");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error.expect("error").code, -32600);
}

#[tokio::test]
async fn unknown_method_maps_to_method_not_found() {
    let bridge = sample_bridge();
    let (status, response) =
        respond(&bridge, request("tools/destroy", json!(2), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error.expect("error").code, -32601);
}

// ============================================================================
// SECTION: Tool Listing
// ============================================================================

#[tokio::test]
async fn tools_list_exposes_public_tools_with_input_schema() {
    let bridge = sample_bridge();
    let (status, response) = respond(&bridge, request("tools/list", json!(3), None)).await;
    assert_eq!(status, StatusCode::OK);
    let result = response.result.expect("result");
    let tools = result.get("tools").and_then(Value::as_array).expect("tools");
    let names: Vec<&str> = tools
        .iter()
        .map(|tool| tool.get("name").and_then(Value::as_str).expect("name"))
        .collect();
    assert_eq!(names, vec!["echo", "stats"]);
    let echo = &tools[0];
    assert!(echo.get("inputSchema").and_then(|schema| schema.get("properties")).is_some());
}

#[tokio::test]
async fn permissioned_tools_stay_hidden_from_mcp_sessions() {
    let bridge = sample_bridge();
    let (_, response) = respond(&bridge, request("tools/list", json!(4), None)).await;
    let result = response.result.expect("result");
    let tools = result.get("tools").and_then(Value::as_array).expect("tools");
    assert!(tools.iter().all(|tool| tool.get("name") != Some(&json!("gated"))));
}

// ============================================================================
// SECTION: Tool Calls
// ============================================================================

#[tokio::test]
async fn tools_call_returns_text_content() {
    let bridge = sample_bridge();
    let params = json!({"name": "echo", "arguments": {"msg": "hi"}});
    let (status, response) =
        respond(&bridge, request("tools/call", json!(5), Some(params))).await;
    assert_eq!(status, StatusCode::OK);
    let result = response.result.expect("result");
    let content = result.get("content").and_then(Value::as_array).expect("content");
    assert_eq!(content[0].get("type"), Some(&json!("text")));
    assert_eq!(content[0].get("text"), Some(&json!("hi!")));
}

#[tokio::test]
async fn structured_results_are_json_encoded_text() {
    let bridge = sample_bridge();
    let params = json!({"name": "stats", "arguments": {}});
    let (_, response) = respond(&bridge, request("tools/call", json!(6), Some(params))).await;
    let result = response.result.expect("result");
    let text = result
        .get("content")
        .and_then(Value::as_array)
        .and_then(|content| content[0].get("text"))
        .and_then(Value::as_str)
        .expect("text");
    let decoded: Value = serde_json::from_str(text).expect("decoded");
    assert_eq!(decoded, json!({"calls": 7}));
}

#[tokio::test]
async fn missing_params_are_invalid() {
    let bridge = sample_bridge();
    let (status, response) = respond(&bridge, request("tools/call", json!(7), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error.expect("error").code, -32602);
}

#[tokio::test]
async fn unknown_tool_maps_to_unknown_tool_error() {
    let bridge = sample_bridge();
    let params = json!({"name": "missing", "arguments": {}});
    let (status, response) =
        respond(&bridge, request("tools/call", json!(8), Some(params))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = response.error.expect("error");
    assert_eq!(error.code, -32601);
    assert_eq!(error.message, "unknown tool");
}

#[tokio::test]
async fn validation_failures_map_to_invalid_params() {
    let bridge = sample_bridge();
    let params = json!({"name": "echo", "arguments": {"msg": "hi", "extra": 1}});
    let (status, response) =
        respond(&bridge, request("tools/call", json!(9), Some(params))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = response.error.expect("error");
    assert_eq!(error.code, -32602);
    assert!(error.message.contains("extra"));
}

#[tokio::test]
async fn permissioned_tool_calls_are_unauthorized_over_mcp() {
    let bridge = sample_bridge();
    let params = json!({"name": "gated", "arguments": {}});
    let (status, response) =
        respond(&bridge, request("tools/call", json!(10), Some(params))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(response.error.expect("error").code, -32003);
}

#[tokio::test]
async fn absent_arguments_default_to_no_arguments() {
    let bridge = sample_bridge();
    let params = json!({"name": "stats"});
    let (status, response) =
        respond(&bridge, request("tools/call", json!(11), Some(params))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.result.is_some());
}

// ============================================================================
// SECTION: Payload Parsing
// ============================================================================

#[test]
fn oversized_payload_is_rejected() {
    let bridge = sample_bridge();
    let mut body = br#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#.to_vec();
    body.extend(std::iter::repeat_n(b' ', 2 * 1024 * 1024));
    let err = bridge.parse_payload(&body).unwrap_err();
    assert_eq!(err.0, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(err.1.error.expect("error").code, -32070);
}

#[test]
fn malformed_payload_is_rejected() {
    let bridge = sample_bridge();
    let err = bridge.parse_payload(b"{not json").unwrap_err();
    assert_eq!(err.0, StatusCode::BAD_REQUEST);
    assert_eq!(err.1.error.expect("error").code, -32600);
}

#[test]
fn well_formed_payload_parses() {
    let bridge = sample_bridge();
    let request = bridge
        .parse_payload(br#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#)
        .expect("request");
    assert_eq!(request.method, "tools/list");
    assert_eq!(request.id, json!(1));
}
