// crates/toolgate-server/src/mcp.rs
// ============================================================================
// Module: MCP Bridge
// Description: MCP JSON-RPC 2.0 endpoints over the tool dispatcher.
// Purpose: Drive the same registry from MCP sessions without business logic.
// Dependencies: toolgate-core, axum, tokio-stream
// ============================================================================

//! ## Overview
//! The MCP bridge implements `initialize`, `notifications/initialized`,
//! `tools/list`, and `tools/call` over JSON-RPC 2.0. It shares the dispatcher
//! with the REST bridge; only the wire format differs. MCP mode carries no
//! authentication (the server rejects the combination at startup), so every
//! MCP caller resolves to the anonymous identity and sees only public tools.
//! The strict argument policy is identical to REST.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::ConnectInfo;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Sse;
use axum::response::sse::Event;
use axum::routing::get;
use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use tokio_stream::wrappers::ReceiverStream;
use toolgate_core::CallOutcome;
use toolgate_core::Dispatcher;
use toolgate_core::Identity;
use toolgate_core::RequestContext;
use toolgate_core::TransportKind;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// MCP protocol version advertised by `initialize`.
const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Incoming JSON-RPC request payload.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    jsonrpc: String,
    /// Request identifier; absent for notifications.
    #[serde(default)]
    id: Value,
    /// Method name.
    method: String,
    /// Optional parameters payload.
    params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    jsonrpc: &'static str,
    /// Request identifier.
    id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Builds a success response.
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error response.
    fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// JSON-RPC error payload.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    /// Error code.
    code: i64,
    /// Human-readable error message.
    message: String,
}

/// Tool call parameters for JSON-RPC requests.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Raw JSON arguments; absent means no arguments.
    #[serde(default)]
    arguments: Value,
}

/// Tool descriptor returned by `tools/list`.
#[derive(Debug, Serialize)]
struct McpToolDescriptor {
    /// Tool name.
    name: String,
    /// Human-readable description.
    description: String,
    /// Caller-visible JSON Schema for arguments.
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

/// Tool list response payload.
#[derive(Debug, Serialize)]
struct ToolListResult {
    /// Visible tool descriptors.
    tools: Vec<McpToolDescriptor>,
}

/// Tool call response payload.
#[derive(Debug, Serialize)]
struct ToolCallResult {
    /// Tool output content.
    content: Vec<ToolContent>,
}

/// Tool output payloads for JSON-RPC responses.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ToolContent {
    /// Text content carrying the JSON-encoded tool result.
    Text {
        /// Encoded result text.
        text: String,
    },
}

// ============================================================================
// SECTION: Bridge
// ============================================================================

/// MCP bridge over the shared dispatcher.
pub struct McpBridge {
    /// Dispatcher shared with other bridges.
    dispatcher: Dispatcher,
    /// Advertised server name for `initialize`.
    server_name: String,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
}

impl McpBridge {
    /// Creates an MCP bridge.
    #[must_use]
    pub fn new(
        dispatcher: Dispatcher,
        server_name: impl Into<String>,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            dispatcher,
            server_name: server_name.into(),
            max_body_bytes,
        }
    }

    /// Builds the axum router for the HTTP transport.
    #[must_use]
    pub fn http_router(self: Arc<Self>) -> Router {
        Router::new().route("/mcp", get(handle_capabilities).post(handle_http)).with_state(self)
    }

    /// Builds the axum router for the SSE transport.
    #[must_use]
    pub fn sse_router(self: Arc<Self>) -> Router {
        Router::new().route("/mcp", get(handle_capabilities).post(handle_sse)).with_state(self)
    }

    /// Parses and bounds-checks a raw JSON-RPC payload.
    ///
    /// # Errors
    ///
    /// Returns a ready-to-send error response when the payload is oversized
    /// or not a JSON-RPC request.
    pub fn parse_payload(
        &self,
        bytes: &[u8],
    ) -> Result<JsonRpcRequest, (StatusCode, JsonRpcResponse)> {
        if bytes.len() > self.max_body_bytes {
            return Err((
                StatusCode::PAYLOAD_TOO_LARGE,
                JsonRpcResponse::failure(Value::Null, -32070, "request body too large"),
            ));
        }
        serde_json::from_slice::<JsonRpcRequest>(bytes).map_err(|_| {
            (
                StatusCode::BAD_REQUEST,
                JsonRpcResponse::failure(Value::Null, -32600, "invalid json-rpc request"),
            )
        })
    }

    /// Dispatches one JSON-RPC request.
    ///
    /// Returns `None` for notifications, which receive no response body.
    pub async fn handle_request(
        &self,
        base_context: &RequestContext,
        request: JsonRpcRequest,
    ) -> Option<(StatusCode, JsonRpcResponse)> {
        if request.jsonrpc != "2.0" {
            return Some((
                StatusCode::BAD_REQUEST,
                JsonRpcResponse::failure(request.id, -32600, "invalid json-rpc version"),
            ));
        }
        let context = match request.id {
            Value::Null => base_context.clone(),
            ref id => base_context.clone().with_request_id(id.to_string()),
        };
        match request.method.as_str() {
            "initialize" => Some((
                StatusCode::OK,
                JsonRpcResponse::success(request.id, self.initialize_result()),
            )),
            "notifications/initialized" => None,
            "tools/list" => Some(self.handle_tools_list(request.id)),
            "tools/call" => Some(self.handle_tools_call(request.id, request.params, &context).await),
            _ => Some((
                StatusCode::BAD_REQUEST,
                JsonRpcResponse::failure(request.id, -32601, "method not found"),
            )),
        }
    }

    /// Builds the `initialize` result payload.
    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {"tools": {}},
            "serverInfo": {
                "name": self.server_name,
                "version": env!("CARGO_PKG_VERSION"),
            },
        })
    }

    /// Handles `tools/list` for the anonymous identity.
    fn handle_tools_list(&self, id: Value) -> (StatusCode, JsonRpcResponse) {
        let identity = Identity::anonymous();
        let tools: Vec<McpToolDescriptor> = self
            .dispatcher
            .visible_tools(&identity)
            .into_iter()
            .map(|spec| McpToolDescriptor {
                name: spec.name().to_string(),
                description: spec.description().to_string(),
                input_schema: spec.input_schema(),
            })
            .collect();
        match serde_json::to_value(ToolListResult {
            tools,
        }) {
            Ok(result) => (StatusCode::OK, JsonRpcResponse::success(id, result)),
            Err(_) => {
                (StatusCode::OK, JsonRpcResponse::failure(id, -32060, "serialization failed"))
            }
        }
    }

    /// Handles `tools/call` for the anonymous identity.
    async fn handle_tools_call(
        &self,
        id: Value,
        params: Option<Value>,
        context: &RequestContext,
    ) -> (StatusCode, JsonRpcResponse) {
        let params = params.unwrap_or(Value::Null);
        let Ok(call) = serde_json::from_value::<ToolCallParams>(params) else {
            return (
                StatusCode::BAD_REQUEST,
                JsonRpcResponse::failure(id, -32602, "invalid tool params"),
            );
        };
        let identity = Identity::anonymous();
        let outcome = self.dispatcher.call(&call.name, call.arguments, &identity, context).await;
        match outcome {
            CallOutcome::Success(value) => {
                let result = ToolCallResult {
                    content: vec![ToolContent::Text {
                        text: content_text(value),
                    }],
                };
                match serde_json::to_value(result) {
                    Ok(payload) => (StatusCode::OK, JsonRpcResponse::success(id, payload)),
                    Err(_) => (
                        StatusCode::OK,
                        JsonRpcResponse::failure(id, -32060, "serialization failed"),
                    ),
                }
            }
            failure => jsonrpc_error(id, &failure),
        }
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Axum handler for `GET /mcp`: capability discovery.
async fn handle_capabilities() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "jsonrpc": "2.0",
            "result": {"capabilities": {"tools": {}}},
        })),
    )
}

/// Axum handler for HTTP JSON-RPC requests.
async fn handle_http(
    State(bridge): State<Arc<McpBridge>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    bytes: Bytes,
) -> (StatusCode, Json<JsonRpcResponse>) {
    let context = RequestContext::mcp(TransportKind::McpHttp, Some(peer.ip()));
    let (status, response) = process_payload(&bridge, &context, &bytes).await;
    (status, Json(response))
}

/// Axum handler for SSE JSON-RPC requests.
async fn handle_sse(
    State(bridge): State<Arc<McpBridge>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    bytes: Bytes,
) -> impl IntoResponse {
    let context = RequestContext::mcp(TransportKind::McpSse, Some(peer.ip()));
    let (_, response) = process_payload(&bridge, &context, &bytes).await;
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Event, Infallible>>(1);
    let payload = serde_json::to_string(&response).unwrap_or_else(|_| {
        "{\"jsonrpc\":\"2.0\",\"id\":null,\"error\":{\"code\":-32060,\"message\":\"serialization \
         failed\"}}"
            .to_string()
    });
    let _ = tx.send(Ok(Event::default().data(payload))).await;
    Sse::new(ReceiverStream::new(rx))
}

/// Parses and dispatches one payload, acknowledging notifications.
async fn process_payload(
    bridge: &McpBridge,
    context: &RequestContext,
    bytes: &[u8],
) -> (StatusCode, JsonRpcResponse) {
    let request = match bridge.parse_payload(bytes) {
        Ok(request) => request,
        Err(response) => return response,
    };
    match bridge.handle_request(context, request).await {
        Some(response) => response,
        // Notifications receive a bare acknowledgement envelope.
        None => (StatusCode::OK, JsonRpcResponse::success(Value::Null, Value::Null)),
    }
}

// ============================================================================
// SECTION: Response Mapping
// ============================================================================

/// Encodes a tool result as MCP text content.
fn content_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

/// Builds a JSON-RPC error response for a failed outcome.
fn jsonrpc_error(id: Value, outcome: &CallOutcome) -> (StatusCode, JsonRpcResponse) {
    let (status, code, message) = match outcome {
        CallOutcome::NotFound => {
            (StatusCode::BAD_REQUEST, -32601, "unknown tool".to_string())
        }
        CallOutcome::AuthorizationDenied {
            ..
        } => (StatusCode::FORBIDDEN, -32003, "unauthorized".to_string()),
        CallOutcome::ValidationError {
            errors,
        } => (StatusCode::BAD_REQUEST, -32602, CallOutcome::validation_detail(errors)),
        CallOutcome::ExecutionError {
            detail,
            ..
        } => (StatusCode::OK, -32603, detail.clone()),
        CallOutcome::Success(_) => {
            (StatusCode::OK, -32050, "unexpected success in error path".to_string())
        }
    };
    (status, JsonRpcResponse::failure(id, code, message))
}

#[cfg(test)]
mod tests;
