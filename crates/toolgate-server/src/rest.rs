// crates/toolgate-server/src/rest.rs
// ============================================================================
// Module: REST Bridge
// Description: Stateless REST endpoints over the tool dispatcher.
// Purpose: Translate HTTP requests into dispatch calls and back.
// Dependencies: toolgate-core, axum
// ============================================================================

//! ## Overview
//! The REST bridge exposes `GET /tools` and `POST /tools/{name}` plus the
//! `/health` and `/info` utility routes. Each request resolves its identity
//! through the auth gate exactly once, then delegates to the dispatcher.
//! Outcome mapping: success is `200 {"result": ...}`; failures are
//! `{"error": {"kind", "detail"}}` with 403/400/404/500 per outcome tag.
//! Handler logic lives in plain functions returning `(StatusCode, Value)` so
//! the mapping is testable without a socket.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::IpAddr;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::ConnectInfo;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::routing::get;
use axum::routing::post;
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use toolgate_core::CallOutcome;
use toolgate_core::Dispatcher;
use toolgate_core::RequestContext;
use toolgate_core::ToolSpec;

use crate::auth::AuthFailure;
use crate::auth::AuthGate;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Optional client-supplied request identifier header.
const REQUEST_ID_HEADER: &str = "x-request-id";
/// Maximum accepted request identifier length.
const MAX_REQUEST_ID_LENGTH: usize = 128;

// ============================================================================
// SECTION: Bridge
// ============================================================================

/// REST bridge over the dispatcher and auth gate.
pub struct RestBridge {
    /// Dispatcher shared with other bridges.
    dispatcher: Dispatcher,
    /// Auth gate resolving one identity per request.
    gate: Arc<AuthGate>,
    /// Advertised server name for `/info`.
    server_name: String,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
}

/// Tool descriptor returned by the listing endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    /// Tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Normalized tool version.
    pub version: String,
    /// Caller-visible JSON Schema for arguments.
    pub input_schema: Value,
    /// Permissions required to call the tool.
    pub required_permissions: Vec<String>,
}

impl ToolDescriptor {
    /// Builds a descriptor from a registered spec.
    fn from_spec(spec: &ToolSpec) -> Self {
        Self {
            name: spec.name().to_string(),
            description: spec.description().to_string(),
            version: spec.version().to_string(),
            input_schema: spec.input_schema(),
            required_permissions: spec.permissions().iter().cloned().collect(),
        }
    }
}

impl RestBridge {
    /// Creates a REST bridge.
    #[must_use]
    pub fn new(
        dispatcher: Dispatcher,
        gate: Arc<AuthGate>,
        server_name: impl Into<String>,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            dispatcher,
            gate,
            server_name: server_name.into(),
            max_body_bytes,
        }
    }

    /// Builds the axum router for this bridge.
    #[must_use]
    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/tools", get(handle_list))
            .route("/tools/{name}", post(handle_call))
            .route("/health", get(handle_health))
            .route("/info", get(handle_info))
            .with_state(self)
    }

    /// Handles `GET /tools`: lists tools visible to the caller.
    pub async fn list_tools(
        &self,
        peer: Option<IpAddr>,
        headers: &HeaderMap,
    ) -> (StatusCode, Value) {
        let context = request_context(peer, headers);
        let identity = match self.gate.resolve(&context, headers, &[]).await {
            Ok(identity) => identity,
            Err(failure) => return auth_failure_response(&failure),
        };
        let descriptors: Vec<ToolDescriptor> = self
            .dispatcher
            .visible_tools(&identity)
            .into_iter()
            .map(ToolDescriptor::from_spec)
            .collect();
        match serde_json::to_value(descriptors) {
            Ok(payload) => (StatusCode::OK, payload),
            Err(_) => serialization_failure_response(),
        }
    }

    /// Handles `POST /tools/{name}`: dispatches one tool call.
    pub async fn call_tool(
        &self,
        name: &str,
        peer: Option<IpAddr>,
        headers: &HeaderMap,
        body: &Bytes,
    ) -> (StatusCode, Value) {
        if body.len() > self.max_body_bytes {
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                error_body("payload_too_large", "request body too large"),
            );
        }
        let context = request_context(peer, headers);
        let identity = match self.gate.resolve(&context, headers, body).await {
            Ok(identity) => identity,
            Err(failure) => return auth_failure_response(&failure),
        };
        let arguments = if body.is_empty() {
            Value::Null
        } else {
            match serde_json::from_slice::<Value>(body) {
                Ok(value) => value,
                Err(_) => {
                    return (
                        StatusCode::BAD_REQUEST,
                        error_body("validation_error", "request body is not valid JSON"),
                    );
                }
            }
        };
        let outcome = self.dispatcher.call(name, arguments, &identity, &context).await;
        outcome_response(outcome)
    }

    /// Handles `GET /info`.
    #[must_use]
    pub fn info(&self) -> Value {
        json!({
            "name": self.server_name,
            "version": env!("CARGO_PKG_VERSION"),
        })
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Axum handler for `GET /tools`.
async fn handle_list(
    State(bridge): State<Arc<RestBridge>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    let (status, payload) = bridge.list_tools(Some(peer.ip()), &headers).await;
    (status, Json(payload))
}

/// Axum handler for `POST /tools/{name}`.
async fn handle_call(
    State(bridge): State<Arc<RestBridge>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let (status, payload) = bridge.call_tool(&name, Some(peer.ip()), &headers, &body).await;
    (status, Json(payload))
}

/// Axum handler for `GET /health`.
async fn handle_health() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({"status": "OK"})))
}

/// Axum handler for `GET /info`.
async fn handle_info(State(bridge): State<Arc<RestBridge>>) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(bridge.info()))
}

// ============================================================================
// SECTION: Response Mapping
// ============================================================================

/// Maps a dispatch outcome onto an HTTP response.
fn outcome_response(outcome: CallOutcome) -> (StatusCode, Value) {
    match outcome {
        CallOutcome::Success(value) => (StatusCode::OK, json!({"result": value})),
        CallOutcome::AuthorizationDenied {
            detail,
        } => (StatusCode::FORBIDDEN, error_body("authorization_denied", &detail)),
        CallOutcome::ValidationError {
            errors,
        } => (
            StatusCode::BAD_REQUEST,
            error_body("validation_error", &CallOutcome::validation_detail(&errors)),
        ),
        CallOutcome::NotFound => {
            (StatusCode::NOT_FOUND, error_body("not_found", "tool not found"))
        }
        CallOutcome::ExecutionError {
            detail,
            can_retry,
            retry_after_ms,
        } => {
            let mut body = error_body("execution_error", &detail);
            if can_retry
                && let Some(error) = body.get_mut("error").and_then(Value::as_object_mut)
            {
                error.insert("can_retry".to_string(), json!(true));
                if let Some(delay) = retry_after_ms {
                    error.insert("retry_after_ms".to_string(), json!(delay));
                }
            }
            (StatusCode::INTERNAL_SERVER_ERROR, body)
        }
    }
}

/// Maps an auth gate failure onto an HTTP response.
fn auth_failure_response(failure: &AuthFailure) -> (StatusCode, Value) {
    let status = StatusCode::from_u16(failure.status).unwrap_or(StatusCode::FORBIDDEN);
    (status, error_body("authorization_failure", &failure.detail))
}

/// Response used when descriptor serialization fails.
fn serialization_failure_response() -> (StatusCode, Value) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        error_body("execution_error", "serialization failed"),
    )
}

/// Builds the error envelope shared by all failure responses.
fn error_body(kind: &'static str, detail: &str) -> Value {
    json!({
        "error": {
            "kind": kind,
            "detail": detail,
        }
    })
}

/// Builds the per-request context, honoring a sanitized request id header.
fn request_context(peer: Option<IpAddr>, headers: &HeaderMap) -> RequestContext {
    let context = RequestContext::rest(peer);
    match sanitized_request_id(headers) {
        Some(request_id) => context.with_request_id(request_id),
        None => context,
    }
}

/// Extracts a client request id when it is short and printable.
fn sanitized_request_id(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?;
    if value.is_empty() || value.len() > MAX_REQUEST_ID_LENGTH {
        return None;
    }
    if !value.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_') {
        return None;
    }
    Some(value.to_string())
}
