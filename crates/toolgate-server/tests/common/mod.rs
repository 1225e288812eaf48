// crates/toolgate-server/tests/common/mod.rs
// ============================================================================
// Module: Integration Test Fixtures
// Description: Shared registry, dispatcher, and authenticator fixtures.
// Purpose: Keep bridge integration tests focused on wire behavior.
// Dependencies: toolgate-server, toolgate-core
// ============================================================================

//! ## Overview
//! Builds the shared tool set used by the bridge integration tests: a public
//! echo tool, a permission-gated adder, an injected-request identity tool,
//! and an adapted third-party search tool.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    dead_code,
    reason = "Test-only fixtures; not every test uses every helper."
)]

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;
use toolgate_core::AdaptedTool;
use toolgate_core::Dispatcher;
use toolgate_core::HandlerFailure;
use toolgate_core::Identity;
use toolgate_core::NoopCallAudit;
use toolgate_core::ParamKind;
use toolgate_core::ToolRegistration;
use toolgate_core::ToolRegistry;
use toolgate_core::ToolSchema;
use toolgate_core::ToolVersion;
use toolgate_core::handler_async;
use toolgate_core::handler_fn;
use toolgate_server::AuthError;
use toolgate_server::AuthFailure;
use toolgate_server::AuthGate;
use toolgate_server::AuthInput;
use toolgate_server::AuthRequest;
use toolgate_server::Authenticator;
use toolgate_server::NoopAuditSink;

/// Adapted third-party tool used by both bridges.
pub struct CatalogSearch;

#[async_trait]
impl AdaptedTool for CatalogSearch {
    fn name(&self) -> &str {
        "catalog_search"
    }

    fn description(&self) -> &str {
        "Searches the catalog"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "limit": {"type": "integer", "default": 3},
            },
            "required": ["query"],
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, HandlerFailure> {
        let query = arguments
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| HandlerFailure::new("query missing"))?;
        let limit = arguments.get("limit").and_then(Value::as_i64).unwrap_or(0);
        Ok(json!({"query": query, "limit": limit, "hits": []}))
    }
}

/// Builds the shared tool registry.
pub fn sample_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry
        .register(ToolRegistration {
            name: "echo".to_string(),
            description: "Echoes the message".to_string(),
            version: ToolVersion::initial(),
            schema: ToolSchema::builder()
                .required("msg", ParamKind::String)
                .build()
                .expect("echo schema"),
            permissions: BTreeSet::new(),
            handler: handler_async(|arguments| async move {
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
            name: "add".to_string(),
            description: "Adds two integers".to_string(),
            version: ToolVersion::initial(),
            schema: ToolSchema::builder()
                .required("x", ParamKind::Integer)
                .required("y", ParamKind::Integer)
                .build()
                .expect("add schema"),
            permissions: ["group1".to_string()].into_iter().collect(),
            handler: handler_fn(|arguments| {
                let x = arguments.get("x").and_then(Value::as_i64).unwrap_or(0);
                let y = arguments.get("y").and_then(Value::as_i64).unwrap_or(0);
                Ok(json!(x + y))
            }),
        })
        .expect("add");
    registry
        .register(ToolRegistration {
            name: "who_am_i".to_string(),
            description: "Returns the caller principal".to_string(),
            version: ToolVersion::initial(),
            schema: ToolSchema::builder().injected_request("request").build().expect("schema"),
            permissions: BTreeSet::new(),
            handler: handler_fn(|arguments| {
                arguments
                    .get("request")
                    .and_then(|request| request.get("principal"))
                    .cloned()
                    .ok_or_else(|| HandlerFailure::new("request not injected"))
            }),
        })
        .expect("who_am_i");
    registry.register_adapted(Arc::new(CatalogSearch), BTreeSet::new()).expect("adapted");
    registry
}

/// Builds a dispatcher over the shared registry with a no-op audit sink.
pub fn sample_dispatcher() -> Dispatcher {
    Dispatcher::new(Arc::new(sample_registry()), Arc::new(NoopCallAudit))
}

/// Bearer-token authenticator granting `group1` to `letmein`.
pub struct BearerAuthenticator;

#[async_trait]
impl Authenticator for BearerAuthenticator {
    fn inputs(&self) -> BTreeSet<AuthInput> {
        [AuthInput::Headers].into_iter().collect()
    }

    async fn authenticate(&self, request: AuthRequest<'_>) -> Result<Identity, AuthError> {
        let token = request
            .headers
            .and_then(|headers| headers.get("authorization"))
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AuthError::Denied(AuthFailure::new(401, "missing bearer token")))?;
        if token != "letmein" {
            return Err(AuthError::Denied(AuthFailure::new(401, "invalid bearer token")));
        }
        Ok(Identity::new("alice", ["group1".to_string()].into_iter().collect()))
    }
}

/// Builds an anonymous auth gate.
pub fn anonymous_gate() -> Arc<AuthGate> {
    Arc::new(AuthGate::anonymous(Arc::new(NoopAuditSink)))
}

/// Builds a bearer-token auth gate.
pub fn bearer_gate() -> Arc<AuthGate> {
    Arc::new(AuthGate::new(Arc::new(BearerAuthenticator), Arc::new(NoopAuditSink)))
}
