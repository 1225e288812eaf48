// crates/toolgate-core/src/dispatch.rs
// ============================================================================
// Module: Tool Dispatcher
// Description: Permission-gated dispatch of tool calls to registered handlers.
// Purpose: Produce exactly one outcome per call with strict argument binding.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The dispatcher is a pure function of (registry snapshot, one request's
//! arguments, one request's resolved identity). It authorizes, binds
//! arguments strictly, fills injected parameters from request context, and
//! awaits the handler without holding any lock. Every call produces exactly
//! one [`CallOutcome`] and one audit event; nothing propagates uncaught to a
//! transport.
//!
//! ## Invariants
//! - Authorization is checked before argument validation.
//! - Unknown arguments are rejected; injection is never caller-overridable.
//! - Execution failure detail reaches the audit sink only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::audit::CallAuditSink;
use crate::audit::ToolCallAuditEvent;
use crate::identity::Identity;
use crate::registry::ToolRegistry;
use crate::registry::ToolSpec;
use crate::schema::ParamKind;

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Transport that carried a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// REST bridge.
    Rest,
    /// MCP bridge over stdio.
    McpStdio,
    /// MCP bridge over HTTP.
    McpHttp,
    /// MCP bridge over SSE.
    McpSse,
}

impl TransportKind {
    /// Returns a stable label for audit events.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rest => "rest",
            Self::McpStdio => "mcp_stdio",
            Self::McpHttp => "mcp_http",
            Self::McpSse => "mcp_sse",
        }
    }
}

/// Per-request context used for injection and auditing.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Transport used by the caller.
    pub transport: TransportKind,
    /// Peer IP address when available.
    pub peer_ip: Option<IpAddr>,
    /// Optional request identifier for auditing.
    pub request_id: Option<String>,
}

impl RequestContext {
    /// Builds a REST request context.
    #[must_use]
    pub const fn rest(peer_ip: Option<IpAddr>) -> Self {
        Self {
            transport: TransportKind::Rest,
            peer_ip,
            request_id: None,
        }
    }

    /// Builds a stdio MCP request context.
    #[must_use]
    pub const fn mcp_stdio() -> Self {
        Self {
            transport: TransportKind::McpStdio,
            peer_ip: None,
            request_id: None,
        }
    }

    /// Builds a networked MCP request context.
    #[must_use]
    pub const fn mcp(transport: TransportKind, peer_ip: Option<IpAddr>) -> Self {
        Self {
            transport,
            peer_ip,
            request_id: None,
        }
    }

    /// Returns a copy with the request identifier set.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// A single argument binding failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    /// A required parameter is absent.
    #[error("missing required parameter `{parameter}` ({expected})")]
    Missing {
        /// Offending parameter name.
        parameter: String,
        /// Expected kind label.
        expected: &'static str,
    },
    /// A supplied value does not match the declared kind.
    #[error("parameter `{parameter}` must be a {expected}")]
    TypeMismatch {
        /// Offending parameter name.
        parameter: String,
        /// Expected kind label.
        expected: &'static str,
    },
    /// A supplied value violates the parameter's schema fragment.
    #[error("parameter `{parameter}` failed schema validation: {detail}")]
    SchemaViolation {
        /// Offending parameter name.
        parameter: String,
        /// First validation failure reported by the compiled schema.
        detail: String,
    },
    /// An argument name is not declared by the tool.
    #[error("unexpected argument `{parameter}`")]
    Unexpected {
        /// Offending argument name.
        parameter: String,
    },
    /// The argument payload itself is malformed.
    #[error("{detail}")]
    Payload {
        /// Failure description.
        detail: String,
    },
}

/// Tagged result of one dispatch attempt. Exactly one per call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// The tool executed and returned a value.
    Success(Value),
    /// The caller lacks at least one required permission.
    AuthorizationDenied {
        /// Caller-safe denial message.
        detail: String,
    },
    /// Argument binding failed.
    ValidationError {
        /// All binding failures for the call.
        errors: Vec<ArgumentError>,
    },
    /// The tool body failed.
    ExecutionError {
        /// Caller-safe failure summary.
        detail: String,
        /// Whether the caller may retry.
        can_retry: bool,
        /// Suggested retry delay in milliseconds.
        retry_after_ms: Option<u64>,
    },
    /// No tool with the requested name is exposed.
    NotFound,
}

impl CallOutcome {
    /// Returns a stable outcome label for audit events.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::AuthorizationDenied {
                ..
            } => "authorization_denied",
            Self::ValidationError {
                ..
            } => "validation_error",
            Self::ExecutionError {
                ..
            } => "execution_error",
            Self::NotFound => "not_found",
        }
    }

    /// Joins validation errors into a single caller-safe detail string.
    #[must_use]
    pub fn validation_detail(errors: &[ArgumentError]) -> String {
        let parts: Vec<String> = errors.iter().map(ToString::to_string).collect();
        parts.join("; ")
    }
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Permission-gated dispatcher over an immutable registry snapshot.
#[derive(Clone)]
pub struct Dispatcher {
    /// Registry snapshot shared across requests.
    registry: Arc<ToolRegistry>,
    /// Audit sink for dispatch events.
    audit: Arc<dyn CallAuditSink>,
    /// Optional exposure allowlist from configuration.
    allowed: Option<BTreeSet<String>>,
}

impl Dispatcher {
    /// Creates a dispatcher over a registry snapshot.
    #[must_use]
    pub const fn new(registry: Arc<ToolRegistry>, audit: Arc<dyn CallAuditSink>) -> Self {
        Self {
            registry,
            audit,
            allowed: None,
        }
    }

    /// Returns a copy restricted to an exposure allowlist.
    ///
    /// Tools outside the allowlist behave as unregistered: they are hidden
    /// from listings and dispatch reports [`CallOutcome::NotFound`].
    #[must_use]
    pub fn with_allowlist(mut self, allowed: BTreeSet<String>) -> Self {
        self.allowed = Some(allowed);
        self
    }

    /// Returns the underlying registry snapshot.
    #[must_use]
    pub const fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Lists tools visible to the given identity, in registration order.
    #[must_use]
    pub fn visible_tools(&self, identity: &Identity) -> Vec<&ToolSpec> {
        self.registry
            .list(&identity.permissions)
            .into_iter()
            .filter(|spec| self.is_exposed(spec.name()))
            .collect()
    }

    /// Dispatches one tool call.
    ///
    /// Lookup, authorization, strict binding, injection, and invocation run
    /// in order; the first failing stage determines the outcome. The handler
    /// future is awaited without holding any lock.
    pub async fn call(
        &self,
        name: &str,
        arguments: Value,
        identity: &Identity,
        context: &RequestContext,
    ) -> CallOutcome {
        let outcome = self.call_inner(name, arguments, identity, context).await;
        let detail = internal_detail(&outcome);
        self.audit.record(&ToolCallAuditEvent::new(
            context.request_id.clone(),
            context.transport,
            name,
            identity.principal.clone(),
            outcome.0.label(),
            detail,
        ));
        outcome.0
    }

    /// Dispatch body; returns the outcome plus internal-only failure detail.
    async fn call_inner(
        &self,
        name: &str,
        arguments: Value,
        identity: &Identity,
        context: &RequestContext,
    ) -> (CallOutcome, Option<String>) {
        if !self.is_exposed(name) {
            return (CallOutcome::NotFound, None);
        }
        let Some(spec) = self.registry.get(name) else {
            return (CallOutcome::NotFound, None);
        };
        if !identity.covers(spec.permissions()) {
            return (
                CallOutcome::AuthorizationDenied {
                    detail: "caller lacks required permissions".to_string(),
                },
                None,
            );
        }
        let bound = match bind_arguments(spec, arguments, identity, context) {
            Ok(bound) => bound,
            Err(errors) => {
                return (
                    CallOutcome::ValidationError {
                        errors,
                    },
                    None,
                );
            }
        };
        match spec.handler().invoke(Value::Object(bound)).await {
            Ok(value) => (CallOutcome::Success(value), None),
            Err(failure) => {
                let internal = failure.developer_message.clone();
                (
                    CallOutcome::ExecutionError {
                        detail: failure.message,
                        can_retry: failure.can_retry,
                        retry_after_ms: failure.retry_after_ms,
                    },
                    internal,
                )
            }
        }
    }

    /// Returns true when the tool name passes the exposure allowlist.
    fn is_exposed(&self, name: &str) -> bool {
        self.allowed.as_ref().is_none_or(|allowed| allowed.contains(name))
    }
}

// ============================================================================
// SECTION: Argument Binding
// ============================================================================

/// Binds caller arguments against the tool schema.
///
/// Strict policy: unknown argument names are rejected, including names of
/// injected parameters, so injection can never be overridden from outside.
/// All failures for the call are collected and reported together.
fn bind_arguments(
    spec: &ToolSpec,
    arguments: Value,
    identity: &Identity,
    context: &RequestContext,
) -> Result<Map<String, Value>, Vec<ArgumentError>> {
    let supplied = match arguments {
        Value::Null => Map::new(),
        Value::Object(map) => map,
        _ => {
            return Err(vec![ArgumentError::Payload {
                detail: "arguments must be a JSON object".to_string(),
            }]);
        }
    };
    let mut errors = Vec::new();
    let mut bound = Map::new();
    for (index, param) in spec.schema().params().iter().enumerate() {
        if param.kind == ParamKind::InjectedRequest {
            bound.insert(param.name.clone(), request_view(identity, context));
            continue;
        }
        match supplied.get(&param.name) {
            Some(value) => {
                if !param.kind.matches(value) {
                    errors.push(ArgumentError::TypeMismatch {
                        parameter: param.name.clone(),
                        expected: param.kind.label(),
                    });
                    continue;
                }
                if let Some(validator) = spec.validator(index)
                    && !validator.is_valid(value)
                {
                    let detail = validator
                        .iter_errors(value)
                        .next()
                        .map_or_else(|| "schema violation".to_string(), |err| err.to_string());
                    errors.push(ArgumentError::SchemaViolation {
                        parameter: param.name.clone(),
                        detail,
                    });
                    continue;
                }
                bound.insert(param.name.clone(), value.clone());
            }
            None if param.required => {
                errors.push(ArgumentError::Missing {
                    parameter: param.name.clone(),
                    expected: param.kind.label(),
                });
            }
            None => {
                if let Some(default) = &param.default {
                    bound.insert(param.name.clone(), default.clone());
                }
            }
        }
    }
    for key in supplied.keys() {
        let declared_for_caller = spec
            .schema()
            .get(key)
            .is_some_and(|param| param.kind != ParamKind::InjectedRequest);
        if !declared_for_caller {
            errors.push(ArgumentError::Unexpected {
                parameter: key.clone(),
            });
        }
    }
    if errors.is_empty() {
        Ok(bound)
    } else {
        Err(errors)
    }
}

/// Serialized request view bound to injected parameters.
fn request_view(identity: &Identity, context: &RequestContext) -> Value {
    json!({
        "principal": identity.principal,
        "permissions": identity.permissions,
        "claims": identity.claims,
        "transport": context.transport,
        "request_id": context.request_id,
    })
}

/// Extracts internal-only detail for the audit event.
fn internal_detail(outcome: &(CallOutcome, Option<String>)) -> Option<String> {
    match &outcome.0 {
        CallOutcome::ValidationError {
            errors,
        } => Some(CallOutcome::validation_detail(errors)),
        CallOutcome::ExecutionError {
            detail,
            ..
        } => Some(outcome.1.clone().unwrap_or_else(|| detail.clone())),
        _ => outcome.1.clone(),
    }
}
