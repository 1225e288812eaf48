// crates/toolgate-server/src/auth.rs
// ============================================================================
// Module: Auth Gate
// Description: Pluggable request authentication for the gateway.
// Purpose: Resolve one immutable identity per request, fail closed.
// Dependencies: toolgate-core, axum, async-trait
// ============================================================================

//! ## Overview
//! The gate holds zero or one [`Authenticator`]. An authenticator declares
//! which request inputs it needs ([`AuthInput`]); the declared set is
//! resolved once when the gate is built and cached, never re-inspected per
//! request. With no authenticator every request resolves to the anonymous
//! identity. Explicit failures carry an HTTP status and a safe detail
//! message; any other authenticator error collapses to a generic denial
//! whose detail reaches the audit sink only.
//!
//! ## Invariants
//! - Identity is resolved once per request and reused for all checks.
//! - Internal authenticator errors never leak detail to the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::Serialize;
use thiserror::Error;
use toolgate_core::Identity;
use toolgate_core::RequestContext;
use toolgate_core::TransportKind;

// ============================================================================
// SECTION: Authenticator Contract
// ============================================================================

/// Request inputs an authenticator may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AuthInput {
    /// The transport-level request context.
    Request,
    /// Request headers as byte values.
    Headers,
    /// Raw request body bytes.
    Body,
}

/// Inputs assembled for one authentication attempt.
///
/// Only the fields the authenticator declared via [`Authenticator::inputs`]
/// are populated; the rest stay `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthRequest<'a> {
    /// Transport-level request context, when declared.
    pub request: Option<&'a RequestContext>,
    /// Request headers, when declared.
    pub headers: Option<&'a HeaderMap>,
    /// Raw body bytes, when declared.
    pub body: Option<&'a [u8]>,
}

/// Explicit authentication failure with an HTTP-style status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{detail}")]
pub struct AuthFailure {
    /// HTTP status code for the response.
    pub status: u16,
    /// Caller-safe failure detail.
    pub detail: String,
}

impl AuthFailure {
    /// Creates a failure with a status and safe detail.
    #[must_use]
    pub fn new(status: u16, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

/// Authenticator errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Explicit denial returned to the caller.
    #[error("{0}")]
    Denied(AuthFailure),
    /// Internal failure; converted to a generic denial.
    #[error("internal authentication error: {0}")]
    Internal(String),
}

/// Pluggable authentication function.
///
/// Implementations must return an [`Identity`] carrying at least a principal
/// and a permission collection, or fail with [`AuthError::Denied`] carrying
/// an explicit status and detail.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Declares the request inputs this authenticator needs.
    ///
    /// Called once when the gate is built; the result is cached.
    fn inputs(&self) -> BTreeSet<AuthInput>;

    /// Resolves the caller identity from the declared inputs.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when authentication fails.
    async fn authenticate(&self, request: AuthRequest<'_>) -> Result<Identity, AuthError>;
}

// ============================================================================
// SECTION: Audit Events
// ============================================================================

/// Auth decision audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct AuthAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Decision outcome.
    pub decision: &'static str,
    /// Resolved principal (allow events only).
    pub principal: Option<String>,
    /// Transport that carried the request.
    pub transport: TransportKind,
    /// Peer IP address when available.
    pub peer_ip: Option<String>,
    /// HTTP status returned on denial.
    pub status: Option<u16>,
    /// Failure reason; may carry internal detail never sent to the caller.
    pub reason: Option<String>,
    /// Request identifier when provided.
    pub request_id: Option<String>,
}

impl AuthAuditEvent {
    /// Builds an allow event.
    #[must_use]
    pub fn allowed(context: &RequestContext, identity: &Identity) -> Self {
        Self {
            event: "auth_decision",
            timestamp_ms: now_ms(),
            decision: "allow",
            principal: Some(identity.principal.clone()),
            transport: context.transport,
            peer_ip: context.peer_ip.map(|ip| ip.to_string()),
            status: None,
            reason: None,
            request_id: context.request_id.clone(),
        }
    }

    /// Builds a deny event; `reason` may carry internal detail.
    #[must_use]
    pub fn denied(context: &RequestContext, status: u16, reason: impl Into<String>) -> Self {
        Self {
            event: "auth_decision",
            timestamp_ms: now_ms(),
            decision: "deny",
            principal: None,
            transport: context.transport,
            peer_ip: context.peer_ip.map(|ip| ip.to_string()),
            status: Some(status),
            reason: Some(reason.into()),
            request_id: context.request_id.clone(),
        }
    }
}

/// Audit sink for auth decisions.
pub trait AuthAuditSink: Send + Sync {
    /// Record an auth decision event.
    fn record_auth(&self, event: &AuthAuditEvent);
}

// ============================================================================
// SECTION: Auth Gate
// ============================================================================

/// Status used when an internal authenticator error is collapsed.
const GENERIC_DENIAL_STATUS: u16 = 403;
/// Caller-safe detail used for collapsed internal errors.
const GENERIC_DENIAL_DETAIL: &str = "authentication failed";

/// Per-process authentication gate.
pub struct AuthGate {
    /// Registered authenticator, if any.
    authenticator: Option<Arc<dyn Authenticator>>,
    /// Input set declared by the authenticator, cached at construction.
    inputs: BTreeSet<AuthInput>,
    /// Audit sink for auth decisions.
    audit: Arc<dyn AuthAuditSink>,
}

impl AuthGate {
    /// Builds a gate with no authenticator; every caller is anonymous.
    #[must_use]
    pub fn anonymous(audit: Arc<dyn AuthAuditSink>) -> Self {
        Self {
            authenticator: None,
            inputs: BTreeSet::new(),
            audit,
        }
    }

    /// Builds a gate around an authenticator, caching its declared inputs.
    #[must_use]
    pub fn new(authenticator: Arc<dyn Authenticator>, audit: Arc<dyn AuthAuditSink>) -> Self {
        let inputs = authenticator.inputs();
        Self {
            authenticator: Some(authenticator),
            inputs,
            audit,
        }
    }

    /// Returns true when an authenticator is registered.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.authenticator.is_some()
    }

    /// Resolves the identity for one request.
    ///
    /// Computed once per request; callers reuse the result for every
    /// permission check during dispatch.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFailure`] when authentication fails. Internal
    /// authenticator errors are collapsed to a generic denial; their detail
    /// reaches the audit sink only.
    pub async fn resolve(
        &self,
        context: &RequestContext,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<Identity, AuthFailure> {
        let Some(authenticator) = &self.authenticator else {
            return Ok(Identity::anonymous());
        };
        let request = AuthRequest {
            request: self.inputs.contains(&AuthInput::Request).then_some(context),
            headers: self.inputs.contains(&AuthInput::Headers).then_some(headers),
            body: self.inputs.contains(&AuthInput::Body).then_some(body),
        };
        match authenticator.authenticate(request).await {
            Ok(identity) => {
                self.audit.record_auth(&AuthAuditEvent::allowed(context, &identity));
                Ok(identity)
            }
            Err(AuthError::Denied(failure)) => {
                self.audit.record_auth(&AuthAuditEvent::denied(
                    context,
                    failure.status,
                    failure.detail.clone(),
                ));
                Err(failure)
            }
            Err(AuthError::Internal(detail)) => {
                self.audit.record_auth(&AuthAuditEvent::denied(
                    context,
                    GENERIC_DENIAL_STATUS,
                    detail,
                ));
                Err(AuthFailure::new(GENERIC_DENIAL_STATUS, GENERIC_DENIAL_DETAIL))
            }
        }
    }
}

/// Milliseconds since the Unix epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}
