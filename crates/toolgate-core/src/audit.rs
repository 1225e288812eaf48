// crates/toolgate-core/src/audit.rs
// ============================================================================
// Module: Dispatch Audit Contract
// Description: Structured audit events for tool dispatch.
// Purpose: Preserve internal failure detail without leaking it to callers.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every dispatch emits exactly one audit event. The event carries the
//! outcome label, the caller principal, and an internal-only detail field:
//! execution failure detail is withheld from callers but must remain
//! observable server-side. Sinks are intentionally lightweight so
//! deployments can route events to their preferred logging pipeline.

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::dispatch::TransportKind;

/// Audit event emitted once per dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request identifier when provided.
    pub request_id: Option<String>,
    /// Transport that carried the request.
    pub transport: TransportKind,
    /// Tool name as supplied by the caller.
    pub tool: String,
    /// Caller principal.
    pub principal: String,
    /// Outcome label.
    pub outcome: &'static str,
    /// Internal detail; never returned to the caller.
    pub detail: Option<String>,
}

impl ToolCallAuditEvent {
    /// Creates an event with a consistent timestamp.
    #[must_use]
    pub fn new(
        request_id: Option<String>,
        transport: TransportKind,
        tool: impl Into<String>,
        principal: impl Into<String>,
        outcome: &'static str,
        detail: Option<String>,
    ) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "tool_call",
            timestamp_ms,
            request_id,
            transport,
            tool: tool.into(),
            principal: principal.into(),
            outcome,
            detail,
        }
    }
}

/// Audit sink for dispatch events.
pub trait CallAuditSink: Send + Sync {
    /// Record a dispatch audit event.
    fn record(&self, event: &ToolCallAuditEvent);
}

/// No-op audit sink.
pub struct NoopCallAudit;

impl CallAuditSink for NoopCallAudit {
    fn record(&self, _event: &ToolCallAuditEvent) {}
}
