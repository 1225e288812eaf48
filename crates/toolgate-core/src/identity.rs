// crates/toolgate-core/src/identity.rs
// ============================================================================
// Module: Caller Identity
// Description: Resolved principal and permission set for one request.
// Purpose: Carry the auth gate's decision through dispatch unchanged.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! An identity is produced once per inbound request by the auth gate and is
//! immutable afterwards. It is never persisted beyond the request. Permission
//! checks are subset checks: a caller may use a tool only when its permission
//! set covers every permission the tool requires.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// Principal label used for unauthenticated callers.
const ANONYMOUS_PRINCIPAL: &str = "anonymous";

/// Resolved caller identity for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Principal identifier (user id, service account, or `anonymous`).
    pub principal: String,
    /// Permissions granted to the caller.
    pub permissions: BTreeSet<String>,
    /// Additional claims supplied by the authenticator.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub claims: BTreeMap<String, Value>,
}

impl Identity {
    /// Creates an identity with the given principal and permissions.
    #[must_use]
    pub fn new(principal: impl Into<String>, permissions: BTreeSet<String>) -> Self {
        Self {
            principal: principal.into(),
            permissions,
            claims: BTreeMap::new(),
        }
    }

    /// Returns the anonymous identity used when no authenticator is
    /// registered.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_PRINCIPAL, BTreeSet::new())
    }

    /// Returns a copy with the given claims attached.
    #[must_use]
    pub fn with_claims(mut self, claims: BTreeMap<String, Value>) -> Self {
        self.claims = claims;
        self
    }

    /// Returns true when the caller holds every required permission.
    #[must_use]
    pub fn covers(&self, required: &BTreeSet<String>) -> bool {
        required.is_subset(&self.permissions)
    }
}
