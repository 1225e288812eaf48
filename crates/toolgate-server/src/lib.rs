// crates/toolgate-server/src/lib.rs
// ============================================================================
// Module: Toolgate Server
// Description: Protocol bridges and server assembly for Toolgate.
// Purpose: Expose one tool registry over REST and MCP without duplication.
// Dependencies: toolgate-core, toolgate-config, axum, tokio
// ============================================================================

//! ## Overview
//! The server crate wires the invocation core to its transports: a REST
//! bridge, an MCP (JSON-RPC 2.0) bridge over stdio/HTTP/SSE, a pluggable
//! auth gate, and audit sinks. Both bridges are thin wrappers over
//! [`toolgate_core::Dispatcher`]; configuration conflicts (such as enabling
//! authentication together with MCP) fail at startup, never at first
//! request.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod mcp;
pub mod rest;
pub mod server;


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use auth::AuthAuditEvent;
pub use auth::AuthAuditSink;
pub use auth::AuthError;
pub use auth::AuthFailure;
pub use auth::AuthGate;
pub use auth::AuthInput;
pub use auth::AuthRequest;
pub use auth::Authenticator;
pub use mcp::McpBridge;
pub use rest::RestBridge;
pub use server::GatewayServer;
pub use server::GatewayServerError;
