// crates/toolgate-core/src/lib.rs
// ============================================================================
// Module: Toolgate Core
// Description: Transport-agnostic tool invocation core for Toolgate.
// Purpose: Provide the registry, schemas, and dispatcher behind all bridges.
// Dependencies: serde, serde_json, jsonschema, async-trait
// ============================================================================

//! ## Overview
//! Toolgate Core binds tool names to typed handlers and dispatches
//! permission-gated calls against them. Protocol bridges (REST, MCP) are thin
//! wrappers over [`Dispatcher`]; no business logic lives in a transport.
//! The registry is populated at startup and is read-only while serving.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod dispatch;
pub mod identity;
pub mod registry;
pub mod schema;
pub mod version;


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::CallAuditSink;
pub use audit::NoopCallAudit;
pub use audit::ToolCallAuditEvent;
pub use dispatch::ArgumentError;
pub use dispatch::CallOutcome;
pub use dispatch::Dispatcher;
pub use dispatch::RequestContext;
pub use dispatch::TransportKind;
pub use identity::Identity;
pub use registry::AdaptedTool;
pub use registry::HandlerFailure;
pub use registry::RegistrationError;
pub use registry::handler_async;
pub use registry::handler_fn;
pub use registry::ToolHandler;
pub use registry::ToolRegistration;
pub use registry::ToolRegistry;
pub use registry::ToolSpec;
pub use schema::ParamKind;
pub use schema::ParamSpec;
pub use schema::SchemaError;
pub use schema::ToolSchema;
pub use version::ToolVersion;
pub use version::VersionError;
