// crates/toolgate-config/src/lib.rs
// ============================================================================
// Module: Toolgate Configuration
// Description: Configuration loading and validation for Toolgate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed; every tunable has explicit
//! bounds. The gateway server consumes a validated [`GatewayConfig`] at
//! startup and never re-reads configuration while serving.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AuditConfig;
pub use config::AuditSinkKind;
pub use config::ConfigError;
pub use config::GatewayConfig;
pub use config::McpConfig;
pub use config::McpTransport;
pub use config::RestConfig;
pub use config::ServerConfig;
pub use config::ToolsConfig;
