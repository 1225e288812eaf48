// crates/toolgate-config/src/config.rs
// ============================================================================
// Module: Gateway Configuration
// Description: TOML configuration model with fail-closed validation.
// Purpose: Reject invalid deployments at startup, never at first request.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! The configuration model mirrors the deployment surface of the gateway:
//! which bridges are enabled, where they bind, how large request bodies may
//! be, which audit sink receives events, and which tools are exposed.
//! Loading enforces file-size, UTF-8, and path limits before parsing;
//! `validate` enforces cross-field rules such as the stdio/REST conflict.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "toolgate.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "TOOLGATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Minimum allowed request body size in bytes.
pub(crate) const MIN_BODY_BYTES: usize = 1024;
/// Maximum allowed request body size in bytes.
pub(crate) const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;
/// Default maximum request body size in bytes.
const DEFAULT_BODY_BYTES: usize = 1024 * 1024;
/// Maximum number of entries in the tool exposure allowlist.
pub(crate) const MAX_ALLOWED_TOOLS: usize = 128;
/// Maximum length of a tool name in the allowlist.
pub(crate) const MAX_TOOL_NAME_LENGTH: usize = 128;
/// Maximum length of the advertised server name.
pub(crate) const MAX_SERVER_NAME_LENGTH: usize = 128;
/// Default advertised server name.
const DEFAULT_SERVER_NAME: &str = "toolgate";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Toolgate gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct GatewayConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Audit sink configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Tool exposure configuration.
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Server and bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Advertised server name (reported by `/info` and MCP `serverInfo`).
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Bind address for networked bridges.
    #[serde(default)]
    pub bind: Option<String>,
    /// Maximum allowed request body size in bytes.
    #[serde(default = "default_body_bytes")]
    pub max_body_bytes: usize,
    /// REST bridge configuration.
    #[serde(default)]
    pub rest: RestConfig,
    /// MCP bridge configuration.
    #[serde(default)]
    pub mcp: McpConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            bind: None,
            max_body_bytes: default_body_bytes(),
            rest: RestConfig::default(),
            mcp: McpConfig::default(),
        }
    }
}

/// REST bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RestConfig {
    /// Whether the REST bridge serves requests.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
        }
    }
}

/// MCP bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct McpConfig {
    /// Whether the MCP bridge serves requests.
    #[serde(default)]
    pub enabled: bool,
    /// Transport carrying MCP JSON-RPC messages.
    #[serde(default)]
    pub transport: McpTransport,
}

/// Transport options for the MCP bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum McpTransport {
    /// Content-Length framed JSON-RPC over stdin/stdout.
    Stdio,
    /// JSON-RPC over HTTP POST.
    #[default]
    Http,
    /// JSON-RPC over server-sent events.
    Sse,
}

/// Audit sink configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct AuditConfig {
    /// Sink receiving audit events.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines to stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Discard audit events.
    None,
}

/// Tool exposure configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct ToolsConfig {
    /// Optional allowlist restricting which registered tools are exposed.
    ///
    /// An empty list exposes every registered tool.
    #[serde(default)]
    pub allowed: Vec<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors, fatal at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl GatewayConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit path argument, then the `TOOLGATE_CONFIG`
    /// environment variable, then `toolgate.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file is not valid UTF-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field configuration rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when any rule fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_audit()?;
        self.validate_tools()
    }

    /// Validates the server and bridge section.
    fn validate_server(&self) -> Result<(), ConfigError> {
        let server = &self.server;
        if server.name.trim().is_empty() {
            return Err(ConfigError::Invalid("server name cannot be empty".to_string()));
        }
        if server.name.len() > MAX_SERVER_NAME_LENGTH {
            return Err(ConfigError::Invalid("server name exceeds length limit".to_string()));
        }
        if !server.rest.enabled && !server.mcp.enabled {
            return Err(ConfigError::Invalid(
                "at least one of server.rest or server.mcp must be enabled".to_string(),
            ));
        }
        if server.mcp.enabled && server.mcp.transport == McpTransport::Stdio && server.rest.enabled
        {
            return Err(ConfigError::Invalid(
                "stdio MCP transport cannot be combined with the REST bridge".to_string(),
            ));
        }
        if self.requires_bind() {
            let bind = server
                .bind
                .as_deref()
                .ok_or_else(|| ConfigError::Invalid("bind address required".to_string()))?;
            bind.parse::<SocketAddr>()
                .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))?;
        }
        if server.max_body_bytes < MIN_BODY_BYTES || server.max_body_bytes > MAX_BODY_BYTES {
            return Err(ConfigError::Invalid(format!(
                "max_body_bytes must be between {MIN_BODY_BYTES} and {MAX_BODY_BYTES}"
            )));
        }
        Ok(())
    }

    /// Validates the audit section.
    fn validate_audit(&self) -> Result<(), ConfigError> {
        match self.audit.sink {
            AuditSinkKind::File => {
                let path = self
                    .audit
                    .path
                    .as_deref()
                    .ok_or_else(|| ConfigError::Invalid("file audit sink requires path".to_string()))?;
                validate_path(path)
            }
            AuditSinkKind::Stderr | AuditSinkKind::None => {
                if self.audit.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "audit path is only valid with the file sink".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Validates the tool exposure section.
    fn validate_tools(&self) -> Result<(), ConfigError> {
        let allowed = &self.tools.allowed;
        if allowed.len() > MAX_ALLOWED_TOOLS {
            return Err(ConfigError::Invalid("too many allowed tool entries".to_string()));
        }
        for (index, name) in allowed.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("allowed tool name cannot be empty".to_string()));
            }
            if name.len() > MAX_TOOL_NAME_LENGTH {
                return Err(ConfigError::Invalid(format!(
                    "allowed tool name `{name}` exceeds length limit"
                )));
            }
            if allowed[..index].contains(name) {
                return Err(ConfigError::Invalid(format!("duplicate allowed tool `{name}`")));
            }
        }
        Ok(())
    }

    /// Returns true when any networked bridge is enabled.
    #[must_use]
    pub fn requires_bind(&self) -> bool {
        self.server.rest.enabled
            || (self.server.mcp.enabled && self.server.mcp.transport != McpTransport::Stdio)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the configuration path from argument, environment, or default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(explicit) = path {
        return Ok(explicit.to_path_buf());
    }
    if let Ok(from_env) = env::var(CONFIG_ENV_VAR) {
        if from_env.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("{CONFIG_ENV_VAR} is set but empty")));
        }
        return Ok(PathBuf::from(from_env));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates path component and total length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let total = path.as_os_str().len();
    if total == 0 {
        return Err(ConfigError::Invalid("path cannot be empty".to_string()));
    }
    if total > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("path exceeds total length limit".to_string()));
    }
    for component in path.components() {
        if let Component::Normal(part) = component
            && part.len() > MAX_PATH_COMPONENT_LENGTH
        {
            return Err(ConfigError::Invalid("path component exceeds length limit".to_string()));
        }
    }
    Ok(())
}

/// Default advertised server name.
fn default_server_name() -> String {
    DEFAULT_SERVER_NAME.to_string()
}

/// Default maximum request body size.
const fn default_body_bytes() -> usize {
    DEFAULT_BODY_BYTES
}

/// Serde default helper for enabled flags.
const fn default_true() -> bool {
    true
}
