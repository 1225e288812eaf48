// crates/toolgate-server/src/server.rs
// ============================================================================
// Module: Gateway Server
// Description: Server assembly and transport selection for Toolgate.
// Purpose: Fail configuration conflicts at startup, then serve immutably.
// Dependencies: toolgate-core, toolgate-config, axum, tokio
// ============================================================================

//! ## Overview
//! The gateway server collects tool registrations and at most one
//! authenticator, validates the combination eagerly, and then consumes
//! itself into immutable shared state for serving. Registration after
//! startup is impossible by construction: `serve` takes ownership and moves
//! the registry into an `Arc`. MCP mode and a registered authenticator are
//! mutually exclusive; the conflict is a startup error, never a request
//! error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use toolgate_config::GatewayConfig;
use toolgate_config::McpTransport;
use toolgate_config::ServerConfig;
use toolgate_core::AdaptedTool;
use toolgate_core::Dispatcher;
use toolgate_core::RequestContext;
use toolgate_core::ToolRegistration;
use toolgate_core::ToolRegistry;

use crate::audit::build_sinks;
use crate::auth::AuthGate;
use crate::auth::Authenticator;
use crate::mcp::McpBridge;
use crate::rest::RestBridge;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gateway server errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayServerError {
    /// Configuration errors, including the MCP/auth exclusivity violation.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Gateway Server
// ============================================================================

/// Gateway server instance.
pub struct GatewayServer {
    /// Validated server configuration.
    config: GatewayConfig,
    /// Tool registry populated before serving.
    registry: ToolRegistry,
    /// Registered authenticator, if any.
    authenticator: Option<Arc<dyn Authenticator>>,
}

impl fmt::Debug for GatewayServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayServer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GatewayServer {
    /// Builds a gateway server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayServerError`] when the configuration is invalid.
    pub fn from_config(config: GatewayConfig) -> Result<Self, GatewayServerError> {
        config.validate().map_err(|err| GatewayServerError::Config(err.to_string()))?;
        Ok(Self {
            config,
            registry: ToolRegistry::new(),
            authenticator: None,
        })
    }

    /// Registers a native tool.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayServerError`] when registration fails.
    pub fn register_tool(
        &mut self,
        registration: ToolRegistration,
    ) -> Result<(), GatewayServerError> {
        self.registry
            .register(registration)
            .map(|_| ())
            .map_err(|err| GatewayServerError::Init(err.to_string()))
    }

    /// Registers a third-party tool through the adapter seam.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayServerError`] when registration fails.
    pub fn register_adapted_tool(
        &mut self,
        tool: Arc<dyn AdaptedTool>,
        permissions: BTreeSet<String>,
    ) -> Result<(), GatewayServerError> {
        self.registry
            .register_adapted(tool, permissions)
            .map(|_| ())
            .map_err(|err| GatewayServerError::Init(err.to_string()))
    }

    /// Registers the authentication handler.
    ///
    /// Fails when one is already registered, and fails eagerly when the MCP
    /// bridge is enabled: MCP cannot carry the auth inputs this gateway
    /// relies on.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayServerError::Config`] on either conflict.
    pub fn set_authenticator(
        &mut self,
        authenticator: Arc<dyn Authenticator>,
    ) -> Result<(), GatewayServerError> {
        if self.authenticator.is_some() {
            return Err(GatewayServerError::Config(
                "an authentication handler is already registered".to_string(),
            ));
        }
        if self.config.server.mcp.enabled {
            return Err(GatewayServerError::Config(
                "authentication cannot be combined with the MCP bridge".to_string(),
            ));
        }
        self.authenticator = Some(authenticator);
        Ok(())
    }

    /// Returns the registry populated so far.
    #[must_use]
    pub const fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Re-checks startup invariants before any transport binds.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayServerError::Config`] when the configuration or the
    /// MCP/auth combination is invalid.
    pub fn validate_startup(&self) -> Result<(), GatewayServerError> {
        self.config.validate().map_err(|err| GatewayServerError::Config(err.to_string()))?;
        if self.config.server.mcp.enabled && self.authenticator.is_some() {
            return Err(GatewayServerError::Config(
                "authentication cannot be combined with the MCP bridge".to_string(),
            ));
        }
        Ok(())
    }

    /// Serves requests using the configured transports.
    ///
    /// Consumes the server: the registry becomes immutable shared state and
    /// no further registration is possible.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayServerError`] when startup checks or the transport
    /// fail.
    pub async fn serve(self) -> Result<(), GatewayServerError> {
        self.validate_startup()?;
        let (call_sink, auth_sink) =
            build_sinks(&self.config.audit).map_err(|err| GatewayServerError::Init(err.to_string()))?;
        let mut dispatcher = Dispatcher::new(Arc::new(self.registry), call_sink);
        if !self.config.tools.allowed.is_empty() {
            let allowed: BTreeSet<String> = self.config.tools.allowed.iter().cloned().collect();
            dispatcher = dispatcher.with_allowlist(allowed);
        }
        let gate = Arc::new(match self.authenticator {
            Some(authenticator) => AuthGate::new(authenticator, auth_sink),
            None => AuthGate::anonymous(auth_sink),
        });
        let server = &self.config.server;
        emit_anonymous_warning(server, gate.is_enabled());
        if server.mcp.enabled && server.mcp.transport == McpTransport::Stdio {
            let bridge =
                McpBridge::new(dispatcher, server.name.clone(), server.max_body_bytes);
            return serve_stdio(&bridge, server.max_body_bytes).await;
        }
        let mut app = Router::new();
        if server.rest.enabled {
            let rest = Arc::new(RestBridge::new(
                dispatcher.clone(),
                gate,
                server.name.clone(),
                server.max_body_bytes,
            ));
            app = app.merge(rest.router());
        }
        if server.mcp.enabled {
            let bridge = Arc::new(McpBridge::new(
                dispatcher,
                server.name.clone(),
                server.max_body_bytes,
            ));
            app = match server.mcp.transport {
                McpTransport::Sse => app.merge(bridge.sse_router()),
                McpTransport::Http | McpTransport::Stdio => app.merge(bridge.http_router()),
            };
        }
        let bind = server
            .bind
            .as_ref()
            .ok_or_else(|| GatewayServerError::Config("bind address required".to_string()))?;
        let addr: SocketAddr = bind
            .parse()
            .map_err(|_| GatewayServerError::Config("invalid bind address".to_string()))?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|_| GatewayServerError::Transport("bind failed".to_string()))?;
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|_| GatewayServerError::Transport("server failed".to_string()))
    }
}

// ============================================================================
// SECTION: Stdio Transport
// ============================================================================

/// Serves JSON-RPC requests over stdin/stdout.
async fn serve_stdio(bridge: &McpBridge, max_body_bytes: usize) -> Result<(), GatewayServerError> {
    let mut reader = tokio::io::BufReader::new(tokio::io::stdin());
    let mut writer = tokio::io::stdout();
    loop {
        let bytes = read_framed(&mut reader, max_body_bytes).await?;
        let request = bridge.parse_payload(&bytes).map_err(|_| {
            GatewayServerError::Transport("invalid json-rpc request".to_string())
        })?;
        let context = RequestContext::mcp_stdio();
        if let Some((_, response)) = bridge.handle_request(&context, request).await {
            let payload = serde_json::to_vec(&response).map_err(|_| {
                GatewayServerError::Transport("json-rpc serialization failed".to_string())
            })?;
            write_framed(&mut writer, &payload).await?;
        }
    }
}

// ============================================================================
// SECTION: Framing Helpers
// ============================================================================

/// Reads a framed stdio payload using MCP Content-Length headers.
async fn read_framed(
    reader: &mut (impl AsyncBufRead + Unpin),
    max_body_bytes: usize,
) -> Result<Vec<u8>, GatewayServerError> {
    let mut content_length: Option<usize> = None;
    let mut line = String::new();
    loop {
        line.clear();
        let bytes = reader
            .read_line(&mut line)
            .await
            .map_err(|_| GatewayServerError::Transport("stdio read failed".to_string()))?;
        if bytes == 0 {
            return Err(GatewayServerError::Transport("stdio closed".to_string()));
        }
        if line.trim().is_empty() {
            break;
        }
        if let Some(value) = line.strip_prefix("Content-Length:") {
            let parsed = value.trim().parse::<usize>().map_err(|_| {
                GatewayServerError::Transport("invalid content length".to_string())
            })?;
            content_length = Some(parsed);
        }
    }
    let len = content_length
        .ok_or_else(|| GatewayServerError::Transport("missing content length".to_string()))?;
    if len > max_body_bytes {
        return Err(GatewayServerError::Transport("payload too large".to_string()));
    }
    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(|_| GatewayServerError::Transport("stdio read failed".to_string()))?;
    Ok(buf)
}

/// Writes a framed stdio payload using MCP Content-Length headers.
async fn write_framed(
    writer: &mut (impl AsyncWrite + Unpin),
    payload: &[u8],
) -> Result<(), GatewayServerError> {
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    writer
        .write_all(header.as_bytes())
        .await
        .map_err(|_| GatewayServerError::Transport("stdio write failed".to_string()))?;
    writer
        .write_all(payload)
        .await
        .map_err(|_| GatewayServerError::Transport("stdio write failed".to_string()))?;
    writer
        .flush()
        .await
        .map_err(|_| GatewayServerError::Transport("stdio write failed".to_string()))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Warns when the REST bridge serves without an authenticator.
fn emit_anonymous_warning(server: &ServerConfig, auth_enabled: bool) {
    if server.rest.enabled && !auth_enabled {
        let _ = writeln!(
            std::io::stderr(),
            "toolgate: WARNING: serving without an authenticator; all callers resolve to the \
             anonymous identity"
        );
    }
}
