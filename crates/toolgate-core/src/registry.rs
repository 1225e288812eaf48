// crates/toolgate-core/src/registry.rs
// ============================================================================
// Module: Tool Registry
// Description: Name-indexed catalog of registered tool handlers.
// Purpose: Bind unique tool names to handlers with validated schemas.
// Dependencies: async-trait, jsonschema, serde
// ============================================================================

//! ## Overview
//! The registry owns every [`ToolSpec`]: the handler, its parameter schema,
//! its required permission set, and descriptive metadata. Registration fails
//! fast on duplicate names and invalid schemas; schema fragments are compiled
//! once here and reused on every call. The registry is populated at startup
//! and consumed into shared immutable state before serving begins, so lookup
//! never races with registration.
//!
//! ## Invariants
//! - Tool names are unique within a registry.
//! - Listing order is registration order.
//! - Compiled fragment validators stay parallel to the parameter list.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use jsonschema::Draft;
use jsonschema::Validator;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::schema::SchemaError;
use crate::schema::ToolSchema;
use crate::version::ToolVersion;

// ============================================================================
// SECTION: Handler Contract
// ============================================================================

/// Failure reported by a tool handler.
///
/// The `message` is safe to return to callers; `developer_message` is
/// recorded by the audit sink only and never crosses the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct HandlerFailure {
    /// Caller-safe failure summary.
    pub message: String,
    /// Internal detail for server-side logging only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer_message: Option<String>,
    /// Whether the caller may retry the call.
    #[serde(default)]
    pub can_retry: bool,
    /// Suggested retry delay in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

impl HandlerFailure {
    /// Creates a failure with a caller-safe message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            developer_message: None,
            can_retry: false,
            retry_after_ms: None,
        }
    }

    /// Returns a copy carrying internal detail for the audit log.
    #[must_use]
    pub fn with_developer_message(mut self, detail: impl Into<String>) -> Self {
        self.developer_message = Some(detail.into());
        self
    }

    /// Returns a copy marked retryable with an optional delay hint.
    #[must_use]
    pub const fn retryable(mut self, retry_after_ms: Option<u64>) -> Self {
        self.can_retry = true;
        self.retry_after_ms = retry_after_ms;
        self
    }
}

/// Unit of work invoked by the dispatcher.
///
/// Handlers receive the bound argument object (defaults applied, injected
/// parameters filled) and report failure by returning [`HandlerFailure`].
/// Synchronous and asynchronous tools implement the same trait; see
/// [`handler_fn`] and [`handler_async`].
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Executes the tool with bound arguments.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerFailure`] when the tool body fails.
    async fn invoke(&self, arguments: Value) -> Result<Value, HandlerFailure>;
}

/// Handler wrapper for synchronous closures.
struct SyncFnHandler<F> {
    /// Wrapped closure.
    func: F,
}

#[async_trait]
impl<F> ToolHandler for SyncFnHandler<F>
where
    F: Fn(Value) -> Result<Value, HandlerFailure> + Send + Sync,
{
    async fn invoke(&self, arguments: Value) -> Result<Value, HandlerFailure> {
        (self.func)(arguments)
    }
}

/// Handler wrapper for asynchronous closures.
struct AsyncFnHandler<F> {
    /// Wrapped closure returning a future.
    func: F,
}

#[async_trait]
impl<F, Fut> ToolHandler for AsyncFnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, HandlerFailure>> + Send,
{
    async fn invoke(&self, arguments: Value) -> Result<Value, HandlerFailure> {
        (self.func)(arguments).await
    }
}

/// Wraps a synchronous closure as a tool handler.
#[must_use]
pub fn handler_fn<F>(func: F) -> Arc<dyn ToolHandler>
where
    F: Fn(Value) -> Result<Value, HandlerFailure> + Send + Sync + 'static,
{
    Arc::new(SyncFnHandler {
        func,
    })
}

/// Wraps an asynchronous closure as a tool handler.
#[must_use]
pub fn handler_async<F, Fut>(func: F) -> Arc<dyn ToolHandler>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerFailure>> + Send + 'static,
{
    Arc::new(AsyncFnHandler {
        func,
    })
}

// ============================================================================
// SECTION: Adapted Tools
// ============================================================================

/// Third-party tool object accepted by [`ToolRegistry::register_adapted`].
///
/// Any object exposing a name, a description, a JSON Schema argument
/// document, and an invoke operation integrates through this seam; the
/// dispatcher never distinguishes adapted tools from native ones.
#[async_trait]
pub trait AdaptedTool: Send + Sync {
    /// Tool name.
    fn name(&self) -> &str;

    /// Human-readable tool description.
    fn description(&self) -> &str;

    /// Tool version; defaults to `1.0.0`.
    fn version(&self) -> ToolVersion {
        ToolVersion::initial()
    }

    /// JSON Schema document describing the tool's arguments.
    fn input_schema(&self) -> Value;

    /// Executes the tool with bound arguments.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerFailure`] when the tool body fails.
    async fn invoke(&self, arguments: Value) -> Result<Value, HandlerFailure>;
}

/// Handler adapter delegating to an adapted tool.
struct AdaptedHandler {
    /// Wrapped third-party tool.
    tool: Arc<dyn AdaptedTool>,
}

#[async_trait]
impl ToolHandler for AdaptedHandler {
    async fn invoke(&self, arguments: Value) -> Result<Value, HandlerFailure> {
        self.tool.invoke(arguments).await
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registration errors, fatal at startup.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// A tool with the same name is already registered.
    #[error("tool `{0}` already exists")]
    DuplicateName(String),
    /// The tool name is empty.
    #[error("tool name cannot be empty")]
    EmptyName,
    /// The declared schema is invalid.
    #[error("invalid schema for tool `{name}`: {source}")]
    Schema {
        /// Tool being registered.
        name: String,
        /// Underlying schema error.
        #[source]
        source: SchemaError,
    },
    /// A schema fragment failed to compile.
    #[error("invalid schema fragment for tool `{name}` parameter `{parameter}`: {detail}")]
    FragmentCompile {
        /// Tool being registered.
        name: String,
        /// Parameter whose fragment failed to compile.
        parameter: String,
        /// Compiler error detail.
        detail: String,
    },
}

// ============================================================================
// SECTION: Tool Specs
// ============================================================================

/// A registered tool: handler, schema, permissions, and metadata.
#[derive(Clone)]
pub struct ToolSpec {
    /// Unique tool name.
    name: String,
    /// Human-readable description.
    description: String,
    /// Normalized tool version.
    version: ToolVersion,
    /// Permissions required to see and call the tool.
    permissions: BTreeSet<String>,
    /// Declared parameter schema.
    schema: ToolSchema,
    /// Handler invoked by the dispatcher.
    handler: Arc<dyn ToolHandler>,
    /// Compiled fragment validators, parallel to the parameter list.
    validators: Vec<Option<Arc<Validator>>>,
}

impl ToolSpec {
    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tool description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the tool version.
    #[must_use]
    pub const fn version(&self) -> ToolVersion {
        self.version
    }

    /// Returns the required permission set.
    #[must_use]
    pub const fn permissions(&self) -> &BTreeSet<String> {
        &self.permissions
    }

    /// Returns the declared parameter schema.
    #[must_use]
    pub const fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    /// Returns the handler for invocation.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn ToolHandler> {
        &self.handler
    }

    /// Returns the compiled fragment validator for a parameter index.
    #[must_use]
    pub fn validator(&self, index: usize) -> Option<&Arc<Validator>> {
        self.validators.get(index).and_then(Option::as_ref)
    }

    /// Derives the caller-visible JSON Schema document.
    #[must_use]
    pub fn input_schema(&self) -> Value {
        self.schema.input_schema()
    }
}

impl fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("version", &self.version)
            .field("permissions", &self.permissions)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Inputs for registering a native tool.
pub struct ToolRegistration {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Tool version reported in listings.
    pub version: ToolVersion,
    /// Declared parameter schema.
    pub schema: ToolSchema,
    /// Permissions required to see and call the tool.
    pub permissions: BTreeSet<String>,
    /// Handler invoked by the dispatcher.
    pub handler: Arc<dyn ToolHandler>,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Name-indexed catalog of registered tools.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    /// Registered specs in registration order.
    specs: Vec<ToolSpec>,
    /// Name index into `specs`.
    index: BTreeMap<String, usize>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a native tool and returns the stored spec.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] on duplicate names or invalid schemas.
    pub fn register(
        &mut self,
        registration: ToolRegistration,
    ) -> Result<&ToolSpec, RegistrationError> {
        if registration.name.trim().is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        if self.index.contains_key(&registration.name) {
            return Err(RegistrationError::DuplicateName(registration.name));
        }
        let validators = compile_validators(&registration.name, &registration.schema)?;
        let spec = ToolSpec {
            name: registration.name,
            description: registration.description,
            version: registration.version,
            permissions: registration.permissions,
            schema: registration.schema,
            handler: registration.handler,
            validators,
        };
        let position = self.specs.len();
        self.index.insert(spec.name.clone(), position);
        self.specs.push(spec);
        Ok(&self.specs[position])
    }

    /// Registers a third-party tool object through the adapter seam.
    ///
    /// The tool's JSON Schema argument document is parsed into the same
    /// schema shape used by native tools; schema problems fail registration
    /// here rather than at call time.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] on duplicate names or unusable schemas.
    pub fn register_adapted(
        &mut self,
        tool: Arc<dyn AdaptedTool>,
        permissions: BTreeSet<String>,
    ) -> Result<&ToolSpec, RegistrationError> {
        let name = tool.name().to_string();
        let schema =
            ToolSchema::from_json_schema(&tool.input_schema()).map_err(|source| {
                RegistrationError::Schema {
                    name: name.clone(),
                    source,
                }
            })?;
        self.register(ToolRegistration {
            name,
            description: tool.description().to_string(),
            version: tool.version(),
            schema,
            permissions,
            handler: Arc::new(AdaptedHandler {
                tool,
            }),
        })
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.index.get(name).and_then(|position| self.specs.get(*position))
    }

    /// Lists tools visible to a caller with the given permissions.
    ///
    /// Order is registration order; a tool is visible when its required
    /// permission set is a subset of the caller's.
    #[must_use]
    pub fn list(&self, permissions: &BTreeSet<String>) -> Vec<&ToolSpec> {
        self.specs
            .iter()
            .filter(|spec| spec.permissions.is_subset(permissions))
            .collect()
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Returns true when no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Iterates all specs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ToolSpec> {
        self.specs.iter()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Compiles declared schema fragments once at registration time.
fn compile_validators(
    name: &str,
    schema: &ToolSchema,
) -> Result<Vec<Option<Arc<Validator>>>, RegistrationError> {
    let mut validators = Vec::with_capacity(schema.params().len());
    for param in schema.params() {
        match &param.schema {
            Some(fragment) => {
                let compiled = jsonschema::options()
                    .with_draft(Draft::Draft202012)
                    .build(fragment)
                    .map_err(|err| RegistrationError::FragmentCompile {
                        name: name.to_string(),
                        parameter: param.name.clone(),
                        detail: err.to_string(),
                    })?;
                validators.push(Some(Arc::new(compiled)));
            }
            None => validators.push(None),
        }
    }
    Ok(validators)
}
