// crates/toolgate-core/src/schema.rs
// ============================================================================
// Module: Parameter Schemas
// Description: Ordered, typed parameter schemas for registered tools.
// Purpose: Fail registration on invalid schemas instead of failing at call time.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every tool declares an ordered parameter schema at registration time. The
//! schema classifies each parameter into a small set of semantic kinds,
//! including the server-filled `injected_request` kind that callers can never
//! supply. All schema problems are rejected when the tool is registered.
//!
//! ## Invariants
//! - Parameter order matches declaration order.
//! - Parameter names are unique within a schema.
//! - Injected parameters carry no default, no fragment, and are never
//!   required from the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: Parameter Kinds
// ============================================================================

/// Semantic type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// UTF-8 string value.
    String,
    /// Integral JSON number.
    Integer,
    /// Any JSON number.
    Float,
    /// Boolean value.
    Boolean,
    /// JSON object value.
    Object,
    /// JSON array value.
    Array,
    /// Server-filled request context; never supplied by the caller.
    InjectedRequest,
}

impl ParamKind {
    /// Returns a stable label for error messages and listings.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::InjectedRequest => "injected_request",
        }
    }

    /// Returns the JSON Schema `type` keyword for caller-visible kinds.
    #[must_use]
    pub const fn json_type(self) -> Option<&'static str> {
        match self {
            Self::String => Some("string"),
            Self::Integer => Some("integer"),
            Self::Float => Some("number"),
            Self::Boolean => Some("boolean"),
            Self::Object => Some("object"),
            Self::Array => Some("array"),
            Self::InjectedRequest => None,
        }
    }

    /// Returns true when the JSON value matches this kind.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.as_i64().is_some() || value.as_u64().is_some(),
            Self::Float => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::InjectedRequest => false,
        }
    }

    /// Maps a JSON Schema `type` keyword to a parameter kind.
    #[must_use]
    pub fn from_json_type(keyword: &str) -> Option<Self> {
        match keyword {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Float),
            "boolean" => Some(Self::Boolean),
            "object" => Some(Self::Object),
            "array" => Some(Self::Array),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Parameter Specs
// ============================================================================

/// A single declared tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name, unique within the schema.
    pub name: String,
    /// Semantic kind of the parameter.
    pub kind: ParamKind,
    /// Whether the caller must supply the parameter.
    pub required: bool,
    /// Default applied when an optional parameter is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// JSON Schema fragment for object/array parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Schema validation errors raised at registration time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// Two parameters share the same name.
    #[error("duplicate parameter `{0}`")]
    DuplicateParameter(String),
    /// An injected parameter declares a default value.
    #[error("injected parameter `{0}` cannot declare a default")]
    InjectedDefault(String),
    /// An injected parameter is marked as caller-required.
    #[error("injected parameter `{0}` cannot be required from the caller")]
    InjectedRequired(String),
    /// A default value does not match the declared kind.
    #[error("default for parameter `{name}` is not a valid {expected}")]
    DefaultKindMismatch {
        /// Offending parameter name.
        name: String,
        /// Declared kind label.
        expected: &'static str,
    },
    /// A schema fragment is attached to a scalar parameter.
    #[error("parameter `{0}` declares a schema fragment but is not an object or array")]
    FragmentOnScalar(String),
    /// A schema fragment is not a JSON object.
    #[error("schema fragment for parameter `{0}` must be a JSON object")]
    FragmentNotObject(String),
    /// An adapted schema document is not an object schema.
    #[error("input schema must describe a JSON object")]
    NotAnObjectSchema,
    /// An adapted schema property is missing a type keyword.
    #[error("parameter `{0}` has no usable type")]
    MissingType(String),
    /// An adapted schema property uses an unsupported type keyword.
    #[error("parameter `{name}` has unsupported type `{found}`")]
    UnsupportedType {
        /// Offending parameter name.
        name: String,
        /// Type keyword found in the schema.
        found: String,
    },
    /// The required list names a parameter that is not declared.
    #[error("required list names unknown parameter `{0}`")]
    UnknownRequired(String),
    /// A required parameter also declares a default.
    #[error("required parameter `{0}` cannot declare a default")]
    DefaultOnRequired(String),
}

// ============================================================================
// SECTION: Tool Schema
// ============================================================================

/// Ordered parameter schema for one tool.
///
/// Construction always passes through [`ToolSchema::new`], so a schema in
/// hand is a validated one.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSchema {
    /// Declared parameters in declaration order.
    params: Vec<ParamSpec>,
}

impl ToolSchema {
    /// Creates a schema from an ordered parameter list.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when the declaration is invalid.
    pub fn new(params: Vec<ParamSpec>) -> Result<Self, SchemaError> {
        validate_params(&params)?;
        Ok(Self {
            params,
        })
    }

    /// Creates an empty schema for tools with no parameters.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            params: Vec::new(),
        }
    }

    /// Returns a builder for incremental declaration.
    #[must_use]
    pub const fn builder() -> ToolSchemaBuilder {
        ToolSchemaBuilder {
            params: Vec::new(),
        }
    }

    /// Returns the declared parameters in declaration order.
    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Looks up a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|param| param.name == name)
    }

    /// Derives the caller-visible JSON Schema document.
    ///
    /// Injected parameters are omitted: callers never supply them. Unknown
    /// properties are rejected to keep the strict argument policy visible in
    /// the listing.
    #[must_use]
    pub fn input_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for param in &self.params {
            let Some(json_type) = param.kind.json_type() else {
                continue;
            };
            let property = param.schema.clone().unwrap_or_else(|| json!({"type": json_type}));
            properties.insert(param.name.clone(), property);
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }
        json!({
            "type": "object",
            "properties": Value::Object(properties),
            "required": Value::Array(required),
            "additionalProperties": false,
        })
    }

    /// Parses an adapted tool's JSON Schema document into a schema.
    ///
    /// Property declarations map `type` keywords onto parameter kinds; the
    /// full property schema is preserved as a fragment for object and array
    /// parameters. A property with no usable `type` fails, mirroring the
    /// fail-fast rule for untyped parameters.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when the document cannot be expressed as a
    /// parameter schema.
    pub fn from_json_schema(document: &Value) -> Result<Self, SchemaError> {
        let root = document.as_object().ok_or(SchemaError::NotAnObjectSchema)?;
        let declared_object = root.get("type").and_then(Value::as_str) == Some("object")
            || (root.get("type").is_none() && root.contains_key("properties"));
        if !declared_object {
            return Err(SchemaError::NotAnObjectSchema);
        }
        let properties = match root.get("properties") {
            Some(value) => value.as_object().ok_or(SchemaError::NotAnObjectSchema)?,
            None => return Self::new(Vec::new()),
        };
        let required_names = required_list(root)?;
        for name in &required_names {
            if !properties.contains_key(name) {
                return Err(SchemaError::UnknownRequired(name.clone()));
            }
        }
        let mut params = Vec::with_capacity(properties.len());
        for (name, property) in properties {
            let body = property
                .as_object()
                .ok_or_else(|| SchemaError::MissingType(name.clone()))?;
            let keyword = body
                .get("type")
                .and_then(Value::as_str)
                .ok_or_else(|| SchemaError::MissingType(name.clone()))?;
            let kind = ParamKind::from_json_type(keyword).ok_or_else(|| {
                SchemaError::UnsupportedType {
                    name: name.clone(),
                    found: keyword.to_string(),
                }
            })?;
            let required = required_names.iter().any(|entry| entry == name);
            let default = body.get("default").cloned();
            if required && default.is_some() {
                return Err(SchemaError::DefaultOnRequired(name.clone()));
            }
            let fragment = matches!(kind, ParamKind::Object | ParamKind::Array)
                .then(|| property.clone());
            params.push(ParamSpec {
                name: name.clone(),
                kind,
                required,
                default,
                schema: fragment,
            });
        }
        Self::new(params)
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Incremental builder for [`ToolSchema`].
#[derive(Debug, Default)]
pub struct ToolSchemaBuilder {
    /// Parameters collected so far, in declaration order.
    params: Vec<ParamSpec>,
}

impl ToolSchemaBuilder {
    /// Declares a required caller-supplied parameter.
    #[must_use]
    pub fn required(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            kind,
            required: true,
            default: None,
            schema: None,
        });
        self
    }

    /// Declares an optional caller-supplied parameter with an optional default.
    #[must_use]
    pub fn optional(
        mut self,
        name: impl Into<String>,
        kind: ParamKind,
        default: Option<Value>,
    ) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            kind,
            required: false,
            default,
            schema: None,
        });
        self
    }

    /// Declares a server-filled injected request parameter.
    #[must_use]
    pub fn injected_request(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            kind: ParamKind::InjectedRequest,
            required: false,
            default: None,
            schema: None,
        });
        self
    }

    /// Declares a parameter from a full spec.
    #[must_use]
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Validates the declaration and builds the schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when the declaration is invalid.
    pub fn build(self) -> Result<ToolSchema, SchemaError> {
        ToolSchema::new(self.params)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates an ordered parameter declaration.
fn validate_params(params: &[ParamSpec]) -> Result<(), SchemaError> {
    for (index, param) in params.iter().enumerate() {
        if params[..index].iter().any(|earlier| earlier.name == param.name) {
            return Err(SchemaError::DuplicateParameter(param.name.clone()));
        }
        if param.kind == ParamKind::InjectedRequest {
            if param.default.is_some() {
                return Err(SchemaError::InjectedDefault(param.name.clone()));
            }
            if param.required {
                return Err(SchemaError::InjectedRequired(param.name.clone()));
            }
        }
        if let Some(default) = &param.default
            && !param.kind.matches(default)
        {
            return Err(SchemaError::DefaultKindMismatch {
                name: param.name.clone(),
                expected: param.kind.label(),
            });
        }
        if let Some(fragment) = &param.schema {
            if !fragment.is_object() {
                return Err(SchemaError::FragmentNotObject(param.name.clone()));
            }
            if !matches!(param.kind, ParamKind::Object | ParamKind::Array) {
                return Err(SchemaError::FragmentOnScalar(param.name.clone()));
            }
        }
    }
    Ok(())
}

/// Extracts the `required` name list from an adapted schema document.
fn required_list(root: &serde_json::Map<String, Value>) -> Result<Vec<String>, SchemaError> {
    let Some(value) = root.get("required") else {
        return Ok(Vec::new());
    };
    let entries = value.as_array().ok_or(SchemaError::NotAnObjectSchema)?;
    let mut names = Vec::with_capacity(entries.len());
    for entry in entries {
        let name = entry.as_str().ok_or(SchemaError::NotAnObjectSchema)?;
        names.push(name.to_string());
    }
    Ok(names)
}
