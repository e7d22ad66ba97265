//! Core types shared by the resolver, converter, and registry.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;
use url::Url;

use crate::error::ResolveError;
use crate::loader::is_url;

/// Prefix of every reference minted for `components.schemas`.
pub const COMPONENT_REF_PREFIX: &str = "#/components/schemas/";

/// Keywords holding local, referenceable sub-schemas.
pub const DEFINITION_KEYWORDS: &[&str] = &["definitions", "$defs"];

/// Keywords whose values are instance data rather than schemas.
pub const DATA_KEYWORDS: &[&str] = &["enum", "const", "default", "example", "examples"];

/// Keywords mapping arbitrary names to sub-schemas.
pub const SCHEMA_MAP_KEYWORDS: &[&str] = &[
    "properties",
    "patternProperties",
    "definitions",
    "$defs",
    "dependencies",
    "dependentSchemas",
];

/// Default bound on self-reference repair passes.
pub const DEFAULT_MAX_REPAIR_PASSES: usize = 5;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Format the `$ref` string for a registered component.
pub fn component_ref(name: &str) -> String {
    format!("{}{}", COMPONENT_REF_PREFIX, name)
}

/// Where a schema comes from.
///
/// Model declarations carry either an inline JSON Schema or a string naming
/// a document to fetch. The string form is classified once, up front, so the
/// resolver never has to guess from runtime types.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaSource {
    /// Schema given directly as JSON.
    Inline(Value),
    /// Schema document served over HTTP(S).
    Remote(Url),
    /// Schema document on the local filesystem (JSON or YAML).
    File(PathBuf),
}

impl SchemaSource {
    /// Classify a raw declaration value.
    ///
    /// Strings become `Remote` or `File`; anything else is `Inline`.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::InvalidUrl` for strings that look like URLs but
    /// do not parse.
    pub fn from_value(value: Value) -> Result<Self, ResolveError> {
        match value {
            Value::String(s) => Self::parse(&s),
            other => Ok(SchemaSource::Inline(other)),
        }
    }

    /// Classify a string naming a schema document.
    pub fn parse(source: &str) -> Result<Self, ResolveError> {
        if is_url(source) {
            let url = Url::parse(source).map_err(|e| ResolveError::InvalidUrl {
                url: source.to_string(),
                message: e.to_string(),
            })?;
            return Ok(SchemaSource::Remote(url));
        }

        if source.starts_with("file://") {
            let path = Url::parse(source)
                .ok()
                .and_then(|u| u.to_file_path().ok())
                .ok_or_else(|| ResolveError::InvalidUrl {
                    url: source.to_string(),
                    message: "not a valid file URL".to_string(),
                })?;
            return Ok(SchemaSource::File(path));
        }

        Ok(SchemaSource::File(PathBuf::from(source)))
    }
}

impl From<Value> for SchemaSource {
    fn from(value: Value) -> Self {
        SchemaSource::Inline(value)
    }
}

/// A fetchable schema document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SchemaLocation {
    Url(Url),
    File(PathBuf),
}

impl fmt::Display for SchemaLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaLocation::Url(url) => write!(f, "{}", url),
            SchemaLocation::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Options for reference resolution.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Directory that relative file refs in inline schemas resolve against.
    pub base_dir: PathBuf,
    /// Upper bound on self-reference repair passes before giving up.
    pub max_repair_passes: usize,
}

impl ResolverOptions {
    /// Options resolving relative refs against the current directory.
    pub fn new() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            max_repair_passes: DEFAULT_MAX_REPAIR_PASSES,
        }
    }

    /// Set the directory for relative file refs.
    pub fn base_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.base_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the repair pass bound (at least one pass is always allowed).
    pub fn max_repair_passes(mut self, passes: usize) -> Self {
        self.max_repair_passes = passes.max(1);
        self
    }
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self::new()
    }
}
