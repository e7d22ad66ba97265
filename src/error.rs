//! Error types for schema resolution, conversion, and registration.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while locating, fetching, or dereferencing a schema.
#[derive(Debug, Error)]
pub enum ResolveError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to fetch {url}: HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("cannot fetch {url}: remote schemas are disabled")]
    RemoteDisabled { url: String },

    #[error("cannot resolve $ref \"{reference}\": {source}")]
    ExternalRef {
        reference: String,
        #[source]
        source: Box<ResolveError>,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML: {source}")]
    InvalidYaml {
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    // Reference errors (exit code 2)
    #[error("$ref target not found: {reference}")]
    TargetNotFound { reference: String },

    #[error("circular reference detected: {reference}")]
    CircularReference { reference: String },

    #[error("self-reference repair of \"{reference}\" did not converge after {passes} passes")]
    RepairDidNotConverge { reference: String, passes: usize },

    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },
}

impl ResolveError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ResolveError::FileNotFound { .. }
            | ResolveError::ReadError { .. }
            | ResolveError::HttpStatus { .. }
            | ResolveError::RemoteDisabled { .. } => 3,
            #[cfg(feature = "remote")]
            ResolveError::NetworkError { .. } => 3,
            ResolveError::ExternalRef { source, .. } => source.exit_code(),
            _ => 2,
        }
    }

    /// The innermost error, skipping `ExternalRef` wrappers.
    pub fn root_cause(&self) -> &ResolveError {
        match self {
            ResolveError::ExternalRef { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Errors while rewriting a schema into OpenAPI Schema Objects.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("no schema given for '{name}'")]
    MissingSchema { name: String },

    #[error("cannot convert '{name}': expected a schema object, got {actual}")]
    UnsupportedSchema { name: String, actual: String },

    #[error("cannot convert '{name}': extracted schema name '{clash}' is already taken")]
    NameClash { name: String, clash: String },
}

/// Invariant violations inside the component registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("could not mint a unique component name for '{name}' after {attempts} attempts")]
    Conflict { name: String, attempts: usize },
}

/// Errors while normalizing model declarations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("model declaration in {origin} has no name")]
    MissingName { origin: String },

    #[error("model '{name}' has neither a schema nor a content entry")]
    MissingSchema { name: String },

    #[error("invalid model declarations in {origin}: {source}")]
    InvalidDeclaration {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("model '{name}' has an invalid schema source: {source}")]
    InvalidSource {
        name: String,
        #[source]
        source: ResolveError,
    },
}

/// Errors raised while registering one model or schema, tagged with its name.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("error dereferencing '{model}' schema: {source}")]
    Resolve {
        model: String,
        #[source]
        source: ResolveError,
    },

    #[error("error converting '{model}' schema: {source}")]
    Convert {
        model: String,
        #[source]
        source: ConvertError,
    },

    #[error("error registering '{model}' schema: {source}")]
    Registry {
        model: String,
        #[source]
        source: RegistryError,
    },
}

impl EngineError {
    /// Name of the model or schema being processed when the error occurred.
    pub fn model(&self) -> &str {
        match self {
            EngineError::Resolve { model, .. }
            | EngineError::Convert { model, .. }
            | EngineError::Registry { model, .. } => model,
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::Resolve { source, .. } => source.exit_code(),
            _ => 2,
        }
    }
}

impl CatalogError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            CatalogError::InvalidSource { source, .. } => source.exit_code(),
            _ => 2,
        }
    }
}
