//! Schema loading from various sources.
//!
//! Handles loading schema documents from files (JSON or YAML), strings, and
//! HTTP URLs, and defines the [`SchemaFetcher`] seam the resolver uses for
//! all I/O.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::ResolveError;
use crate::types::SchemaLocation;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Retrieves schema documents for the resolver.
///
/// Injected so resolution can run without real network or disk access.
/// Retries, caching, or auth belong in implementations of this trait.
pub trait SchemaFetcher {
    /// Fetch and parse the document at `location`.
    fn fetch(&self, location: &SchemaLocation) -> Result<Value, ResolveError>;
}

impl<F> SchemaFetcher for F
where
    F: Fn(&SchemaLocation) -> Result<Value, ResolveError>,
{
    fn fetch(&self, location: &SchemaLocation) -> Result<Value, ResolveError> {
        self(location)
    }
}

/// Maps URLs under `remote_base` onto files under `local_base`.
///
/// # Example
/// ```text
/// remote_base = "https://schemas.example.com/v1"
/// local_base = Path::new("schemas")
/// $ref = "https://schemas.example.com/v1/error.json" -> "schemas/error.json"
/// ```
#[derive(Debug, Clone)]
pub struct UrlMapping {
    pub remote_base: String,
    pub local_base: PathBuf,
}

impl UrlMapping {
    /// Local path for `url`, if it falls under the remote base.
    pub fn map(&self, url: &str) -> Option<PathBuf> {
        let remainder = url.strip_prefix(self.remote_base.trim_end_matches('/'))?;
        Some(self.local_base.join(remainder.trim_start_matches('/')))
    }
}

/// Fetcher backed by the local filesystem and, with the `remote` feature,
/// a blocking HTTP client.
#[derive(Debug, Clone, Default)]
pub struct DefaultFetcher {
    mapping: Option<UrlMapping>,
}

impl DefaultFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve URLs under `remote_base` from `local_base` instead of the network.
    pub fn with_url_mapping(remote_base: impl Into<String>, local_base: impl AsRef<Path>) -> Self {
        Self {
            mapping: Some(UrlMapping {
                remote_base: remote_base.into(),
                local_base: local_base.as_ref().to_path_buf(),
            }),
        }
    }
}

impl SchemaFetcher for DefaultFetcher {
    fn fetch(&self, location: &SchemaLocation) -> Result<Value, ResolveError> {
        match location {
            SchemaLocation::File(path) => load_schema(path),
            SchemaLocation::Url(url) => {
                if url.scheme() == "file" {
                    let path = url.to_file_path().map_err(|_| ResolveError::InvalidUrl {
                        url: url.to_string(),
                        message: "not a valid file URL".to_string(),
                    })?;
                    return load_schema(&path);
                }
                if let Some(path) = self.mapping.as_ref().and_then(|m| m.map(url.as_str())) {
                    tracing::debug!(url = %url, path = %path.display(), "serving remote schema from local mapping");
                    return load_schema(&path);
                }
                load_schema_auto(url.as_str())
            }
        }
    }
}

/// Load a schema from a file path.
///
/// Files ending in `.yaml` or `.yml` are parsed as YAML, everything else as JSON.
///
/// # Errors
///
/// Returns `ResolveError::FileNotFound` if the file doesn't exist,
/// or `ResolveError::InvalidJson`/`InvalidYaml` if the content doesn't parse.
pub fn load_schema(path: &Path) -> Result<Value, ResolveError> {
    if !path.exists() {
        return Err(ResolveError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| ResolveError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    if is_yaml_path(&path.to_string_lossy()) {
        load_schema_yaml_str(&content)
    } else {
        load_schema_str(&content)
    }
}

/// Load a schema from a JSON string.
///
/// # Errors
///
/// Returns `ResolveError::InvalidJson` if the string isn't valid JSON.
pub fn load_schema_str(content: &str) -> Result<Value, ResolveError> {
    serde_json::from_str(content).map_err(|source| ResolveError::InvalidJson { source })
}

/// Load a schema from a YAML string.
pub fn load_schema_yaml_str(content: &str) -> Result<Value, ResolveError> {
    serde_yaml::from_str(content).map_err(|source| ResolveError::InvalidYaml { source })
}

/// Load a schema from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `ResolveError::HttpStatus` for non-2xx responses,
/// `ResolveError::NetworkError` if the request fails, or a parse error if
/// the body isn't a valid document.
#[cfg(feature = "remote")]
pub fn load_schema_url(url: &str) -> Result<Value, ResolveError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|source| ResolveError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    let response = client
        .get(url)
        .send()
        .map_err(|source| ResolveError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    // Check for HTTP errors before parsing
    let status = response.status();
    if !status.is_success() {
        return Err(ResolveError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response
        .text()
        .map_err(|source| ResolveError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    if is_yaml_path(url) {
        load_schema_yaml_str(&body)
    } else {
        load_schema_str(&body)
    }
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

fn is_yaml_path(s: &str) -> bool {
    let path = s.split(['?', '#']).next().unwrap_or(s);
    path.ends_with(".yaml") || path.ends_with(".yml")
}

/// Navigate a JSON Pointer fragment (e.g., "#/definitions/foo" or "#/properties/bar").
///
/// Returns the value at the given JSON Pointer path within the schema.
/// The fragment should start with '#'; an empty pointer is the document root.
///
/// # Errors
///
/// Returns `ResolveError::TargetNotFound` if any segment is missing.
pub fn navigate_fragment<'a>(schema: &'a Value, fragment: &str) -> Result<&'a Value, ResolveError> {
    // Remove leading # and split by /
    let path = fragment.trim_start_matches('#').trim_start_matches('/');
    if path.is_empty() {
        return Ok(schema);
    }

    let mut current = schema;
    for part in path.split('/') {
        // Unescape JSON Pointer encoding (~1 = /, ~0 = ~)
        let key = part.replace("~1", "/").replace("~0", "~");
        let next = match current {
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            other => other.get(&key),
        };
        current = next.ok_or_else(|| ResolveError::TargetNotFound {
            reference: fragment.to_string(),
        })?;
    }
    Ok(current)
}

/// Load a schema from a file path or URL.
///
/// Automatically detects whether the source is a URL or file path.
/// URL loading requires the `remote` feature.
///
/// # Errors
///
/// Returns appropriate errors based on the source type.
pub fn load_schema_auto(source: &str) -> Result<Value, ResolveError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_schema_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(ResolveError::RemoteDisabled {
                url: source.to_string(),
            })
        }
    } else {
        load_schema(Path::new(source))
    }
}
