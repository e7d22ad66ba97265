//! Model catalog - normalizes model declarations from a service
//! configuration into one canonical shape.
//!
//! Declarations come from three places, concatenated in this order:
//!
//! | Source | Path in the service configuration |
//! |--------|-----------------------------------|
//! | models | `custom.documentation.models` |
//! | models list | `custom.documentation.modelsList` |
//! | request schemas | `provider.apiGateway.request.schemas` |
//!
//! A declaration either carries `schema` directly or a `content` map keyed
//! by media type whose entry holds the schema.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::error::CatalogError;
use crate::types::SchemaSource;

const MODELS_PATH: &str = "/custom/documentation/models";
const MODELS_LIST_PATH: &str = "/custom/documentation/modelsList";
const REQUEST_SCHEMAS_PATH: &str = "/provider/apiGateway/request/schemas";

/// A model as written in configuration, before normalization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDeclaration {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub schema: Option<Value>,
    #[serde(default)]
    pub content: IndexMap<String, ContentEntry>,
}

/// One media type entry of a declaration's `content` map.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentEntry {
    #[serde(default)]
    pub schema: Option<Value>,
}

/// A normalized model.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub name: String,
    pub description: Option<String>,
    /// `None` means unspecified; it is never guessed.
    pub content_type: Option<String>,
    pub schema: SchemaSource,
}

impl Model {
    pub fn new(name: impl Into<String>, schema: impl Into<SchemaSource>) -> Self {
        Self {
            name: name.into(),
            description: None,
            content_type: None,
            schema: schema.into(),
        }
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl ModelDeclaration {
    /// Normalize into a [`Model`].
    ///
    /// `fallback_name` names declarations that omit `name` (request schemas
    /// are keyed by name in their map).
    pub fn normalize(self, origin: &str, fallback_name: Option<&str>) -> Result<Model, CatalogError> {
        let name = match (self.name, fallback_name) {
            (Some(name), _) => name,
            (None, Some(key)) => key.to_string(),
            (None, None) => {
                return Err(CatalogError::MissingName {
                    origin: origin.to_string(),
                })
            }
        };

        let (content_type, raw) = match self.schema {
            Some(schema) => {
                // A single content entry still tells us the media type.
                let derived = if self.content.len() == 1 {
                    self.content.keys().next().cloned()
                } else {
                    None
                };
                (self.content_type.or(derived), schema)
            }
            None => {
                if self.content.len() > 1 {
                    tracing::warn!(model = %name, entries = self.content.len(), "using first content entry");
                }
                let Some((media_type, entry)) = self.content.into_iter().next() else {
                    return Err(CatalogError::MissingSchema { name });
                };
                let Some(schema) = entry.schema else {
                    return Err(CatalogError::MissingSchema { name });
                };
                (self.content_type.or(Some(media_type)), schema)
            }
        };

        let schema = SchemaSource::from_value(raw).map_err(|source| CatalogError::InvalidSource {
            name: name.clone(),
            source,
        })?;

        Ok(Model {
            name,
            description: self.description,
            content_type,
            schema,
        })
    }
}

/// Raw declarations grouped by where they were found.
#[derive(Debug, Clone, Default)]
pub struct CatalogSources {
    pub models: Vec<ModelDeclaration>,
    pub models_list: Vec<ModelDeclaration>,
    pub request_schemas: IndexMap<String, ModelDeclaration>,
}

impl CatalogSources {
    /// Pull declarations out of a service configuration document.
    ///
    /// Missing or null sections are empty.
    pub fn from_service(config: &Value) -> Result<Self, CatalogError> {
        Ok(Self {
            models: section(config, MODELS_PATH)?,
            models_list: section(config, MODELS_LIST_PATH)?,
            request_schemas: section(config, REQUEST_SCHEMAS_PATH)?,
        })
    }
}

fn section<T>(config: &Value, pointer: &str) -> Result<T, CatalogError>
where
    T: Default + for<'de> Deserialize<'de>,
{
    match config.pointer(pointer) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value.clone()).map_err(|source| {
            CatalogError::InvalidDeclaration {
                origin: origin_name(pointer),
                source,
            }
        }),
    }
}

fn origin_name(pointer: &str) -> String {
    pointer.trim_start_matches('/').replace('/', ".")
}

/// Normalized models in processing order.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    models: Vec<Model>,
}

impl ModelCatalog {
    /// Normalize and concatenate every source.
    ///
    /// Later duplicates of a name are kept; they are registered later and
    /// so are the ones renamed on conflict.
    pub fn from_sources(sources: CatalogSources) -> Result<Self, CatalogError> {
        let mut models = Vec::new();

        let models_origin = origin_name(MODELS_PATH);
        for decl in sources.models {
            models.push(decl.normalize(&models_origin, None)?);
        }

        let list_origin = origin_name(MODELS_LIST_PATH);
        for decl in sources.models_list {
            models.push(decl.normalize(&list_origin, None)?);
        }

        let request_origin = origin_name(REQUEST_SCHEMAS_PATH);
        for (key, decl) in sources.request_schemas {
            models.push(decl.normalize(&request_origin, Some(&key))?);
        }

        Ok(Self { models })
    }

    /// Shorthand for [`CatalogSources::from_service`] then [`from_sources`](Self::from_sources).
    pub fn from_service(config: &Value) -> Result<Self, CatalogError> {
        Self::from_sources(CatalogSources::from_service(config)?)
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Model> {
        self.models.iter()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl From<Vec<Model>> for ModelCatalog {
    fn from(models: Vec<Model>) -> Self {
        Self { models }
    }
}

impl<'a> IntoIterator for &'a ModelCatalog {
    type Item = &'a Model;
    type IntoIter = std::slice::Iter<'a, Model>;

    fn into_iter(self) -> Self::IntoIter {
        self.models.iter()
    }
}
