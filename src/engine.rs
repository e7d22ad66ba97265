//! Per-run orchestration: catalog -> resolver -> converter -> registry.

use indexmap::IndexMap;
use serde_json::Value;

use crate::catalog::{Model, ModelCatalog};
use crate::converter::convert;
use crate::error::{ConvertError, EngineError, ResolveError};
use crate::loader::{DefaultFetcher, SchemaFetcher};
use crate::registry::ComponentRegistry;
use crate::resolver::ReferenceResolver;
use crate::types::{ResolverOptions, SchemaSource};

/// Builds `components.schemas` for one generation run.
///
/// Holds the registry and the model reference table. Build a fresh engine
/// for every run; nothing is shared between runs.
#[derive(Debug)]
pub struct SchemaEngine<F: SchemaFetcher = DefaultFetcher> {
    fetcher: F,
    options: ResolverOptions,
    registry: ComponentRegistry,
    model_refs: IndexMap<String, String>,
}

impl SchemaEngine<DefaultFetcher> {
    pub fn new() -> Self {
        Self::with_fetcher(DefaultFetcher::new())
    }
}

impl Default for SchemaEngine<DefaultFetcher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: SchemaFetcher> SchemaEngine<F> {
    /// Engine fetching external documents through `fetcher`.
    pub fn with_fetcher(fetcher: F) -> Self {
        Self {
            fetcher,
            options: ResolverOptions::default(),
            registry: ComponentRegistry::new(),
            model_refs: IndexMap::new(),
        }
    }

    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    /// Start from an existing registry, e.g. one seeded with hand-written components.
    pub fn with_registry(mut self, registry: ComponentRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register one model and record its `$ref` under the model's name.
    ///
    /// A later model with the same name replaces the earlier table entry.
    pub fn add_model(&mut self, model: &Model) -> Result<String, EngineError> {
        let reference = self.register_source(&model.name, &model.schema)?;
        tracing::info!(
            model = %model.name,
            content_type = model.content_type.as_deref().unwrap_or("unspecified"),
            reference = %reference,
            "registered model"
        );
        self.model_refs.insert(model.name.clone(), reference.clone());
        Ok(reference)
    }

    /// Register every model in catalog order, stopping at the first failure.
    ///
    /// Models registered before the failure stay registered.
    pub fn add_models(&mut self, catalog: &ModelCatalog) -> Result<(), EngineError> {
        for model in catalog {
            self.add_model(model)?;
        }
        Ok(())
    }

    /// Register an ad-hoc schema and return its `$ref`.
    ///
    /// With no schema, `name` must already be a registered model and its
    /// reference is returned.
    pub fn create_schema(
        &mut self,
        name: &str,
        schema: Option<&SchemaSource>,
    ) -> Result<String, EngineError> {
        match schema {
            Some(source) => self.register_source(name, source),
            None => self
                .model_ref(name)
                .map(str::to_string)
                .ok_or_else(|| EngineError::Convert {
                    model: name.to_string(),
                    source: ConvertError::MissingSchema {
                        name: name.to_string(),
                    },
                }),
        }
    }

    /// Dereference without registering anything.
    pub fn dereference(&self, source: &SchemaSource) -> Result<Value, ResolveError> {
        ReferenceResolver::new(&self.fetcher)
            .with_options(self.options.clone())
            .dereference(source)
    }

    /// `$ref` of an already-registered model.
    pub fn model_ref(&self, name: &str) -> Option<&str> {
        self.model_refs.get(name).map(String::as_str)
    }

    pub fn model_refs(&self) -> &IndexMap<String, String> {
        &self.model_refs
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Consume the engine, yielding the accumulated `components.schemas`.
    pub fn into_components(self) -> IndexMap<String, Value> {
        self.registry.into_schemas()
    }

    fn register_source(&mut self, name: &str, source: &SchemaSource) -> Result<String, EngineError> {
        let dereferenced = self.dereference(source).map_err(|source| EngineError::Resolve {
            model: name.to_string(),
            source,
        })?;

        let converted = convert(&dereferenced, name).map_err(|source| EngineError::Convert {
            model: name.to_string(),
            source,
        })?;
        let count = converted.len();

        let final_name = self
            .registry
            .register_set(name, converted)
            .map_err(|source| EngineError::Registry {
                model: name.to_string(),
                source,
            })?;

        tracing::debug!(name = %name, component = %final_name, schemas = count, "registered schema set");
        Ok(ComponentRegistry::to_ref(&final_name))
    }
}
