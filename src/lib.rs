//! OpenAPI Components Builder
//!
//! Turns JSON Schema model declarations into OpenAPI 3 `components.schemas`
//! entries and hands back `$ref` strings pointing at them.
//!
//! For each model the engine:
//!
//! 1. dereferences the schema (bundling file and URL refs, inlining local
//!    `definitions`, repairing degenerate root self-references),
//! 2. converts it into OpenAPI Schema Objects (extracting `definitions`,
//!    rewriting `if`/`then`/`else`, normalizing dialect keywords),
//! 3. registers the result under a unique component name.
//!
//! # Example
//!
//! ```
//! use oas_components::{Model, SchemaEngine};
//! use serde_json::json;
//!
//! let mut engine = SchemaEngine::new();
//! let model = Model::new(
//!     "ErrorResponse",
//!     json!({
//!         "type": "object",
//!         "properties": { "error": { "type": "string" } }
//!     }),
//! )
//! .content_type("application/json");
//!
//! let reference = engine.add_model(&model).unwrap();
//! assert_eq!(reference, "#/components/schemas/ErrorResponse");
//!
//! let components = engine.into_components();
//! assert_eq!(components["ErrorResponse"]["properties"]["error"]["type"], "string");
//! ```
//!
//! # Name Conflicts
//!
//! | Registry state for `name` | Result |
//! |---------------------------|--------|
//! | absent | stored under `name` |
//! | equal schema | nothing written, `name` returned |
//! | different schema | stored under `name-<uuid>` |

mod catalog;
mod converter;
mod engine;
mod error;
mod loader;
mod registry;
mod resolver;
mod types;

pub use catalog::{CatalogSources, ContentEntry, Model, ModelCatalog, ModelDeclaration};
pub use converter::{convert, ConvertedSchemas};
pub use engine::SchemaEngine;
pub use error::{CatalogError, ConvertError, EngineError, RegistryError, ResolveError};
pub use loader::{
    is_url, load_schema, load_schema_auto, load_schema_str, load_schema_yaml_str,
    navigate_fragment, DefaultFetcher, SchemaFetcher, UrlMapping,
};
pub use registry::ComponentRegistry;
pub use resolver::ReferenceResolver;
pub use types::{
    component_ref, ResolverOptions, SchemaLocation, SchemaSource, COMPONENT_REF_PREFIX,
    DEFAULT_MAX_REPAIR_PASSES,
};

#[cfg(feature = "remote")]
pub use loader::load_schema_url;
