//! Component registry - the `components.schemas` namespace of one run.
//!
//! Names are unique at all times. Registering a name that is already taken
//! by an equal schema is a no-op; registering it with a different schema
//! mints `{name}-{uuid}` and leaves the original entry alone. Entries are
//! never removed or merged, so every `$ref` handed out stays valid for the
//! lifetime of the registry.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::converter::ConvertedSchemas;
use crate::error::RegistryError;
use crate::types::{component_ref, COMPONENT_REF_PREFIX, DATA_KEYWORDS, SCHEMA_MAP_KEYWORDS};

/// How many minted names are tried before giving up.
const MAX_MINT_ATTEMPTS: usize = 8;

/// Owned `components.schemas` map with rename-on-conflict registration.
pub struct ComponentRegistry {
    schemas: IndexMap<String, Value>,
    token: Box<dyn FnMut() -> String>,
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("schemas", &self.schemas)
            .finish_non_exhaustive()
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of looking up a name for a schema.
enum Placement {
    /// An equal schema is already stored under this name.
    Existing(String),
    /// The schema should be inserted under this name.
    Insert(String),
}

impl ComponentRegistry {
    /// Empty registry minting UUID v4 suffixes.
    pub fn new() -> Self {
        Self::from_schemas(IndexMap::new())
    }

    /// Registry seeded with schemas already present in the document.
    pub fn from_schemas(schemas: IndexMap<String, Value>) -> Self {
        Self {
            schemas,
            token: Box::new(|| Uuid::new_v4().to_string()),
        }
    }

    /// Replace the suffix generator used when minting names.
    pub fn with_token_source(mut self, token: impl FnMut() -> String + 'static) -> Self {
        self.token = Box::new(token);
        self
    }

    /// Format the `$ref` string for a component name.
    pub fn to_ref(name: &str) -> String {
        component_ref(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Deep equality between `schema` and the entry stored under `name`.
    ///
    /// Object key order is ignored. Returns false if `name` is not registered.
    pub fn is_same_schema(&self, schema: &Value, name: &str) -> bool {
        self.schemas.get(name) == Some(schema)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }

    /// Insert or overwrite `name` unconditionally.
    ///
    /// Bypasses the rename policy; prefer [`register`](Self::register).
    pub fn add(&mut self, name: impl Into<String>, schema: Value) {
        self.schemas.insert(name.into(), schema);
    }

    /// Register `schema` under `name`, returning the name it ended up under.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Conflict` if no free name could be minted.
    pub fn register(&mut self, name: &str, schema: Value) -> Result<String, RegistryError> {
        match self.place(name, &schema, &IndexMap::new(), None)? {
            Placement::Existing(existing) => Ok(existing),
            Placement::Insert(final_name) => {
                self.schemas.insert(final_name.clone(), schema);
                Ok(final_name)
            }
        }
    }

    /// Register every schema of one conversion, all or nothing.
    ///
    /// Extracted schemas are placed before `primary`, and refs between
    /// entries of the set follow any renames. Nothing is written unless every
    /// entry gets a name. Returns the final name of `primary`.
    pub fn register_set(
        &mut self,
        primary: &str,
        mut set: ConvertedSchemas,
    ) -> Result<String, RegistryError> {
        let primary_schema = set.shift_remove(primary);
        let entries: Vec<(String, Value)> = set
            .into_iter()
            .chain(primary_schema.map(|schema| (primary.to_string(), schema)))
            .collect();

        // A rename changes the content of entries referring to it, which can
        // in turn change whether they match what is already registered.
        let mut renames: HashMap<String, String> = HashMap::new();
        for _ in 0..=entries.len() {
            let (staged, next) = self.stage(&entries, &renames)?;
            if next == renames {
                self.schemas.extend(staged);
                return Ok(renames
                    .get(primary)
                    .cloned()
                    .unwrap_or_else(|| primary.to_string()));
            }
            renames = next;
        }

        Err(RegistryError::Conflict {
            name: primary.to_string(),
            attempts: entries.len() + 1,
        })
    }

    pub fn schemas(&self) -> &IndexMap<String, Value> {
        &self.schemas
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn into_schemas(self) -> IndexMap<String, Value> {
        self.schemas
    }

    /// The registry as a JSON object, ready for `components.schemas`.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.schemas
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<String, Value>>(),
        )
    }

    /// Place every entry with refs rewritten against `renames`.
    ///
    /// Returns the staged inserts and the renames this placement implies.
    fn stage(
        &mut self,
        entries: &[(String, Value)],
        renames: &HashMap<String, String>,
    ) -> Result<(IndexMap<String, Value>, HashMap<String, String>), RegistryError> {
        let mut staged: IndexMap<String, Value> = IndexMap::new();
        let mut next: HashMap<String, String> = HashMap::new();

        for (name, schema) in entries {
            let mut schema = schema.clone();
            if !renames.is_empty() {
                rewrite_component_refs(&mut schema, renames);
            }

            let final_name = match self.place(name, &schema, &staged, renames.get(name))? {
                Placement::Existing(existing) => existing,
                Placement::Insert(final_name) => {
                    staged.insert(final_name.clone(), schema);
                    final_name
                }
            };
            if final_name != *name {
                next.insert(name.clone(), final_name);
            }
        }

        Ok((staged, next))
    }

    /// Decide where `schema` goes. `minted` is a name minted for it on an
    /// earlier staging pass and is reused while it is still free.
    fn place(
        &mut self,
        name: &str,
        schema: &Value,
        staged: &IndexMap<String, Value>,
        minted: Option<&String>,
    ) -> Result<Placement, RegistryError> {
        let current = staged.get(name).or_else(|| self.schemas.get(name));
        match current {
            None => Ok(Placement::Insert(name.to_string())),
            Some(existing) if existing == schema => {
                tracing::debug!(name = %name, "schema already registered");
                Ok(Placement::Existing(name.to_string()))
            }
            Some(_) => {
                if let Some(prior) = minted {
                    if !staged.contains_key(prior) && !self.schemas.contains_key(prior) {
                        return Ok(Placement::Insert(prior.clone()));
                    }
                }
                for _ in 0..MAX_MINT_ATTEMPTS {
                    let candidate = format!("{}-{}", name, (self.token)());
                    if !staged.contains_key(&candidate) && !self.schemas.contains_key(&candidate) {
                        tracing::warn!(name = %name, renamed = %candidate, "component name taken by a different schema");
                        return Ok(Placement::Insert(candidate));
                    }
                }
                Err(RegistryError::Conflict {
                    name: name.to_string(),
                    attempts: MAX_MINT_ATTEMPTS,
                })
            }
        }
    }
}

/// Point component refs at renamed entries.
fn rewrite_component_refs(value: &mut Value, renames: &HashMap<String, String>) {
    match value {
        Value::Object(obj) => {
            if let Some(Value::String(reference)) = obj.get_mut("$ref") {
                if let Some(rewritten) = renamed_ref(reference, renames) {
                    *reference = rewritten;
                }
            }
            for (key, child) in obj.iter_mut() {
                match key.as_str() {
                    "$ref" => {}
                    k if DATA_KEYWORDS.contains(&k) => {}
                    k if SCHEMA_MAP_KEYWORDS.contains(&k) => {
                        if let Value::Object(map) = child {
                            for schema in map.values_mut() {
                                rewrite_component_refs(schema, renames);
                            }
                        }
                    }
                    _ => rewrite_component_refs(child, renames),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                rewrite_component_refs(item, renames);
            }
        }
        _ => {}
    }
}

fn renamed_ref(reference: &str, renames: &HashMap<String, String>) -> Option<String> {
    let rest = reference.strip_prefix(COMPONENT_REF_PREFIX)?;
    let (name, pointer) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };
    renames
        .get(name)
        .map(|renamed| format!("{}{}", component_ref(renamed), pointer))
}
