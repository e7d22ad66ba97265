//! Reference resolution - turns a schema with local, cross-document, and
//! remote `$ref`s into one self-contained tree.
//!
//! Resolution runs in three steps:
//!
//! 1. **Bundle**: every external target (file or URL, with optional JSON
//!    Pointer fragment) is fetched once, hoisted into the root's
//!    `definitions`, and the `$ref` is rewritten to point at it. Internal refs
//!    inside fetched documents are hoisted the same way, so cross-references
//!    stay pointers within the combined document.
//! 2. **Dereference**: every internal `$ref` is replaced by the value it
//!    points at. Refs into `#/components/schemas/` are left alone; they are
//!    deliberate cross-references to other registered components.
//! 3. **Repair**: a root that is itself a `$ref` into its own `definitions`
//!    cannot be inlined into itself and collapses to `{"$ref": "#"}`. The
//!    referenced entry is merged into the root, the `$ref` dropped, and the
//!    tree resolved again. The number of repair passes is bounded.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use serde_json::{json, Map, Value};
use url::Url;

use crate::error::ResolveError;
use crate::loader::{is_url, navigate_fragment, SchemaFetcher};
use crate::types::{
    ResolverOptions, SchemaLocation, SchemaSource, COMPONENT_REF_PREFIX, DATA_KEYWORDS,
    DEFINITION_KEYWORDS, SCHEMA_MAP_KEYWORDS,
};

/// Namespace external targets are hoisted into.
const BUNDLE_NAMESPACE: &str = "definitions";

/// Resolves `$ref`s using an injected [`SchemaFetcher`].
pub struct ReferenceResolver<'a> {
    fetcher: &'a dyn SchemaFetcher,
    options: ResolverOptions,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(fetcher: &'a dyn SchemaFetcher) -> Self {
        Self {
            fetcher,
            options: ResolverOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    /// Produce a fully dereferenced schema tree.
    ///
    /// Remote and file sources are fetched first and treated as inline
    /// schemas whose relative refs resolve against their own location.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError` if a document cannot be fetched or parsed, a
    /// pointer has no target, refs form a cycle, or self-reference repair
    /// does not converge within `max_repair_passes`.
    pub fn dereference(&self, source: &SchemaSource) -> Result<Value, ResolveError> {
        let (mut current, base, location) = self.load_root(source)?;
        let mut passes = 0;
        let mut repaired = false;

        loop {
            let bundled = self.bundle_document(current, &base, location.as_ref())?;
            let mut dereferenced = dereference_tree(&bundled)?;

            if !is_degenerate(&dereferenced) {
                if repaired {
                    strip_definitions(&mut dereferenced);
                }
                return Ok(dereferenced);
            }

            let reference = root_reference(&bundled).unwrap_or("#").to_string();
            passes += 1;
            if passes > self.options.max_repair_passes {
                return Err(ResolveError::RepairDidNotConverge {
                    reference,
                    passes: self.options.max_repair_passes,
                });
            }

            tracing::warn!(reference = %reference, pass = passes, "repairing degenerate self-reference");
            current = repair_root(bundled, &reference)?;
            repaired = true;
        }
    }

    /// Inline every external target into the root document's `definitions`.
    ///
    /// The result still contains internal `$ref`s; see [`dereference`](Self::dereference).
    pub fn bundle(&self, source: &SchemaSource) -> Result<Value, ResolveError> {
        let (root, base, location) = self.load_root(source)?;
        self.bundle_document(root, &base, location.as_ref())
    }

    fn load_root(
        &self,
        source: &SchemaSource,
    ) -> Result<(Value, Base, Option<SchemaLocation>), ResolveError> {
        let location = match source {
            SchemaSource::Inline(value) => {
                return Ok((value.clone(), Base::Dir(self.options.base_dir.clone()), None));
            }
            SchemaSource::Remote(url) => SchemaLocation::Url(url.clone()),
            SchemaSource::File(path) => SchemaLocation::File(self.options.base_dir.join(path)),
        };

        let root = self
            .fetcher
            .fetch(&location)
            .map_err(|source| ResolveError::ExternalRef {
                reference: location.to_string(),
                source: Box::new(source),
            })?;
        Ok((root, Base::of(&location), Some(location)))
    }

    fn bundle_document(
        &self,
        mut root: Value,
        base: &Base,
        location: Option<&SchemaLocation>,
    ) -> Result<Value, ResolveError> {
        let mut bundler = Bundler::new(self.fetcher, &root);
        if let Some(location) = location {
            bundler.documents.insert(location.clone(), root.clone());
        }
        bundler.walk(&mut root, base, None)?;

        if bundler.definitions.is_empty() {
            return Ok(root);
        }

        let Value::Object(obj) = &mut root else {
            return Err(ResolveError::InvalidSchema {
                message: "external $ref targets need an object root to bundle into".to_string(),
            });
        };
        let namespace = obj
            .entry(BUNDLE_NAMESPACE)
            .or_insert_with(|| Value::Object(Map::new()));
        let Value::Object(defs) = namespace else {
            return Err(ResolveError::InvalidSchema {
                message: format!("\"{}\" must be an object", BUNDLE_NAMESPACE),
            });
        };
        defs.extend(bundler.definitions);
        Ok(root)
    }
}

/// Base that relative document references resolve against.
#[derive(Debug, Clone)]
enum Base {
    Dir(PathBuf),
    Url(Url),
}

impl Base {
    fn of(location: &SchemaLocation) -> Base {
        match location {
            SchemaLocation::File(path) => Base::Dir(
                path.parent()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| PathBuf::from(".")),
            ),
            SchemaLocation::Url(url) => Base::Url(url.clone()),
        }
    }

    fn resolve(&self, document: &str) -> Result<SchemaLocation, ResolveError> {
        let invalid = |e: url::ParseError| ResolveError::InvalidUrl {
            url: document.to_string(),
            message: e.to_string(),
        };

        if is_url(document) {
            return Url::parse(document).map(SchemaLocation::Url).map_err(invalid);
        }

        match self {
            Base::Url(base) => {
                let joined = base.join(document).map_err(invalid)?;
                if joined.scheme() == "file" {
                    if let Ok(path) = joined.to_file_path() {
                        return Ok(SchemaLocation::File(path));
                    }
                }
                Ok(SchemaLocation::Url(joined))
            }
            Base::Dir(dir) => Ok(SchemaLocation::File(dir.join(document))),
        }
    }
}

/// State for one bundling pass over a root document.
struct Bundler<'a> {
    fetcher: &'a dyn SchemaFetcher,
    /// Fetched documents, keyed by location.
    documents: HashMap<SchemaLocation, Value>,
    /// `location#fragment` -> hoisted definition name.
    hoisted: HashMap<String, String>,
    /// Names already present in, or hoisted into, the root namespace.
    taken: HashSet<String>,
    /// Hoisted targets in the order they were first encountered.
    definitions: Map<String, Value>,
}

impl<'a> Bundler<'a> {
    fn new(fetcher: &'a dyn SchemaFetcher, root: &Value) -> Self {
        let taken = root
            .get(BUNDLE_NAMESPACE)
            .and_then(Value::as_object)
            .map(|defs| defs.keys().cloned().collect())
            .unwrap_or_default();

        Self {
            fetcher,
            documents: HashMap::new(),
            hoisted: HashMap::new(),
            taken,
            definitions: Map::new(),
        }
    }

    /// Walk `node`, rewriting refs that leave the root document.
    ///
    /// `current` is the fetched document `node` belongs to, or `None` for
    /// the root document.
    fn walk(
        &mut self,
        node: &mut Value,
        base: &Base,
        current: Option<&SchemaLocation>,
    ) -> Result<(), ResolveError> {
        match node {
            Value::Object(obj) => {
                if let Some(reference) = obj.get("$ref").and_then(Value::as_str).map(String::from)
                {
                    if let Some(rewritten) = self.rewrite(&reference, base, current)? {
                        obj.insert("$ref".to_string(), Value::String(rewritten));
                    }
                }
                for (key, value) in obj.iter_mut() {
                    match key.as_str() {
                        "$ref" => {}
                        k if DATA_KEYWORDS.contains(&k) => {}
                        k if SCHEMA_MAP_KEYWORDS.contains(&k) && value.is_object() => {
                            if let Value::Object(map) = value {
                                for schema in map.values_mut() {
                                    self.walk(schema, base, current)?;
                                }
                            }
                        }
                        _ => self.walk(value, base, current)?,
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.walk(item, base, current)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Returns the replacement `$ref`, or `None` to leave it untouched.
    fn rewrite(
        &mut self,
        reference: &str,
        base: &Base,
        current: Option<&SchemaLocation>,
    ) -> Result<Option<String>, ResolveError> {
        let (document, fragment) = split_reference(reference);

        let location = if document.is_empty() {
            match current {
                // Internal refs of the root stay as pointers for dereferencing
                None => return Ok(None),
                Some(location) => location.clone(),
            }
        } else {
            base.resolve(document)?
        };

        let key = format!("{}{}", location, fragment);
        if let Some(name) = self.hoisted.get(&key) {
            return Ok(Some(definition_ref(name)));
        }

        let wrap = |source: ResolveError| ResolveError::ExternalRef {
            reference: reference.to_string(),
            source: Box::new(source),
        };

        let doc = self.document(&location).map_err(wrap)?;
        let mut target = match navigate_fragment(doc, fragment) {
            Ok(target) => target.clone(),
            // An OpenAPI cross-reference the fetched document does not define
            Err(_) if reference.starts_with(COMPONENT_REF_PREFIX) => return Ok(None),
            Err(e) => return Err(wrap(e)),
        };

        let name = self.claim_name(&location, fragment);
        tracing::debug!(reference = %reference, definition = %name, "hoisting external $ref target");
        self.hoisted.insert(key, name.clone());

        let target_base = Base::of(&location);
        self.walk(&mut target, &target_base, Some(&location))?;
        self.definitions.insert(name.clone(), target);

        Ok(Some(definition_ref(&name)))
    }

    fn document(&mut self, location: &SchemaLocation) -> Result<&Value, ResolveError> {
        if !self.documents.contains_key(location) {
            tracing::debug!(location = %location, "fetching schema document");
            let document = self.fetcher.fetch(location)?;
            self.documents.insert(location.clone(), document);
        }
        Ok(&self.documents[location])
    }

    /// Pick a unique, pointer-safe definition name for a hoisted target.
    fn claim_name(&mut self, location: &SchemaLocation, fragment: &str) -> String {
        let from_fragment = fragment
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty() && *s != "#")
            .map(|s| s.replace("~1", "/").replace("~0", "~"));

        let stem = from_fragment.unwrap_or_else(|| document_stem(location));
        let stem: String = stem
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let stem = if stem.is_empty() {
            "external".to_string()
        } else {
            stem
        };

        let mut name = stem.clone();
        let mut n = 2;
        while self.taken.contains(&name) {
            name = format!("{}_{}", stem, n);
            n += 1;
        }
        self.taken.insert(name.clone());
        name
    }
}

fn document_stem(location: &SchemaLocation) -> String {
    let file_name = match location {
        SchemaLocation::File(path) => path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
        SchemaLocation::Url(url) => url
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(String::from))
            .unwrap_or_default(),
    };
    match file_name.split_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => file_name,
    }
}

/// Split `doc.json#/a/b` into `("doc.json", "#/a/b")`.
fn split_reference(reference: &str) -> (&str, &str) {
    match reference.find('#') {
        Some(idx) if &reference[idx..] == "#" => (&reference[..idx], ""),
        Some(idx) => (&reference[..idx], &reference[idx..]),
        None => (reference, ""),
    }
}

fn definition_ref(name: &str) -> String {
    format!("#/{}/{}", BUNDLE_NAMESPACE, name)
}

/// The root's own `$ref`, if it points back into the same document.
fn root_reference(root: &Value) -> Option<&str> {
    root.get("$ref")
        .and_then(Value::as_str)
        .filter(|r| r.starts_with('#') && !r.starts_with(COMPONENT_REF_PREFIX))
}

fn is_degenerate(schema: &Value) -> bool {
    schema
        .as_object()
        .is_some_and(|obj| obj.len() == 1 && obj.get("$ref").and_then(Value::as_str) == Some("#"))
}

/// Replace every internal `$ref` in a bundled document with its target.
///
/// A root whose own `$ref` points into the document cannot be inlined into
/// itself and collapses to `{"$ref": "#"}`.
fn dereference_tree(root: &Value) -> Result<Value, ResolveError> {
    if root_reference(root).is_some() {
        return Ok(json!({ "$ref": "#" }));
    }
    dereference_node(root, root, &mut Vec::new())
}

fn dereference_node(
    node: &Value,
    root: &Value,
    stack: &mut Vec<String>,
) -> Result<Value, ResolveError> {
    match node {
        Value::Object(obj) => {
            let Some(reference) = obj.get("$ref").and_then(Value::as_str) else {
                let mut result = Map::new();
                for (key, value) in obj {
                    result.insert(key.clone(), dereference_member(key, value, root, stack)?);
                }
                return Ok(Value::Object(result));
            };

            if reference.starts_with(COMPONENT_REF_PREFIX) {
                return Ok(node.clone());
            }
            if !reference.starts_with('#') {
                // Bundling rewrites every external ref before we get here
                return Err(ResolveError::TargetNotFound {
                    reference: reference.to_string(),
                });
            }
            if reference == "#" || stack.iter().any(|r| r == reference) {
                return Err(ResolveError::CircularReference {
                    reference: reference.to_string(),
                });
            }

            let target = navigate_fragment(root, reference)?;
            stack.push(reference.to_string());
            let resolved = dereference_node(target, root, stack)?;
            stack.pop();

            if obj.len() == 1 {
                return Ok(resolved);
            }

            // Sibling keywords next to a $ref take precedence over the target
            let Value::Object(mut merged) = resolved else {
                return Ok(resolved);
            };
            for (key, value) in obj {
                if key != "$ref" {
                    merged.insert(key.clone(), dereference_member(key, value, root, stack)?);
                }
            }
            Ok(Value::Object(merged))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| dereference_node(item, root, stack))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

/// Dereference the value of keyword `key`. Instance data is copied as is.
fn dereference_member(
    key: &str,
    value: &Value,
    root: &Value,
    stack: &mut Vec<String>,
) -> Result<Value, ResolveError> {
    if DATA_KEYWORDS.contains(&key) {
        return Ok(value.clone());
    }
    if let (true, Value::Object(map)) = (SCHEMA_MAP_KEYWORDS.contains(&key), value) {
        let mut result = Map::new();
        for (name, schema) in map {
            result.insert(name.clone(), dereference_node(schema, root, stack)?);
        }
        return Ok(Value::Object(result));
    }
    dereference_node(value, root, stack)
}

/// Merge the root's `$ref` target into the root and drop the `$ref`.
fn repair_root(bundled: Value, reference: &str) -> Result<Value, ResolveError> {
    let entry = navigate_fragment(&bundled, reference)?.clone();
    let Value::Object(mut root) = bundled else {
        return Err(ResolveError::InvalidSchema {
            message: "root $ref on a non-object schema".to_string(),
        });
    };
    let Value::Object(entry) = entry else {
        return Err(ResolveError::InvalidSchema {
            message: format!("{} does not point at a schema object", reference),
        });
    };

    root.shift_remove("$ref");
    for (key, value) in entry {
        root.insert(key, value);
    }
    Ok(Value::Object(root))
}

fn strip_definitions(schema: &mut Value) {
    if let Value::Object(obj) = schema {
        for keyword in DEFINITION_KEYWORDS {
            obj.shift_remove(*keyword);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::DefaultFetcher;

    fn no_fetch(location: &SchemaLocation) -> Result<Value, ResolveError> {
        panic!("unexpected fetch of {}", location)
    }

    fn dereference_inline(schema: Value) -> Result<Value, ResolveError> {
        ReferenceResolver::new(&no_fetch).dereference(&SchemaSource::Inline(schema))
    }

    #[test]
    fn split_reference_forms() {
        assert_eq!(split_reference("#/definitions/a"), ("", "#/definitions/a"));
        assert_eq!(split_reference("a.json#/x"), ("a.json", "#/x"));
        assert_eq!(split_reference("a.json#"), ("a.json", ""));
        assert_eq!(split_reference("a.json"), ("a.json", ""));
    }

    #[test]
    fn simple_schema_is_unchanged() {
        let schema = json!({
            "type": "object",
            "properties": { "error": { "type": "string" } }
        });
        assert_eq!(dereference_inline(schema.clone()).unwrap(), schema);
    }

    #[test]
    fn inlines_definitions_and_keeps_them() {
        let schema = json!({
            "type": "object",
            "properties": { "name": { "$ref": "#/definitions/nameObject" } },
            "definitions": {
                "nameObject": { "type": "object", "properties": { "firstName": { "type": "string" } } }
            }
        });
        let result = dereference_inline(schema).unwrap();
        assert_eq!(
            result["properties"]["name"],
            json!({ "type": "object", "properties": { "firstName": { "type": "string" } } })
        );
        assert!(result.get("definitions").is_some());
    }

    #[test]
    fn component_refs_are_preserved() {
        let schema = json!({
            "type": "array",
            "items": { "$ref": "#/components/schemas/Agency" }
        });
        assert_eq!(dereference_inline(schema.clone()).unwrap(), schema);
    }

    #[test]
    fn instance_data_is_not_dereferenced() {
        let schema = json!({
            "type": "object",
            "properties": {
                "link": {
                    "type": "object",
                    "default": { "$ref": "#/definitions/nowhere" },
                    "examples": [{ "$ref": "https://example.com/not-fetched.json" }],
                    "enum": [{ "$ref": "other.json" }]
                },
                "default": { "$ref": "#/definitions/text" }
            },
            "definitions": { "text": { "type": "string" } }
        });

        let resolved = dereference_inline(schema.clone()).unwrap();
        assert_eq!(resolved["properties"]["link"], schema["properties"]["link"]);
        assert_eq!(resolved["properties"]["default"], json!({ "type": "string" }));
    }

    #[test]
    fn sibling_keywords_override_target() {
        let schema = json!({
            "properties": {
                "a": { "$ref": "#/definitions/base", "description": "override" }
            },
            "definitions": { "base": { "type": "string", "description": "base" } }
        });
        let result = dereference_inline(schema).unwrap();
        assert_eq!(
            result["properties"]["a"],
            json!({ "type": "string", "description": "override" })
        );
    }

    #[test]
    fn repairs_root_self_reference() {
        let schema = json!({
            "$ref": "#/definitions/Foo",
            "definitions": { "Foo": { "type": "string" } }
        });
        assert_eq!(dereference_inline(schema).unwrap(), json!({ "type": "string" }));
    }

    #[test]
    fn repair_keeps_root_siblings() {
        let schema = json!({
            "type": "object",
            "$ref": "#/definitions/nameObject",
            "definitions": {
                "nameObject": { "type": "object", "properties": { "firstName": { "type": "string" } } }
            }
        });
        assert_eq!(
            dereference_inline(schema).unwrap(),
            json!({ "type": "object", "properties": { "firstName": { "type": "string" } } })
        );
    }

    #[test]
    fn repair_follows_chained_root_refs() {
        let schema = json!({
            "$ref": "#/definitions/A",
            "definitions": {
                "A": { "$ref": "#/definitions/B" },
                "B": { "type": "integer" }
            }
        });
        assert_eq!(dereference_inline(schema).unwrap(), json!({ "type": "integer" }));
    }

    #[test]
    fn repair_of_cyclic_root_does_not_converge() {
        let schema = json!({
            "$ref": "#/definitions/A",
            "definitions": {
                "A": { "$ref": "#/definitions/B" },
                "B": { "$ref": "#/definitions/A" }
            }
        });
        let result = ReferenceResolver::new(&no_fetch)
            .with_options(ResolverOptions::new().max_repair_passes(3))
            .dereference(&SchemaSource::Inline(schema));
        assert!(matches!(
            result,
            Err(ResolveError::RepairDidNotConverge { passes: 3, .. })
        ));
    }

    #[test]
    fn missing_definition_errors() {
        let schema = json!({
            "type": "object",
            "properties": { "a": { "$ref": "#/definitions/missing" } },
            "definitions": {}
        });
        let result = dereference_inline(schema);
        assert!(matches!(
            result,
            Err(ResolveError::TargetNotFound { reference }) if reference == "#/definitions/missing"
        ));
    }

    #[test]
    fn circular_definitions_error() {
        let schema = json!({
            "type": "object",
            "properties": { "node": { "$ref": "#/definitions/node" } },
            "definitions": {
                "node": {
                    "type": "object",
                    "properties": { "child": { "$ref": "#/definitions/node" } }
                }
            }
        });
        let result = dereference_inline(schema);
        assert!(matches!(result, Err(ResolveError::CircularReference { .. })));
    }

    #[test]
    fn bundles_file_refs_into_definitions() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("name.json"),
            r##"{
                "type": "object",
                "properties": { "first": { "$ref": "#/definitions/text" } },
                "definitions": { "text": { "type": "string" } }
            }"##,
        )
        .unwrap();

        let schema = json!({
            "type": "object",
            "properties": { "name": { "$ref": "name.json" } }
        });
        let fetcher = DefaultFetcher::new();
        let resolver = ReferenceResolver::new(&fetcher)
            .with_options(ResolverOptions::new().base_dir(dir.path()));

        let bundled = resolver.bundle(&SchemaSource::Inline(schema.clone())).unwrap();
        assert_eq!(bundled["properties"]["name"]["$ref"], "#/definitions/name");
        assert_eq!(
            bundled["definitions"]["name"]["properties"]["first"]["$ref"],
            "#/definitions/text"
        );

        let resolved = resolver.dereference(&SchemaSource::Inline(schema)).unwrap();
        assert_eq!(
            resolved["properties"]["name"]["properties"]["first"],
            json!({ "type": "string" })
        );
    }

    #[test]
    fn hoisted_names_do_not_clobber_local_definitions() {
        let fetch = |_: &SchemaLocation| -> Result<Value, ResolveError> {
            Ok(json!({ "type": "integer" }))
        };
        let schema = json!({
            "properties": {
                "a": { "$ref": "#/definitions/count" },
                "b": { "$ref": "https://example.com/count.json" }
            },
            "definitions": { "count": { "type": "string" } }
        });
        let bundled = ReferenceResolver::new(&fetch)
            .bundle(&SchemaSource::Inline(schema))
            .unwrap();
        assert_eq!(bundled["definitions"]["count"], json!({ "type": "string" }));
        assert_eq!(bundled["definitions"]["count_2"], json!({ "type": "integer" }));
        assert_eq!(bundled["properties"]["b"]["$ref"], "#/definitions/count_2");
    }

    #[test]
    fn each_external_document_is_fetched_once() {
        let calls = std::cell::Cell::new(0);
        let fetch = |_: &SchemaLocation| -> Result<Value, ResolveError> {
            calls.set(calls.get() + 1);
            Ok(json!({ "definitions": { "a": { "type": "string" }, "b": { "type": "number" } } }))
        };
        let schema = json!({
            "properties": {
                "a": { "$ref": "https://example.com/common.json#/definitions/a" },
                "b": { "$ref": "https://example.com/common.json#/definitions/b" },
                "c": { "$ref": "https://example.com/common.json#/definitions/a" }
            }
        });
        let resolved = ReferenceResolver::new(&fetch)
            .dereference(&SchemaSource::Inline(schema))
            .unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(resolved["properties"]["c"], json!({ "type": "string" }));
    }

    #[test]
    fn failed_external_ref_names_the_reference() {
        let fetch = |location: &SchemaLocation| -> Result<Value, ResolveError> {
            Err(ResolveError::HttpStatus {
                url: location.to_string(),
                status: 404,
            })
        };
        let schema = json!({
            "properties": { "a": { "$ref": "https://example.com/gone.json" } }
        });
        let result = ReferenceResolver::new(&fetch).dereference(&SchemaSource::Inline(schema));
        match result {
            Err(ResolveError::ExternalRef { reference, source }) => {
                assert_eq!(reference, "https://example.com/gone.json");
                assert!(matches!(*source, ResolveError::HttpStatus { status: 404, .. }));
            }
            other => panic!("expected ExternalRef error, got {:?}", other),
        }
    }
}
