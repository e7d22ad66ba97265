//! Dialect conversion - rewrites a dereferenced JSON Schema into one or
//! more OpenAPI 3.0 Schema Objects.
//!
//! | JSON Schema construct | OpenAPI output |
//! |-----------------------|----------------|
//! | `definitions` / `$defs` entry | separate named schema, refs rewritten to `#/components/schemas/...` |
//! | root `if`/`then`/`else` | `if` extracted as `{name}If`, branches become `oneOf` of `allOf` |
//! | nested `if`/`then`/`else` | same `oneOf` shape, inline |
//! | `const` | single-value `enum` |
//! | `type: [T, "null"]` | `type: T` + `nullable: true` |
//! | `type: [A, B]` | `anyOf` of single types |
//! | `examples: [...]` | `example` (first entry) |
//! | numeric `exclusiveMinimum`/`exclusiveMaximum` | `minimum`/`maximum` + boolean flag |
//! | `$schema`, `$id`, `$comment` | removed |
//!
//! Schemas using none of these constructs come back unchanged under the
//! requested name.

use std::cmp::Ordering;

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use crate::error::ConvertError;
use crate::types::{component_ref, json_type_name, COMPONENT_REF_PREFIX, DEFINITION_KEYWORDS};

/// Named OpenAPI schemas produced by one conversion, requested name first.
pub type ConvertedSchemas = IndexMap<String, Value>;

/// Keywords with no OpenAPI 3.0 Schema Object counterpart.
const DROPPED_KEYWORDS: &[&str] = &["$schema", "$id", "$comment"];

/// Suffix for the schema extracted from a root-level `if`.
const CONDITION_SUFFIX: &str = "If";

/// Convert `schema` into named OpenAPI schemas.
///
/// The entry for the input itself is keyed by `requested_name`; extracted
/// definitions keep their `definitions` key and a root `if` condition is
/// keyed `{requested_name}If`. Output is deterministic for a given input.
///
/// # Errors
///
/// Returns `ConvertError::MissingSchema` for a null schema,
/// `ConvertError::UnsupportedSchema` for a non-object schema, and
/// `ConvertError::NameClash` if an extracted name collides with another.
pub fn convert(schema: &Value, requested_name: &str) -> Result<ConvertedSchemas, ConvertError> {
    let mut root = match schema {
        Value::Object(obj) => obj.clone(),
        Value::Null => {
            return Err(ConvertError::MissingSchema {
                name: requested_name.to_string(),
            })
        }
        other => {
            return Err(ConvertError::UnsupportedSchema {
                name: requested_name.to_string(),
                actual: json_type_name(other).to_string(),
            })
        }
    };

    let mut extracted: Vec<(String, Value)> = Vec::new();

    for keyword in DEFINITION_KEYWORDS {
        if let Some(Value::Object(defs)) = root.shift_remove(*keyword) {
            extracted.extend(defs);
        }
    }

    if let Some((condition, then_branch, else_branch)) = take_conditional(&mut root) {
        let condition_name = format!("{}{}", requested_name, CONDITION_SUFFIX);
        let reference = json!({ "$ref": component_ref(&condition_name) });
        if let Some(branches) = conditional_branches(reference, then_branch, else_branch) {
            attach_one_of(&mut root, branches);
            extracted.push((condition_name, condition));
        }
    }

    let mut output = ConvertedSchemas::new();
    let mut main = Value::Object(root);
    normalize_schema(&mut main);
    output.insert(requested_name.to_string(), main);

    for (name, mut value) in extracted {
        if output.contains_key(&name) {
            return Err(ConvertError::NameClash {
                name: requested_name.to_string(),
                clash: name,
            });
        }
        normalize_schema(&mut value);
        output.insert(name, value);
    }

    Ok(output)
}

/// Remove `if`/`then`/`else`, returning them when an `if` was present.
///
/// `then`/`else` without `if` have no effect and are dropped.
fn take_conditional(obj: &mut Map<String, Value>) -> Option<(Value, Option<Value>, Option<Value>)> {
    let condition = obj.shift_remove("if");
    let then_branch = obj.shift_remove("then");
    let else_branch = obj.shift_remove("else");
    condition.map(|c| (c, then_branch, else_branch))
}

/// `(if AND then) XOR (NOT if AND else)`, as a `oneOf` array.
///
/// Returns `None` when neither branch constrains anything.
fn conditional_branches(
    condition: Value,
    then_branch: Option<Value>,
    else_branch: Option<Value>,
) -> Option<Value> {
    if then_branch.is_none() && else_branch.is_none() {
        return None;
    }

    let mut when = vec![condition.clone()];
    when.extend(then_branch);
    let mut unless = vec![json!({ "not": condition })];
    unless.extend(else_branch);

    Some(json!([{ "allOf": when }, { "allOf": unless }]))
}

/// Add a `oneOf`, keeping any existing one by moving both under `allOf`.
fn attach_one_of(obj: &mut Map<String, Value>, branches: Value) {
    let Some(existing) = obj.shift_remove("oneOf") else {
        obj.insert("oneOf".to_string(), branches);
        return;
    };

    let all_of = obj
        .entry("allOf")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(items) = all_of {
        items.push(json!({ "oneOf": existing }));
        items.push(json!({ "oneOf": branches }));
    }
}

/// Rewrite one schema and all of its sub-schemas in place.
fn normalize_schema(schema: &mut Value) {
    let Value::Object(obj) = schema else {
        return;
    };

    if let Some((condition, then_branch, else_branch)) = take_conditional(obj) {
        if let Some(branches) = conditional_branches(condition, then_branch, else_branch) {
            attach_one_of(obj, branches);
        }
    }

    normalize_keywords(obj);
    rewrite_definition_ref(obj);

    for (key, child) in obj.iter_mut() {
        match key.as_str() {
            "properties" | "patternProperties" | "definitions" | "$defs" => {
                if let Value::Object(map) = child {
                    for value in map.values_mut() {
                        normalize_schema(value);
                    }
                }
            }
            "allOf" | "anyOf" | "oneOf" => {
                if let Value::Array(items) = child {
                    for item in items {
                        normalize_schema(item);
                    }
                }
            }
            "items" => match child {
                Value::Array(items) => {
                    for item in items {
                        normalize_schema(item);
                    }
                }
                other => normalize_schema(other),
            },
            "additionalProperties" | "additionalItems" | "not" | "contains" | "propertyNames" => {
                normalize_schema(child);
            }
            _ => {}
        }
    }
}

fn normalize_keywords(obj: &mut Map<String, Value>) {
    for keyword in DROPPED_KEYWORDS {
        obj.shift_remove(*keyword);
    }

    if let Some(value) = obj.shift_remove("const") {
        obj.entry("enum").or_insert_with(|| json!([value]));
    }

    if let Some(Value::Array(types)) = obj.get("type").cloned() {
        let nullable = types.iter().any(|t| t.as_str() == Some("null"));
        let rest: Vec<Value> = types
            .into_iter()
            .filter(|t| t.as_str() != Some("null"))
            .collect();

        match rest.as_slice() {
            [] => {
                obj.shift_remove("type");
            }
            [single] => {
                obj.insert("type".to_string(), single.clone());
            }
            many => {
                obj.shift_remove("type");
                let alternatives: Vec<Value> = many.iter().map(|t| json!({ "type": t })).collect();
                if obj.contains_key("anyOf") {
                    let all_of = obj
                        .entry("allOf")
                        .or_insert_with(|| Value::Array(Vec::new()));
                    if let Value::Array(items) = all_of {
                        items.push(json!({ "anyOf": alternatives }));
                    }
                } else {
                    obj.insert("anyOf".to_string(), Value::Array(alternatives));
                }
            }
        }

        if nullable {
            obj.insert("nullable".to_string(), Value::Bool(true));
        }
    }

    match obj.shift_remove("examples") {
        Some(Value::Array(examples)) => {
            if let Some(first) = examples.into_iter().next() {
                obj.entry("example").or_insert(first);
            }
        }
        Some(other) => {
            obj.insert("examples".to_string(), other);
        }
        None => {}
    }

    // When both bounds are given, only the tighter one survives.
    for (exclusive, bound, tighter) in [
        ("exclusiveMinimum", "minimum", Ordering::Greater),
        ("exclusiveMaximum", "maximum", Ordering::Less),
    ] {
        let Some(limit) = obj.get(exclusive).filter(|v| v.is_number()).cloned() else {
            continue;
        };
        let inclusive = obj.get(bound).and_then(Value::as_f64);
        let inclusive_wins = match (inclusive, limit.as_f64()) {
            (Some(inclusive), Some(limit)) => inclusive.partial_cmp(&limit) == Some(tighter),
            _ => false,
        };

        if inclusive_wins {
            obj.shift_remove(exclusive);
        } else {
            obj.insert(bound.to_string(), limit);
            obj.insert(exclusive.to_string(), Value::Bool(true));
        }
    }
}

/// Point `#/definitions/X` and `#/$defs/X` refs at the extracted component.
fn rewrite_definition_ref(obj: &mut Map<String, Value>) {
    let Some(Value::String(reference)) = obj.get_mut("$ref") else {
        return;
    };

    let rewritten = DEFINITION_KEYWORDS.iter().find_map(|keyword| {
        reference
            .strip_prefix(&format!("#/{}/", keyword))
            .map(|rest| format!("{}{}", COMPONENT_REF_PREFIX, rest))
    });
    if let Some(rewritten) = rewritten {
        *reference = rewritten;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_schema_passes_through() {
        let schema = json!({
            "type": "object",
            "properties": {
                "error": { "type": "string" },
                "code": { "type": "integer", "enum": [400, 404] }
            },
            "required": ["error"]
        });
        let converted = convert(&schema, "ErrorResponse").unwrap();
        assert_eq!(converted.len(), 1);
        assert_eq!(converted["ErrorResponse"], schema);
    }

    #[test]
    fn component_refs_pass_through() {
        let schema = json!({
            "type": "array",
            "items": { "$ref": "#/components/schemas/Agency" }
        });
        let converted = convert(&schema, "Agencies").unwrap();
        assert_eq!(converted["Agencies"], schema);
    }

    #[test]
    fn extracts_definitions_and_rewrites_refs() {
        let schema = json!({
            "type": "array",
            "items": { "$ref": "#/definitions/error" },
            "definitions": {
                "error": {
                    "type": "object",
                    "properties": { "detail": { "$ref": "#/definitions/detail" } }
                },
                "detail": { "type": "string" }
            }
        });
        let converted = convert(&schema, "PutRequest").unwrap();

        let names: Vec<&str> = converted.keys().map(String::as_str).collect();
        assert_eq!(names, ["PutRequest", "error", "detail"]);
        assert_eq!(
            converted["PutRequest"]["items"]["$ref"],
            "#/components/schemas/error"
        );
        assert!(converted["PutRequest"].get("definitions").is_none());
        assert_eq!(
            converted["error"]["properties"]["detail"]["$ref"],
            "#/components/schemas/detail"
        );
    }

    #[test]
    fn extracts_dollar_defs() {
        let schema = json!({
            "properties": { "tag": { "$ref": "#/$defs/tag" } },
            "$defs": { "tag": { "type": "string" } }
        });
        let converted = convert(&schema, "Tagged").unwrap();
        assert_eq!(converted["tag"], json!({ "type": "string" }));
        assert_eq!(
            converted["Tagged"]["properties"]["tag"]["$ref"],
            "#/components/schemas/tag"
        );
    }

    #[test]
    fn root_conditional_becomes_one_of() {
        let schema = json!({
            "type": "object",
            "properties": {
                "street_address": { "type": "string" },
                "country": {
                    "default": "United States of America",
                    "enum": ["United States of America", "Canada"]
                }
            },
            "if": { "properties": { "country": { "const": "United States of America" } } },
            "then": { "properties": { "postal_code": { "pattern": "[0-9]{5}(-[0-9]{4})?" } } },
            "else": { "properties": { "postal_code": { "pattern": "[A-Z][0-9][A-Z] [0-9][A-Z][0-9]" } } }
        });
        let converted = convert(&schema, "Address").unwrap();

        assert_eq!(converted.len(), 2);
        let address = &converted["Address"];
        assert_eq!(address["properties"], schema["properties"]);
        assert!(address.get("if").is_none());
        assert_eq!(
            address["oneOf"],
            json!([
                {
                    "allOf": [
                        { "$ref": "#/components/schemas/AddressIf" },
                        { "properties": { "postal_code": { "pattern": "[0-9]{5}(-[0-9]{4})?" } } }
                    ]
                },
                {
                    "allOf": [
                        { "not": { "$ref": "#/components/schemas/AddressIf" } },
                        { "properties": { "postal_code": { "pattern": "[A-Z][0-9][A-Z] [0-9][A-Z][0-9]" } } }
                    ]
                }
            ])
        );
        assert_eq!(
            converted["AddressIf"],
            json!({ "properties": { "country": { "enum": ["United States of America"] } } })
        );
    }

    #[test]
    fn conditional_keeps_existing_one_of() {
        let schema = json!({
            "oneOf": [{ "required": ["a"] }, { "required": ["b"] }],
            "if": { "required": ["a"] },
            "then": { "required": ["c"] }
        });
        let converted = convert(&schema, "Pick").unwrap();
        let pick = &converted["Pick"];
        assert!(pick.get("oneOf").is_none());
        let all_of = pick["allOf"].as_array().unwrap();
        assert_eq!(all_of.len(), 2);
        assert_eq!(all_of[0]["oneOf"], schema["oneOf"]);
        assert_eq!(
            all_of[1]["oneOf"][1],
            json!({ "allOf": [{ "not": { "$ref": "#/components/schemas/PickIf" } }] })
        );
    }

    #[test]
    fn if_without_branches_is_dropped() {
        let schema = json!({ "type": "object", "if": { "required": ["a"] } });
        let converted = convert(&schema, "Loose").unwrap();
        assert_eq!(converted.len(), 1);
        assert_eq!(converted["Loose"], json!({ "type": "object" }));
    }

    #[test]
    fn nested_conditional_is_inlined() {
        let schema = json!({
            "type": "object",
            "properties": {
                "size": {
                    "type": "object",
                    "if": { "required": ["metric"] },
                    "then": { "required": ["cm"] },
                    "else": { "required": ["inches"] }
                }
            }
        });
        let converted = convert(&schema, "Garment").unwrap();
        assert_eq!(converted.len(), 1);
        assert_eq!(
            converted["Garment"]["properties"]["size"]["oneOf"],
            json!([
                { "allOf": [{ "required": ["metric"] }, { "required": ["cm"] }] },
                { "allOf": [{ "not": { "required": ["metric"] } }, { "required": ["inches"] }] }
            ])
        );
    }

    #[test]
    fn normalizes_dialect_keywords() {
        let schema = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "$id": "https://example.com/item.json",
            "type": "object",
            "properties": {
                "kind": { "const": "item" },
                "note": { "type": ["string", "null"], "examples": ["hello", "world"] },
                "price": { "type": "number", "exclusiveMinimum": 0 },
                "id": { "type": ["string", "integer"] }
            }
        });
        let converted = convert(&schema, "Item").unwrap();
        assert_eq!(
            converted["Item"],
            json!({
                "type": "object",
                "properties": {
                    "kind": { "enum": ["item"] },
                    "note": { "type": "string", "nullable": true, "example": "hello" },
                    "price": { "type": "number", "minimum": 0, "exclusiveMinimum": true },
                    "id": { "anyOf": [{ "type": "string" }, { "type": "integer" }] }
                }
            })
        );
    }

    #[test]
    fn exclusive_bounds_keep_the_tighter_limit() {
        let convert_one = |schema: Value| convert(&schema, "N").unwrap().shift_remove("N").unwrap();

        assert_eq!(
            convert_one(json!({ "type": "number", "minimum": 5, "exclusiveMinimum": 0 })),
            json!({ "type": "number", "minimum": 5 })
        );
        assert_eq!(
            convert_one(json!({ "type": "number", "minimum": 0, "exclusiveMinimum": 5 })),
            json!({ "type": "number", "minimum": 5, "exclusiveMinimum": true })
        );
        assert_eq!(
            convert_one(json!({ "type": "number", "maximum": 10, "exclusiveMaximum": 20 })),
            json!({ "type": "number", "maximum": 10 })
        );
        assert_eq!(
            convert_one(json!({ "type": "number", "maximum": 20, "exclusiveMaximum": 10 })),
            json!({ "type": "number", "maximum": 10, "exclusiveMaximum": true })
        );
        // x >= 5 and x > 5 is x > 5
        assert_eq!(
            convert_one(json!({ "type": "integer", "minimum": 5, "exclusiveMinimum": 5 })),
            json!({ "type": "integer", "minimum": 5, "exclusiveMinimum": true })
        );
    }

    #[test]
    fn property_names_matching_keywords_are_untouched() {
        let schema = json!({
            "type": "object",
            "properties": {
                "const": { "type": "string" },
                "$id": { "type": "string" }
            }
        });
        let converted = convert(&schema, "Weird").unwrap();
        assert_eq!(converted["Weird"], schema);
    }

    #[test]
    fn null_schema_is_missing() {
        let result = convert(&Value::Null, "PUTRequest");
        assert!(matches!(
            result,
            Err(ConvertError::MissingSchema { name }) if name == "PUTRequest"
        ));
    }

    #[test]
    fn non_object_schema_is_unsupported() {
        let result = convert(&json!("https://example.com/a.json"), "A");
        assert!(matches!(
            result,
            Err(ConvertError::UnsupportedSchema { actual, .. }) if actual == "string"
        ));
    }

    #[test]
    fn definition_named_like_request_clashes() {
        let schema = json!({
            "type": "object",
            "definitions": { "Thing": { "type": "string" } }
        });
        let result = convert(&schema, "Thing");
        assert!(matches!(
            result,
            Err(ConvertError::NameClash { clash, .. }) if clash == "Thing"
        ));
    }

    #[test]
    fn conversion_is_deterministic() {
        let schema = json!({
            "properties": { "a": { "$ref": "#/definitions/a" } },
            "definitions": { "a": { "type": ["integer", "null"] }, "b": { "const": 1 } },
            "if": { "required": ["a"] },
            "then": { "required": ["b"] }
        });
        let first = convert(&schema, "Det").unwrap();
        let second = convert(&schema, "Det").unwrap();
        assert_eq!(first, second);
        let first_keys: Vec<_> = first.keys().collect();
        let second_keys: Vec<_> = second.keys().collect();
        assert_eq!(first_keys, second_keys);
    }
}
