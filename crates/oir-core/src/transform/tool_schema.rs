//! JSON Schemas for exposing an operation as a tool.
//!
//! Tool consumers never see a `$ref`: every reference is replaced by its
//! target. A reference back into a schema that is already being inlined
//! becomes `{}` so cyclic schemas terminate.

use std::collections::HashMap;

use serde_json::{Map, Value, json};

use super::to_openapi::{Dialect, schema_to_openapi};
use crate::ir::{IrDocument, IrOperation, IrParameter, SchemaNode};

/// `{type: object, properties: {path?, query?, header?, body?}, required}`.
/// Cookie parameters have no tool transport and are left out.
pub fn tool_input_schema(op: &IrOperation, doc: &IrDocument) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for (location, params) in op.parameter_groups.tool_groups() {
        if params.is_empty() {
            continue;
        }
        let mut group_properties = Map::new();
        let mut group_required = Vec::new();
        for (name, param) in params {
            group_properties.insert(name.clone(), parameter_schema(param, doc));
            if param.required {
                group_required.push(json!(name));
            }
        }

        let mut group = Map::new();
        group.insert("type".into(), json!("object"));
        group.insert("properties".into(), Value::Object(group_properties));
        if !group_required.is_empty() {
            group.insert("required".into(), Value::Array(group_required));
            required.push(json!(location.as_str()));
        }
        properties.insert(location.as_str().into(), Value::Object(group));
    }

    if let Some(body) = &op.request_body {
        let mut schema = inline_schema(&body.schema, doc);
        if let (Some(description), Value::Object(map)) = (&body.description, &mut schema) {
            map.entry("description").or_insert_with(|| json!(description));
        }
        properties.insert("body".into(), schema);
        if body.required {
            required.push(json!("body"));
        }
    }

    let mut out = Map::new();
    out.insert("type".into(), json!("object"));
    out.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        out.insert("required".into(), Value::Array(required));
    }
    Value::Object(out)
}

/// The main response's schema with references inlined, if it has one.
pub fn tool_output_schema(op: &IrOperation, doc: &IrDocument) -> Option<Value> {
    op.main_response()
        .and_then(|response| response.schema.as_ref())
        .map(|schema| inline_schema(schema, doc))
}

/// Serialize a node with every `$ref` replaced by its target.
pub fn inline_schema(node: &SchemaNode, doc: &IrDocument) -> Value {
    Inliner::new(doc).schema(schema_to_openapi(node, Dialect::V31))
}

fn parameter_schema(param: &IrParameter, doc: &IrDocument) -> Value {
    let mut schema = inline_schema(&param.schema, doc);
    if let (Some(description), Value::Object(map)) = (&param.description, &mut schema) {
        map.entry("description").or_insert_with(|| json!(description));
    }
    schema
}

/// Keywords whose values are data, not schemas.
const VALUE_KEYWORDS: &[&str] = &["default", "example", "examples", "const", "enum"];

/// Keywords whose values map arbitrary names to schemas.
const SCHEMA_MAP_KEYWORDS: &[&str] = &["properties", "patternProperties", "$defs"];

struct Inliner<'a> {
    doc: &'a IrDocument,
    stack: Vec<String>,
    /// Expansions of non-circular components, which never depend on the
    /// references being expanded above them.
    cache: HashMap<String, Value>,
}

impl<'a> Inliner<'a> {
    fn new(doc: &'a IrDocument) -> Self {
        Self {
            doc,
            stack: Vec::new(),
            cache: HashMap::new(),
        }
    }

    fn schema(&mut self, value: Value) -> Value {
        match value {
            Value::Object(map) => {
                if let Some(raw) = pure_ref(&map) {
                    let raw = raw.to_string();
                    return self.reference(&raw);
                }
                let inlined: Map<String, Value> = map
                    .into_iter()
                    .map(|(key, child)| {
                        let child = if VALUE_KEYWORDS.contains(&key.as_str()) {
                            child
                        } else if SCHEMA_MAP_KEYWORDS.contains(&key.as_str()) {
                            self.schema_map(child)
                        } else {
                            self.schema(child)
                        };
                        (key, child)
                    })
                    .collect();
                Value::Object(inlined)
            }
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|item| self.schema(item)).collect())
            }
            other => other,
        }
    }

    fn schema_map(&mut self, value: Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(name, child)| (name, self.schema(child)))
                    .collect(),
            ),
            other => other,
        }
    }

    fn reference(&mut self, raw: &str) -> Value {
        let doc = self.doc;
        let Some(component) = doc.schema_component(raw) else {
            log::warn!("tool schema: {raw} is not a known component schema; left open");
            return json!({});
        };
        let Some(target) = component.as_schema() else {
            return json!({});
        };
        if let Some(cached) = self.cache.get(&component.pointer) {
            return cached.clone();
        }
        if self.stack.contains(&component.pointer) {
            log::trace!("tool schema: cycle at {}, emitting an open schema", component.pointer);
            return json!({});
        }

        self.stack.push(component.pointer.clone());
        let inlined = self.schema(schema_to_openapi(target, Dialect::V31));
        self.stack.pop();
        if !doc.is_circular(&component.pointer) {
            self.cache.insert(component.pointer.clone(), inlined.clone());
        }
        inlined
    }
}

fn pure_ref(map: &Map<String, Value>) -> Option<&str> {
    match (map.len(), map.get("$ref")) {
        (1, Some(Value::String(raw))) => Some(raw),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use crate::transform::spec_to_ir::build_document;

    const SPEC: &str = r##"
openapi: "3.1.0"
info:
  title: t
  version: "1"
paths:
  /pets/{petId}:
    put:
      operationId: updatePet
      parameters:
        - name: petId
          in: path
          required: true
          description: The pet id
          schema:
            type: integer
        - name: dryRun
          in: query
          schema:
            type: boolean
        - name: session
          in: cookie
          schema:
            type: string
      requestBody:
        required: true
        content:
          application/json:
            schema:
              $ref: "#/components/schemas/Pet"
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Node"
components:
  schemas:
    Pet:
      type: object
      properties:
        name:
          type: string
    Node:
      type: object
      properties:
        next:
          $ref: "#/components/schemas/Node"
"##;

    fn contains_ref(value: &Value) -> bool {
        match value {
            Value::Object(map) => map.contains_key("$ref") || map.values().any(contains_ref),
            Value::Array(items) => items.iter().any(contains_ref),
            _ => false,
        }
    }

    #[test]
    fn test_input_schema_groups_and_required() {
        let doc = build_document(&parse::from_yaml(SPEC).unwrap()).unwrap();
        let input = tool_input_schema(&doc.operations[0], &doc);

        assert_eq!(input["required"], json!(["path", "body"]));
        assert!(input["properties"].get("cookie").is_none());
        assert_eq!(
            input["properties"]["path"],
            json!({
                "type": "object",
                "properties": {
                    "petId": { "type": "integer", "description": "The pet id" }
                },
                "required": ["petId"]
            })
        );
        assert_eq!(
            input["properties"]["query"],
            json!({
                "type": "object",
                "properties": { "dryRun": { "type": "boolean" } }
            })
        );
        assert_eq!(
            input["properties"]["body"],
            json!({ "type": "object", "properties": { "name": { "type": "string" } } })
        );
        assert!(!contains_ref(&input));
    }

    #[test]
    fn test_data_values_keep_ref_shaped_objects() {
        let doc = build_document(
            &parse::from_yaml(
                r##"
openapi: "3.1.0"
info:
  title: t
  version: "1"
paths: {}
components:
  schemas:
    Link:
      type: object
      default:
        $ref: "#/components/schemas/Pet"
      properties:
        default:
          $ref: "#/components/schemas/Pet"
    Pet:
      type: object
      properties:
        name:
          type: string
"##,
            )
            .unwrap(),
        )
        .unwrap();
        let link = inline_schema(doc.schema_by_name("Link").unwrap(), &doc);
        assert_eq!(link["default"], json!({ "$ref": "#/components/schemas/Pet" }));
        assert_eq!(
            link["properties"]["default"],
            json!({ "type": "object", "properties": { "name": { "type": "string" } } })
        );
    }

    #[test]
    fn test_shared_refs_expand_once_per_target() {
        // Each level references the next one twice; without reuse this
        // doubles at every level.
        let mut yaml = String::from(
            "openapi: \"3.1.0\"\ninfo:\n  title: t\n  version: \"1\"\npaths: {}\ncomponents:\n  schemas:\n",
        );
        for level in 0..24 {
            let next = format!("\"#/components/schemas/L{}\"", level + 1);
            yaml.push_str(&format!(
                "    L{level}:\n      type: object\n      properties:\n        left:\n          $ref: {next}\n        right:\n          $ref: {next}\n"
            ));
        }
        yaml.push_str("    L24:\n      type: string\n");

        let doc = build_document(&parse::from_yaml(&yaml).unwrap()).unwrap();
        let top = inline_schema(doc.schema_by_name("L0").unwrap(), &doc);
        assert_eq!(top["properties"]["left"], top["properties"]["right"]);
        assert!(!contains_ref(&top));
    }

    #[test]
    fn test_output_schema_terminates_on_cycles() {
        let doc = build_document(&parse::from_yaml(SPEC).unwrap()).unwrap();
        let output = tool_output_schema(&doc.operations[0], &doc).unwrap();
        assert_eq!(
            output,
            json!({ "type": "object", "properties": { "next": {} } })
        );
        assert!(!contains_ref(&output));
    }
}
