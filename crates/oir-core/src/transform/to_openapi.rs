//! Re-serialize the IR as OpenAPI JSON.
//!
//! References come out as pure `{"$ref": ...}` objects, empty `required`
//! arrays are omitted, and nullability is spelled the way the source
//! dialect spells it.

use indexmap::IndexMap;
use serde_json::{Map, Value, json};

use crate::ir::{
    ComponentKind, IrDocument, IrHeader, IrOperation, IrParameter, IrRequestBody, IrResponse,
    IrResponses, IrServer, SchemaKind, SchemaNode, SchemaOrFlag,
};
use crate::parse::ref_path::RefLocation;

/// The JSON Schema flavor of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// OAS 3.0: `nullable`, boolean exclusive bounds.
    V30,
    /// OAS 3.1: type arrays, numeric exclusive bounds.
    V31,
}

impl Dialect {
    pub fn from_version(version: &str) -> Self {
        if version.starts_with("3.0") {
            Dialect::V30
        } else {
            Dialect::V31
        }
    }
}

/// Serialize a whole document.
pub fn to_openapi(doc: &IrDocument) -> Value {
    let dialect = Dialect::from_version(&doc.openapi);
    let mut out = Map::new();
    out.insert("openapi".into(), json!(doc.openapi));

    let mut info = Map::new();
    info.insert("title".into(), json!(doc.info.title));
    if dialect == Dialect::V31 {
        insert_opt(&mut info, "summary", doc.info.summary.as_ref());
    }
    insert_opt(&mut info, "description", doc.info.description.as_ref());
    info.insert("version".into(), json!(doc.info.version));
    out.insert("info".into(), Value::Object(info));

    if !doc.servers.is_empty() {
        out.insert("servers".into(), servers(&doc.servers));
    }
    if !doc.tags.is_empty() {
        let tags = doc
            .tags
            .iter()
            .map(|tag| {
                let mut t = Map::new();
                t.insert("name".into(), json!(tag.name));
                insert_opt(&mut t, "description", tag.description.as_ref());
                Value::Object(t)
            })
            .collect();
        out.insert("tags".into(), Value::Array(tags));
    }
    if !doc.security.is_empty() {
        out.insert("security".into(), json!(doc.security));
    }

    out.insert("paths".into(), routes(&doc.operations, doc, dialect));
    if !doc.webhooks.is_empty() {
        out.insert("webhooks".into(), routes(&doc.webhooks, doc, dialect));
    }

    let (components, external) = components(doc, dialect);
    if !components.is_empty() {
        out.insert("components".into(), Value::Object(components));
    }
    if !external.is_empty() {
        out.insert("x-ext".into(), Value::Object(external));
    }
    Value::Object(out)
}

/// Serialize one schema node.
pub fn schema_to_openapi(node: &SchemaNode, dialect: Dialect) -> Value {
    if let SchemaKind::Reference(reference) = &node.kind {
        let pure = json!({ "$ref": reference.raw });
        if !node.metadata.nullable {
            return pure;
        }
        return match dialect {
            Dialect::V31 => json!({ "anyOf": [pure, { "type": "null" }] }),
            Dialect::V30 => json!({ "allOf": [pure], "nullable": true }),
        };
    }

    let mut out = Map::new();
    match &node.kind {
        SchemaKind::Reference(_) | SchemaKind::Unknown => {}
        SchemaKind::Primitive(primitive) => {
            out.insert("type".into(), json!(primitive.as_str()));
        }
        SchemaKind::Object(obj) => {
            out.insert("type".into(), json!("object"));
            if !obj.properties.is_empty() {
                let properties: Map<String, Value> = obj
                    .properties
                    .iter()
                    .map(|(name, prop)| (name.clone(), schema_to_openapi(prop, dialect)))
                    .collect();
                out.insert("properties".into(), Value::Object(properties));
            }
            if !obj.required.is_empty() {
                out.insert("required".into(), json!(obj.required));
            }
            if let Some(slot) = &obj.additional_properties {
                out.insert("additionalProperties".into(), flag_slot(slot, dialect));
            }
            insert_opt(&mut out, "minProperties", obj.min_properties.as_ref());
            insert_opt(&mut out, "maxProperties", obj.max_properties.as_ref());
        }
        SchemaKind::Array(arr) => {
            out.insert("type".into(), json!("array"));
            if !arr.prefix_items.is_empty() {
                let prefix = arr
                    .prefix_items
                    .iter()
                    .map(|item| schema_to_openapi(item, dialect))
                    .collect();
                out.insert("prefixItems".into(), Value::Array(prefix));
            }
            if let Some(slot) = &arr.items {
                out.insert("items".into(), flag_slot(slot, dialect));
            }
            if let Some(slot) = &arr.unevaluated_items {
                out.insert("unevaluatedItems".into(), flag_slot(slot, dialect));
            }
        }
        SchemaKind::Composition(comp) => {
            let members = comp
                .members
                .iter()
                .map(|member| schema_to_openapi(member, dialect))
                .collect();
            out.insert(comp.kind.keyword().into(), Value::Array(members));
            if let Some(discriminator) = &comp.discriminator {
                let mut d = Map::new();
                d.insert("propertyName".into(), json!(discriminator.property_name));
                if !discriminator.mapping.is_empty() {
                    let mapping: Map<String, Value> = discriminator
                        .mapping
                        .iter()
                        .map(|(k, v)| (k.clone(), json!(v)))
                        .collect();
                    d.insert("mapping".into(), Value::Object(mapping));
                }
                out.insert("discriminator".into(), Value::Object(d));
            }
        }
        SchemaKind::Not(inner) => {
            out.insert("not".into(), schema_to_openapi(inner, dialect));
        }
        SchemaKind::MultiType(members) => match dialect {
            Dialect::V31 => merge_type_members(&mut out, members, dialect),
            Dialect::V30 => {
                let any_of = members
                    .iter()
                    .map(|member| schema_to_openapi(member, dialect))
                    .collect();
                out.insert("anyOf".into(), Value::Array(any_of));
            }
        },
    }

    annotations(&mut out, node, dialect);
    if node.metadata.nullable {
        return nullable(out, &node.kind, dialect);
    }
    Value::Object(out)
}

/// OAS 3.1 type arrays: one `type` list, the members' other keywords merged.
fn merge_type_members(out: &mut Map<String, Value>, members: &[SchemaNode], dialect: Dialect) {
    let mut types = Vec::new();
    for member in members {
        if let Value::Object(map) = schema_to_openapi(member, dialect) {
            for (key, value) in map {
                if key == "type" {
                    types.push(value);
                } else {
                    out.entry(key).or_insert(value);
                }
            }
        }
    }
    out.insert("type".into(), Value::Array(types));
}

fn nullable(mut out: Map<String, Value>, kind: &SchemaKind, dialect: Dialect) -> Value {
    match dialect {
        Dialect::V30 => {
            out.insert("nullable".into(), json!(true));
            Value::Object(out)
        }
        Dialect::V31 => match out.get_mut("type") {
            Some(Value::String(single)) if single == "null" => Value::Object(out),
            Some(Value::Array(types)) if types.contains(&json!("null")) => Value::Object(out),
            Some(Value::String(single)) => {
                let single = std::mem::take(single);
                out.insert("type".into(), json!([single, "null"]));
                Value::Object(out)
            }
            Some(Value::Array(types)) => {
                types.push(json!("null"));
                Value::Object(out)
            }
            _ if matches!(kind, SchemaKind::Unknown) => Value::Object(out),
            _ => json!({ "anyOf": [Value::Object(out), { "type": "null" }] }),
        },
    }
}

fn flag_slot(slot: &SchemaOrFlag, dialect: Dialect) -> Value {
    match slot {
        SchemaOrFlag::Flag(flag) => json!(flag),
        SchemaOrFlag::Schema(inner) => schema_to_openapi(inner, dialect),
    }
}

fn annotations(out: &mut Map<String, Value>, node: &SchemaNode, dialect: Dialect) {
    insert_opt(out, "format", node.format.as_ref());
    insert_opt(out, "title", node.title.as_ref());
    insert_opt(out, "description", node.description.as_ref());

    let c = &node.constraints;
    insert_opt(out, "minLength", c.min_length.as_ref());
    insert_opt(out, "maxLength", c.max_length.as_ref());
    insert_opt(out, "pattern", c.pattern.as_ref());
    bound(out, "minimum", "exclusiveMinimum", c.minimum, c.exclusive_minimum, dialect, f64::max);
    bound(out, "maximum", "exclusiveMaximum", c.maximum, c.exclusive_maximum, dialect, f64::min);
    if let Some(multiple_of) = c.multiple_of {
        out.insert("multipleOf".into(), number(multiple_of));
    }
    insert_opt(out, "minItems", c.min_items.as_ref());
    insert_opt(out, "maxItems", c.max_items.as_ref());
    if c.unique_items {
        out.insert("uniqueItems".into(), json!(true));
    }

    if node.has_enum() {
        out.insert("enum".into(), json!(node.enum_values));
    }
    if let Some(value) = &node.const_value {
        match dialect {
            Dialect::V31 => {
                out.insert("const".into(), value.clone());
            }
            Dialect::V30 => {
                out.entry("enum").or_insert_with(|| json!([value]));
            }
        }
    }
    insert_opt(out, "default", node.default_value.as_ref());
    insert_opt(out, "example", node.example.as_ref());
    if node.read_only {
        out.insert("readOnly".into(), json!(true));
    }
    if node.write_only {
        out.insert("writeOnly".into(), json!(true));
    }
    if node.deprecated {
        out.insert("deprecated".into(), json!(true));
    }
}

/// Emit an inclusive/exclusive bound pair. OAS 3.0 can only flag the
/// inclusive keyword as exclusive, so the tighter of the two wins there.
fn bound(
    out: &mut Map<String, Value>,
    inclusive_key: &str,
    exclusive_key: &str,
    inclusive: Option<f64>,
    exclusive: Option<f64>,
    dialect: Dialect,
    tighter: fn(f64, f64) -> f64,
) {
    match (dialect, inclusive, exclusive) {
        (_, None, None) => {}
        (_, Some(value), None) => {
            out.insert(inclusive_key.into(), number(value));
        }
        (Dialect::V31, inclusive, Some(value)) => {
            if let Some(inclusive) = inclusive {
                out.insert(inclusive_key.into(), number(inclusive));
            }
            out.insert(exclusive_key.into(), number(value));
        }
        (Dialect::V30, inclusive, Some(value)) => {
            let chosen = inclusive.map_or(value, |i| tighter(i, value));
            out.insert(inclusive_key.into(), number(chosen));
            if chosen == value {
                out.insert(exclusive_key.into(), json!(true));
            }
        }
    }
}

/// Integral values render as integers so `minimum: 0` stays `0`.
fn number(value: f64) -> Value {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if value.fract() == 0.0 && value.abs() <= MAX_SAFE {
        json!(value as i64)
    } else {
        json!(value)
    }
}

fn insert_opt<T: serde::Serialize>(out: &mut Map<String, Value>, key: &str, value: Option<&T>) {
    if let Some(value) = value {
        out.insert(key.into(), json!(value));
    }
}

fn servers(servers: &[IrServer]) -> Value {
    let list = servers
        .iter()
        .map(|server| {
            let mut s = Map::new();
            s.insert("url".into(), json!(server.url));
            insert_opt(&mut s, "description", server.description.as_ref());
            if !server.variables.is_empty() {
                let variables: Map<String, Value> = server
                    .variables
                    .iter()
                    .map(|(name, default)| (name.clone(), json!({ "default": default })))
                    .collect();
                s.insert("variables".into(), Value::Object(variables));
            }
            Value::Object(s)
        })
        .collect();
    Value::Array(list)
}

/// Operations grouped back under their route, in first-seen route order.
fn routes(operations: &[IrOperation], doc: &IrDocument, dialect: Dialect) -> Value {
    let mut by_route: IndexMap<&str, Map<String, Value>> = IndexMap::new();
    for op in operations {
        let item = by_route.entry(op.path.as_str()).or_insert_with(|| {
            let mut item = Map::new();
            insert_opt(&mut item, "summary", op.path_item.summary.as_ref());
            insert_opt(&mut item, "description", op.path_item.description.as_ref());
            if !op.path_item.servers.is_empty() {
                item.insert("servers".into(), servers(&op.path_item.servers));
            }
            if !op.path_item.parameters.is_empty() {
                let params = op
                    .path_item
                    .parameters
                    .iter()
                    .map(|shared| match &shared.reference {
                        Some(raw) => json!({ "$ref": raw }),
                        None => parameter(&shared.parameter, dialect),
                    })
                    .collect();
                item.insert("parameters".into(), Value::Array(params));
            }
            item
        });
        item.insert(op.method.key().into(), operation(op, doc, dialect));
    }
    let map: Map<String, Value> = by_route
        .into_iter()
        .map(|(route, item)| (route.to_string(), Value::Object(item)))
        .collect();
    Value::Object(map)
}

fn operation(op: &IrOperation, doc: &IrDocument, dialect: Dialect) -> Value {
    let mut out = Map::new();
    insert_opt(&mut out, "operationId", op.operation_id.as_ref());
    insert_opt(&mut out, "summary", op.summary.as_ref());
    insert_opt(&mut out, "description", op.description.as_ref());
    if !op.tags.is_empty() {
        out.insert("tags".into(), json!(op.tags));
    }
    // Path-level parameters the operation kept live on the path item.
    let params: Vec<Value> = op
        .parameters
        .iter()
        .filter(|param| !op.path_item.is_shared(param))
        .map(|param| parameter(param, dialect))
        .collect();
    if !params.is_empty() {
        out.insert("parameters".into(), Value::Array(params));
    }
    if let Some(body) = &op.request_body {
        out.insert("requestBody".into(), request_body(body, dialect));
    }
    out.insert("responses".into(), responses(&op.responses, dialect));
    if op.security != doc.security {
        out.insert("security".into(), json!(op.security));
    }
    if !op.servers.is_empty() {
        out.insert("servers".into(), servers(&op.servers));
    }
    if op.deprecated {
        out.insert("deprecated".into(), json!(true));
    }
    Value::Object(out)
}

fn parameter(param: &IrParameter, dialect: Dialect) -> Value {
    let mut out = Map::new();
    out.insert("name".into(), json!(param.original_name));
    out.insert("in".into(), json!(param.location.as_str()));
    insert_opt(&mut out, "description", param.description.as_ref());
    if param.required {
        out.insert("required".into(), json!(true));
    }
    if param.deprecated {
        out.insert("deprecated".into(), json!(true));
    }
    schema_or_content(&mut out, &param.schema, param.media_type.as_ref(), dialect);
    insert_opt(&mut out, "style", param.style.as_ref());
    insert_opt(&mut out, "explode", param.explode.as_ref());
    Value::Object(out)
}

fn header(header: &IrHeader, dialect: Dialect) -> Value {
    let mut out = Map::new();
    insert_opt(&mut out, "description", header.description.as_ref());
    if header.required {
        out.insert("required".into(), json!(true));
    }
    if header.deprecated {
        out.insert("deprecated".into(), json!(true));
    }
    schema_or_content(&mut out, &header.schema, header.media_type.as_ref(), dialect);
    Value::Object(out)
}

fn schema_or_content(
    out: &mut Map<String, Value>,
    schema: &SchemaNode,
    media_type: Option<&String>,
    dialect: Dialect,
) {
    let schema = schema_to_openapi(schema, dialect);
    match media_type {
        Some(media) => {
            out.insert("content".into(), json!({ media: { "schema": schema } }));
        }
        None => {
            out.insert("schema".into(), schema);
        }
    }
}

fn request_body(body: &IrRequestBody, dialect: Dialect) -> Value {
    let mut media = Map::new();
    media.insert("schema".into(), schema_to_openapi(&body.schema, dialect));
    if !body.encoding.is_empty() {
        let encoding: Map<String, Value> = body
            .encoding
            .iter()
            .map(|(field, enc)| {
                let mut e = Map::new();
                insert_opt(&mut e, "contentType", enc.content_type.as_ref());
                if !enc.headers.is_empty() {
                    let headers: Map<String, Value> = enc
                        .headers
                        .iter()
                        .map(|(name, h)| (name.clone(), header(h, dialect)))
                        .collect();
                    e.insert("headers".into(), Value::Object(headers));
                }
                insert_opt(&mut e, "style", enc.style.as_ref());
                insert_opt(&mut e, "explode", enc.explode.as_ref());
                insert_opt(&mut e, "allowReserved", enc.allow_reserved.as_ref());
                (field.clone(), Value::Object(e))
            })
            .collect();
        media.insert("encoding".into(), Value::Object(encoding));
    }

    let mut out = Map::new();
    insert_opt(&mut out, "description", body.description.as_ref());
    let mut content = Map::new();
    content.insert(body.media_type.clone(), Value::Object(media));
    out.insert("content".into(), Value::Object(content));
    if body.required {
        out.insert("required".into(), json!(true));
    }
    Value::Object(out)
}

fn responses(responses: &IrResponses, dialect: Dialect) -> Value {
    let map: Map<String, Value> = responses
        .all
        .iter()
        .map(|(status, r)| (status.to_string(), response(r, dialect)))
        .collect();
    Value::Object(map)
}

fn response(response: &IrResponse, dialect: Dialect) -> Value {
    let mut out = Map::new();
    out.insert("description".into(), json!(response.description));
    if !response.headers.is_empty() {
        let headers: Map<String, Value> = response
            .headers
            .iter()
            .map(|(name, h)| (name.clone(), header(h, dialect)))
            .collect();
        out.insert("headers".into(), Value::Object(headers));
    }
    if let Some(schema) = &response.schema {
        let media = response.media_type.as_deref().unwrap_or("application/json");
        out.insert(
            "content".into(),
            json!({ media: { "schema": schema_to_openapi(schema, dialect) } }),
        );
    }
    Value::Object(out)
}

/// The document's own components and the bundled `x-ext` files.
fn components(doc: &IrDocument, dialect: Dialect) -> (Map<String, Value>, Map<String, Value>) {
    let mut own: Map<String, Value> = Map::new();
    let mut bundled: IndexMap<String, Map<String, Value>> = IndexMap::new();

    for component in &doc.components {
        let value = match &component.kind {
            ComponentKind::Schema(node) => schema_to_openapi(node, dialect),
            ComponentKind::Parameter(param) => parameter(param, dialect),
            ComponentKind::Response(r) => response(r, dialect),
            ComponentKind::RequestBody(body) => request_body(body, dialect),
            ComponentKind::Header(h) => header(h, dialect),
            ComponentKind::SecurityScheme(scheme) => {
                serde_json::to_value(scheme).unwrap_or_default()
            }
            ComponentKind::Link(value)
            | ComponentKind::Callback(value)
            | ComponentKind::PathItem(value)
            | ComponentKind::Example(value) => value.clone(),
        };

        let target = match &component.location {
            RefLocation::Standard => &mut own,
            RefLocation::External { hash } => bundled.entry(hash.clone()).or_default(),
        };
        let section = target
            .entry(component.component_type().section())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(section) = section {
            section.insert(component.name.clone(), value);
        }
    }

    let external = bundled
        .into_iter()
        .map(|(hash, components)| (hash, json!({ "components": components })))
        .collect();
    (own, external)
}
