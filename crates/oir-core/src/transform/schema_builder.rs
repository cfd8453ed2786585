//! Schema Node Builder.
//!
//! Converts a raw schema into a [`SchemaNode`], choosing exactly one
//! [`SchemaKind`] per node. Checks run in a fixed order: reference,
//! composition, type array, `not`, then the single type (explicit or
//! inferred from `enum`/`const`/object/array keywords).

use serde_json::Value;

use super::chain::chain_hints;
use super::composition::infer_inheritance;
use super::dependency_graph::DependencyGraph;
use super::spec_to_ir::BuildOptions;
use crate::error::BuildError;
use crate::ir::{
    ArrayShape, Composition, CompositionKind, Constraints, IrDiscriminator, ObjectShape,
    PrimitiveType, SchemaKind, SchemaNode, SchemaOrFlag, SchemaRef,
};
use crate::parse::ref_path::escape_pointer_segment;
use crate::parse::ref_resolve::ComponentResolver;
use crate::parse::schema::{
    ExclusiveBound, Schema, SchemaOrBool, SchemaOrRef, SchemaType, TypeSet,
};

/// Where the node being built lives, which decides how `$ref`s are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildScope {
    /// Inside `components`: alias chains are followed.
    Component,
    /// Inside an operation: a schema `$ref` must land on a concrete schema.
    Operation,
}

/// Everything a recursive build step needs, passed down explicitly.
#[derive(Debug, Clone)]
pub struct BuildContext<'a> {
    pub resolver: ComponentResolver<'a>,
    pub graph: &'a DependencyGraph,
    pub options: &'a BuildOptions,
    pub scope: BuildScope,
    /// JSON-pointer-like location of the node, for errors.
    pub path: String,
    /// Whether the immediate parent requires this node.
    pub required: bool,
    /// Component schemas on a cycle with the root being built.
    pub cycle: &'a [String],
}

impl<'a> BuildContext<'a> {
    pub fn new(
        resolver: ComponentResolver<'a>,
        graph: &'a DependencyGraph,
        options: &'a BuildOptions,
        scope: BuildScope,
        path: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            graph,
            options,
            scope,
            path: path.into(),
            required: true,
            cycle: &[],
        }
    }

    pub fn with_cycle(mut self, cycle: &'a [String]) -> Self {
        self.cycle = cycle;
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Context for a child node at `segment` below this one.
    pub fn child(&self, segment: &str, required: bool) -> Self {
        Self {
            path: format!("{}/{}", self.path, segment),
            required,
            ..self.clone()
        }
    }

    /// Context for a named child such as a property, escaping the name.
    pub fn named_child(&self, keyword: &str, name: &str, required: bool) -> Self {
        self.child(
            &format!("{keyword}/{}", escape_pointer_segment(name)),
            required,
        )
    }

    fn unsupported(&self, reason: impl Into<String>) -> BuildError {
        BuildError::UnsupportedSchema {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }
}

/// Build a schema slot: a `$ref` or an inline schema.
pub fn build_schema(slot: &SchemaOrRef, ctx: &BuildContext<'_>) -> Result<SchemaNode, BuildError> {
    match slot {
        SchemaOrRef::Ref { ref_path } => build_reference(ref_path, ctx),
        SchemaOrRef::Schema(schema) => build_inline(schema, ctx),
    }
}

/// Build an optional slot. A missing schema builds as an unknown node so the
/// caller still gets metadata.
pub fn build_optional_schema(
    slot: Option<&SchemaOrRef>,
    ctx: &BuildContext<'_>,
) -> Result<SchemaNode, BuildError> {
    match slot {
        Some(slot) => build_schema(slot, ctx),
        None => build_inline(&Schema::default(), ctx),
    }
}

/// Build a component schema root, attaching graph-derived metadata.
pub fn build_component_schema(
    pointer: &str,
    slot: &SchemaOrRef,
    resolver: ComponentResolver<'_>,
    graph: &DependencyGraph,
    options: &BuildOptions,
) -> Result<SchemaNode, BuildError> {
    let cycle = graph.cycle_partners(pointer);
    let ctx = BuildContext::new(resolver, graph, options, BuildScope::Component, pointer)
        .with_cycle(&cycle);
    let mut node = build_schema(slot, &ctx)?;

    node.metadata.circular_references = cycle.clone();
    if let Some(graph_node) = graph.node(pointer) {
        node.metadata.dependencies.referenced_by =
            graph_node.dependents.iter().cloned().collect();
        node.metadata.dependencies.depth = graph_node.depth;
    }
    log::trace!(
        "built {pointer}: {} refs, circular={}",
        node.metadata.dependencies.references.len(),
        node.metadata.is_circular()
    );
    Ok(node)
}

fn build_reference(raw: &str, ctx: &BuildContext<'_>) -> Result<SchemaNode, BuildError> {
    match ctx.scope {
        BuildScope::Component => {
            ctx.resolver.resolve::<SchemaOrRef>(raw)?;
        }
        BuildScope::Operation => {
            ctx.resolver.resolve_schema(raw)?;
        }
    }
    let target = ctx.resolver.schema_pointer(raw)?;

    let mut node = SchemaNode::new(SchemaKind::Reference(SchemaRef {
        raw: raw.to_string(),
        target,
    }));
    finish(&mut node, ctx, false);
    Ok(node)
}

fn build_inline(schema: &Schema, ctx: &BuildContext<'_>) -> Result<SchemaNode, BuildError> {
    let nullable = is_nullable(schema);

    if let Some((kind, members)) = split_composition(schema) {
        return build_composition(schema, kind, &members, nullable, ctx);
    }

    let kind = match &schema.schema_type {
        Some(TypeSet::Multiple(types)) => {
            let non_null = non_null_types(types);
            match non_null.as_slice() {
                [] if types.is_empty() => implicit_kind(schema, ctx)?,
                [] => SchemaKind::Primitive(PrimitiveType::Null),
                [single] => typed_kind(single, schema, ctx)?,
                _ => build_multi_type(schema, &non_null, ctx)?,
            }
        }
        Some(TypeSet::Single(single)) => typed_kind(single, schema, ctx)?,
        None => implicit_kind(schema, ctx)?,
    };

    let mut node = SchemaNode::new(kind);
    apply_common(&mut node, schema);
    finish(&mut node, ctx, nullable);
    Ok(node)
}

/// `nullable: true` or a `"null"` member of the type array. The two are
/// alternative spellings, so either one alone is enough.
pub fn is_nullable(schema: &Schema) -> bool {
    schema.nullable == Some(true)
        || schema
            .schema_type
            .as_ref()
            .is_some_and(TypeSet::contains_null)
}

fn non_null_types(types: &[SchemaType]) -> Vec<SchemaType> {
    let mut out: Vec<SchemaType> = Vec::new();
    for t in types {
        if *t != SchemaType::Null && !out.contains(t) {
            out.push(t.clone());
        }
    }
    out
}

fn typed_kind(
    schema_type: &SchemaType,
    schema: &Schema,
    ctx: &BuildContext<'_>,
) -> Result<SchemaKind, BuildError> {
    let kind = match schema_type {
        SchemaType::String => SchemaKind::Primitive(PrimitiveType::String),
        SchemaType::Number => SchemaKind::Primitive(PrimitiveType::Number),
        SchemaType::Integer => SchemaKind::Primitive(PrimitiveType::Integer),
        SchemaType::Boolean => SchemaKind::Primitive(PrimitiveType::Boolean),
        SchemaType::Null => SchemaKind::Primitive(PrimitiveType::Null),
        SchemaType::Array => SchemaKind::Array(build_array(schema, ctx)?),
        SchemaType::Object => SchemaKind::Object(build_object(schema, ctx)?),
        SchemaType::Other(name) => {
            return Err(ctx.unsupported(format!("unrecognized type '{name}'")));
        }
    };
    Ok(kind)
}

/// The shape of a schema without a `type` keyword.
fn implicit_kind(schema: &Schema, ctx: &BuildContext<'_>) -> Result<SchemaKind, BuildError> {
    if let Some(not) = &schema.not {
        let inner = build_schema(not, &ctx.child("not", true))?;
        return Ok(SchemaKind::Not(Box::new(inner)));
    }
    if has_object_keywords(schema) {
        return Ok(SchemaKind::Object(build_object(schema, ctx)?));
    }
    if schema.items.is_some() || !schema.prefix_items.is_empty() {
        return Ok(SchemaKind::Array(build_array(schema, ctx)?));
    }
    if !schema.enum_values.is_empty() {
        return Ok(infer_from_values(&schema.enum_values));
    }
    if let Some(value) = &schema.const_value {
        return Ok(infer_from_values(std::slice::from_ref(value)));
    }
    Ok(SchemaKind::Unknown)
}

fn has_object_keywords(schema: &Schema) -> bool {
    !schema.properties.is_empty()
        || schema.additional_properties.is_some()
        || !schema.required.is_empty()
}

/// Infer the primitive of an untyped `enum`/`const` from its values.
/// `null` members are ignored; mixed values give an unknown shape.
fn infer_from_values(values: &[Value]) -> SchemaKind {
    let mut inferred: Option<PrimitiveType> = None;
    for value in values {
        let this = match value {
            Value::Null => continue,
            Value::String(_) => PrimitiveType::String,
            Value::Bool(_) => PrimitiveType::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => PrimitiveType::Integer,
            Value::Number(_) => PrimitiveType::Number,
            Value::Array(_) | Value::Object(_) => return SchemaKind::Unknown,
        };
        inferred = match (inferred, this) {
            (None, t) => Some(t),
            (Some(a), b) if a == b => Some(a),
            (Some(PrimitiveType::Integer), PrimitiveType::Number)
            | (Some(PrimitiveType::Number), PrimitiveType::Integer) => Some(PrimitiveType::Number),
            _ => return SchemaKind::Unknown,
        };
    }
    inferred.map_or(SchemaKind::Unknown, SchemaKind::Primitive)
}

fn build_object(schema: &Schema, ctx: &BuildContext<'_>) -> Result<ObjectShape, BuildError> {
    let mut properties = indexmap::IndexMap::with_capacity(schema.properties.len());
    for (name, prop) in &schema.properties {
        let required = schema.required.contains(name);
        let child = ctx.named_child("properties", name, required);
        properties.insert(name.clone(), build_schema(prop, &child)?);
    }

    let additional_properties = schema
        .additional_properties
        .as_ref()
        .map(|slot| build_flag_slot(slot, &ctx.child("additionalProperties", true)))
        .transpose()?;

    Ok(ObjectShape {
        properties,
        required: schema.required.clone(),
        additional_properties,
        min_properties: schema.min_properties,
        max_properties: schema.max_properties,
    })
}

fn build_array(schema: &Schema, ctx: &BuildContext<'_>) -> Result<ArrayShape, BuildError> {
    let items = schema
        .items
        .as_ref()
        .map(|slot| build_flag_slot(slot, &ctx.child("items", true)))
        .transpose()?;

    let mut prefix_items = Vec::with_capacity(schema.prefix_items.len());
    for (index, item) in schema.prefix_items.iter().enumerate() {
        prefix_items.push(build_schema(item, &ctx.child(&format!("prefixItems/{index}"), true))?);
    }

    let unevaluated_items = schema
        .unevaluated_items
        .as_ref()
        .map(|slot| build_flag_slot(slot, &ctx.child("unevaluatedItems", true)))
        .transpose()?;

    Ok(ArrayShape {
        items,
        prefix_items,
        unevaluated_items,
    })
}

fn build_flag_slot(slot: &SchemaOrBool, ctx: &BuildContext<'_>) -> Result<SchemaOrFlag, BuildError> {
    match slot {
        SchemaOrBool::Bool(flag) => Ok(SchemaOrFlag::Flag(*flag)),
        SchemaOrBool::Schema(inner) => Ok(SchemaOrFlag::Schema(Box::new(build_schema(inner, ctx)?))),
    }
}

/// One member per non-null type, each built as if it were the only type.
fn build_multi_type(
    schema: &Schema,
    types: &[SchemaType],
    ctx: &BuildContext<'_>,
) -> Result<SchemaKind, BuildError> {
    let mut members = Vec::with_capacity(types.len());
    for (index, schema_type) in types.iter().enumerate() {
        let mut single = shape_only(schema);
        single.schema_type = Some(TypeSet::Single(schema_type.clone()));
        members.push(build_inline(&single, &ctx.child(&format!("type/{index}"), true))?);
    }
    Ok(SchemaKind::MultiType(members))
}

/// Decide the composition a schema builds as, if any.
///
/// A lone composition keyword builds as itself. Several keywords, or one
/// next to other shape keywords, fold into an `allOf` whose members are the
/// remaining shape plus each keyword's contribution.
fn split_composition(schema: &Schema) -> Option<(CompositionKind, Vec<SchemaOrRef>)> {
    let keywords: Vec<(CompositionKind, &Vec<SchemaOrRef>)> = [
        (CompositionKind::AllOf, &schema.all_of),
        (CompositionKind::OneOf, &schema.one_of),
        (CompositionKind::AnyOf, &schema.any_of),
    ]
    .into_iter()
    .filter(|(_, members)| !members.is_empty())
    .collect();

    if keywords.is_empty() {
        return None;
    }

    let residual = residual_shape(schema);
    if let ([(kind, members)], None) = (keywords.as_slice(), &residual) {
        return Some((*kind, (*members).clone()));
    }

    let mut parts = Vec::new();
    if let Some(residual) = residual {
        parts.push(SchemaOrRef::Schema(Box::new(residual)));
    }
    for (kind, members) in keywords {
        match kind {
            CompositionKind::AllOf => parts.extend(members.iter().cloned()),
            CompositionKind::OneOf => parts.push(SchemaOrRef::Schema(Box::new(Schema {
                one_of: members.clone(),
                discriminator: schema.discriminator.clone(),
                ..Schema::default()
            }))),
            CompositionKind::AnyOf => parts.push(SchemaOrRef::Schema(Box::new(Schema {
                any_of: members.clone(),
                discriminator: schema.discriminator.clone(),
                ..Schema::default()
            }))),
        }
    }
    Some((CompositionKind::AllOf, parts))
}

/// The schema minus its composition keywords and annotations, or `None`
/// when nothing shape-bearing is left. A bare `type: object` is only a hint.
fn residual_shape(schema: &Schema) -> Option<Schema> {
    let mut residual = shape_only(schema);
    residual.all_of.clear();
    residual.one_of.clear();
    residual.any_of.clear();
    residual.discriminator = None;
    residual.schema_type = match residual.schema_type.take() {
        Some(TypeSet::Multiple(types)) => match non_null_types(&types).as_slice() {
            [] => None,
            [single] => Some(TypeSet::Single(single.clone())),
            many => Some(TypeSet::Multiple(many.to_vec())),
        },
        Some(TypeSet::Single(SchemaType::Null)) => None,
        other => other,
    };

    let type_hint_only = matches!(
        residual.schema_type,
        None | Some(TypeSet::Single(SchemaType::Object))
    );
    let has_shape = has_object_keywords(&residual)
        || residual.items.is_some()
        || !residual.prefix_items.is_empty()
        || residual.not.is_some()
        || !residual.enum_values.is_empty()
        || residual.const_value.is_some()
        || !type_hint_only;
    has_shape.then_some(residual)
}

/// A copy carrying only shape keywords: annotations stay on the outer node.
fn shape_only(schema: &Schema) -> Schema {
    Schema {
        title: None,
        description: None,
        default_value: None,
        nullable: None,
        deprecated: None,
        read_only: None,
        write_only: None,
        example: None,
        examples: None,
        enum_values: Vec::new(),
        const_value: None,
        ..schema.clone()
    }
}

fn build_composition(
    schema: &Schema,
    kind: CompositionKind,
    members: &[SchemaOrRef],
    nullable: bool,
    ctx: &BuildContext<'_>,
) -> Result<SchemaNode, BuildError> {
    if let [only] = members {
        // A single member is the member itself, annotated by its wrapper.
        let mut node = build_schema(only, ctx)?;
        if !node.is_reference() {
            if node.description.is_none() {
                node.description = schema.description.clone();
            }
            if node.title.is_none() {
                node.title = schema.title.clone();
            }
            if node.default_value.is_none() {
                node.default_value = schema.default_value.clone();
            }
        }
        let nullable = nullable || node.metadata.nullable;
        finish(&mut node, ctx, nullable);
        return Ok(node);
    }

    let mut built = Vec::with_capacity(members.len());
    for (index, member) in members.iter().enumerate() {
        let child = ctx.child(&format!("{}/{index}", kind.keyword()), true);
        built.push(build_schema(member, &child)?);
    }

    let inheritance = match kind {
        CompositionKind::AllOf if ctx.options.infer_all_of_inheritance => {
            infer_inheritance(members)
        }
        _ => None,
    };
    let discriminator = match kind {
        CompositionKind::OneOf | CompositionKind::AnyOf => {
            schema.discriminator.as_ref().map(|d| IrDiscriminator {
                property_name: d.property_name.clone(),
                mapping: d
                    .mapping
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            })
        }
        CompositionKind::AllOf => None,
    };

    let mut node = SchemaNode::new(SchemaKind::Composition(Composition {
        kind,
        members: built,
        discriminator,
        inheritance,
    }));
    apply_annotations(&mut node, schema);
    finish(&mut node, ctx, nullable);
    Ok(node)
}

fn apply_annotations(node: &mut SchemaNode, schema: &Schema) {
    node.title = schema.title.clone();
    node.description = schema.description.clone();
    node.default_value = schema.default_value.clone();
    node.example = schema.example.clone().or_else(|| first_example(schema));
    node.read_only = schema.read_only.unwrap_or(false);
    node.write_only = schema.write_only.unwrap_or(false);
    node.deprecated = schema.deprecated.unwrap_or(false);
}

fn apply_common(node: &mut SchemaNode, schema: &Schema) {
    apply_annotations(node, schema);
    node.format = schema.format.clone();
    node.enum_values = schema.enum_values.clone();
    node.const_value = schema.const_value.clone();
    node.constraints = constraints(schema);
}

/// OAS 3.1 `examples` is an array; take its first entry.
fn first_example(schema: &Schema) -> Option<Value> {
    match &schema.examples {
        Some(Value::Array(values)) => values.first().cloned(),
        _ => None,
    }
}

fn constraints(schema: &Schema) -> Constraints {
    let (minimum, exclusive_minimum) = exclusive(schema.minimum, schema.exclusive_minimum);
    let (maximum, exclusive_maximum) = exclusive(schema.maximum, schema.exclusive_maximum);
    Constraints {
        min_length: schema.min_length,
        max_length: schema.max_length,
        pattern: schema.pattern.clone(),
        minimum,
        maximum,
        exclusive_minimum,
        exclusive_maximum,
        multiple_of: schema.multiple_of,
        min_items: schema.min_items,
        max_items: schema.max_items,
        unique_items: schema.unique_items.unwrap_or(false),
    }
}

/// Normalize an inclusive bound plus an OAS 3.0 flag or OAS 3.1 value.
fn exclusive(bound: Option<f64>, flag: Option<ExclusiveBound>) -> (Option<f64>, Option<f64>) {
    match flag {
        Some(ExclusiveBound::Flag(true)) => (None, bound),
        Some(ExclusiveBound::Value(value)) => (bound, Some(value)),
        Some(ExclusiveBound::Flag(false)) | None => (bound, None),
    }
}

/// Fill in context-derived metadata once the node's shape is final.
fn finish(node: &mut SchemaNode, ctx: &BuildContext<'_>, nullable: bool) {
    let mut references: Vec<String> = Vec::new();
    if let SchemaKind::Reference(r) = &node.kind {
        references.push(r.target.clone());
    }
    for child in node.children() {
        for r in &child.metadata.dependencies.references {
            if !references.contains(r) {
                references.push(r.clone());
            }
        }
    }

    // A reference back into the component's own cycle group sits at the
    // group's depth, never below it.
    let depth = references
        .iter()
        .map(|r| {
            let depth = ctx.graph.depth(r);
            if ctx.cycle.contains(r) { depth } else { depth + 1 }
        })
        .max()
        .unwrap_or(0);
    let circular_references = references
        .iter()
        .filter(|r| ctx.cycle.contains(r))
        .cloned()
        .collect();

    node.metadata.required = ctx.required;
    node.metadata.nullable = nullable;
    node.metadata.dependencies.references = references;
    node.metadata.dependencies.depth = depth;
    node.metadata.circular_references = circular_references;
    node.metadata.chain = chain_hints(node);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use crate::parse::spec::OpenApiSpec;

    fn spec(yaml_schemas: &str) -> OpenApiSpec {
        let yaml = format!(
            "openapi: \"3.1.0\"\ninfo:\n  title: t\n  version: \"1\"\npaths: {{}}\ncomponents:\n  schemas:\n{yaml_schemas}"
        );
        parse::from_yaml(&yaml).unwrap()
    }

    fn build(spec: &OpenApiSpec, name: &str) -> Result<SchemaNode, BuildError> {
        let resolver = ComponentResolver::new(spec);
        let graph = DependencyGraph::build(&resolver).unwrap();
        let options = BuildOptions::default();
        let pointer = crate::parse::ref_path::schema_pointer(name);
        let slot = &spec.components.as_ref().unwrap().schemas[name];
        build_component_schema(&pointer, slot, resolver, &graph, &options)
    }

    fn object(node: &SchemaNode) -> &ObjectShape {
        match &node.kind {
            SchemaKind::Object(obj) => obj,
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn test_type_array_with_null_is_nullable_once() {
        let spec = spec(
            r#"
    Name:
      type: [string, "null"]
"#,
        );
        let node = build(&spec, "Name").unwrap();
        assert_eq!(node.kind, SchemaKind::Primitive(PrimitiveType::String));
        assert!(node.metadata.nullable);
        assert_eq!(node.metadata.chain.presence.as_deref(), Some(".nullable()"));
    }

    #[test]
    fn test_nullable_flag_and_type_array_do_not_stack() {
        let spec = spec(
            r#"
    Both:
      type: [string, "null"]
      nullable: true
    Flag:
      type: string
      nullable: true
    Plain:
      type: string
      nullable: false
"#,
        );
        assert!(build(&spec, "Both").unwrap().metadata.nullable);
        assert!(build(&spec, "Flag").unwrap().metadata.nullable);
        assert!(!build(&spec, "Plain").unwrap().metadata.nullable);
    }

    #[test]
    fn test_multi_type_builds_members() {
        let spec = spec(
            r#"
    Id:
      type: [string, integer, "null"]
      description: An id
"#,
        );
        let node = build(&spec, "Id").unwrap();
        let SchemaKind::MultiType(members) = &node.kind else {
            panic!("expected multi type, got {:?}", node.kind);
        };
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].kind, SchemaKind::Primitive(PrimitiveType::String));
        assert_eq!(members[1].kind, SchemaKind::Primitive(PrimitiveType::Integer));
        assert!(members.iter().all(|m| !m.metadata.nullable));
        assert!(node.metadata.nullable);
        assert_eq!(node.description.as_deref(), Some("An id"));
    }

    #[test]
    fn test_required_propagation() {
        let spec = spec(
            r#"
    User:
      type: object
      required: [id, email]
      properties:
        id:
          type: string
        email:
          type: string
          format: email
        name:
          type: string
"#,
        );
        let node = build(&spec, "User").unwrap();
        let obj = object(&node);
        assert!(obj.properties["id"].metadata.required);
        assert!(obj.properties["email"].metadata.required);
        assert!(!obj.properties["name"].metadata.required);
        assert_eq!(
            obj.properties["name"].metadata.chain.presence.as_deref(),
            Some(".optional()")
        );
        assert_eq!(obj.properties["email"].metadata.chain.validations, vec![".email()"]);
    }

    #[test]
    fn test_component_refs_are_preserved() {
        let spec = spec(
            r##"
    User:
      type: object
      properties:
        address:
          $ref: "#/components/schemas/Address"
    Address:
      type: object
      properties:
        city:
          type: string
"##,
        );
        let node = build(&spec, "User").unwrap();
        let address = &object(&node).properties["address"];
        let reference = address.reference().unwrap();
        assert_eq!(reference.raw, "#/components/schemas/Address");
        assert_eq!(reference.target, "#/components/schemas/Address");
        assert_eq!(
            node.metadata.dependencies.references,
            vec!["#/components/schemas/Address"]
        );
        assert_eq!(node.metadata.dependencies.depth, 1);
        assert!(node.metadata.circular_references.is_empty());
    }

    #[test]
    fn test_self_reference_marks_circular() {
        let spec = spec(
            r##"
    Node:
      type: object
      properties:
        value:
          type: integer
        next:
          $ref: "#/components/schemas/Node"
"##,
        );
        let node = build(&spec, "Node").unwrap();
        assert_eq!(
            node.metadata.circular_references,
            vec!["#/components/schemas/Node"]
        );
        let next = &object(&node).properties["next"];
        assert_eq!(
            next.metadata.circular_references,
            vec!["#/components/schemas/Node"]
        );
        assert!(object(&node).properties["value"]
            .metadata
            .circular_references
            .is_empty());
    }

    #[test]
    fn test_self_reference_depth_matches_component() {
        let spec = spec(
            r##"
    Node:
      type: object
      properties:
        next:
          $ref: "#/components/schemas/Node"
        children:
          type: array
          items:
            $ref: "#/components/schemas/Node"
"##,
        );
        let node = build(&spec, "Node").unwrap();
        assert_eq!(node.metadata.dependencies.depth, 1);
        let obj = object(&node);
        assert_eq!(obj.properties["next"].metadata.dependencies.depth, 1);
        assert_eq!(obj.properties["children"].metadata.dependencies.depth, 1);
    }

    #[test]
    fn test_circular_alias_chain_fails() {
        let spec = spec(
            r##"
    Holder:
      type: object
      properties:
        ping:
          $ref: "#/components/schemas/Ping"
    Ping:
      $ref: "#/components/schemas/Pong"
    Pong:
      $ref: "#/components/schemas/Ping"
"##,
        );
        let err = build(&spec, "Holder").unwrap_err();
        assert!(matches!(
            err,
            BuildError::Resolve(crate::error::ResolveError::CircularRef { .. })
        ));
    }

    #[test]
    fn test_single_member_composition_collapses() {
        let spec = spec(
            r##"
    Wrapped:
      description: Just a pet
      allOf:
        - $ref: "#/components/schemas/Pet"
    Inline:
      description: Inline wrapper
      oneOf:
        - type: string
    Pet:
      type: object
"##,
        );
        let wrapped = build(&spec, "Wrapped").unwrap();
        assert!(wrapped.is_reference());

        let inline = build(&spec, "Inline").unwrap();
        assert_eq!(inline.kind, SchemaKind::Primitive(PrimitiveType::String));
        assert_eq!(inline.description.as_deref(), Some("Inline wrapper"));
    }

    #[test]
    fn test_all_of_inheritance_inference() {
        let spec = spec(
            r##"
    Dog:
      allOf:
        - $ref: "#/components/schemas/Pet"
        - type: object
          required: [bark]
          properties:
            bark:
              type: boolean
    Pet:
      type: object
      properties:
        name:
          type: string
"##,
        );
        let node = build(&spec, "Dog").unwrap();
        let SchemaKind::Composition(comp) = &node.kind else {
            panic!("expected composition");
        };
        assert_eq!(comp.kind, CompositionKind::AllOf);
        assert_eq!(comp.members.len(), 2);
        let inheritance = comp.inheritance.as_ref().unwrap();
        assert_eq!(inheritance.bases, vec!["#/components/schemas/Pet"]);
        assert_eq!(inheritance.required, vec!["bark"]);
    }

    #[test]
    fn test_composition_with_object_keywords_folds_into_all_of() {
        let spec = spec(
            r##"
    Mixed:
      type: object
      properties:
        id:
          type: string
      oneOf:
        - $ref: "#/components/schemas/A"
        - $ref: "#/components/schemas/B"
      discriminator:
        propertyName: kind
    A:
      type: object
    B:
      type: object
"##,
        );
        let node = build(&spec, "Mixed").unwrap();
        let SchemaKind::Composition(comp) = &node.kind else {
            panic!("expected composition");
        };
        assert_eq!(comp.kind, CompositionKind::AllOf);
        assert_eq!(comp.members.len(), 2);
        assert!(matches!(comp.members[0].kind, SchemaKind::Object(_)));
        let SchemaKind::Composition(inner) = &comp.members[1].kind else {
            panic!("expected nested oneOf");
        };
        assert_eq!(inner.kind, CompositionKind::OneOf);
        assert_eq!(
            inner.discriminator.as_ref().unwrap().property_name,
            "kind"
        );
    }

    #[test]
    fn test_enum_keeps_type_and_values() {
        let spec = spec(
            r#"
    Status:
      type: string
      enum: [active, inactive]
    Untyped:
      enum: [1, 2, 3]
"#,
        );
        let status = build(&spec, "Status").unwrap();
        assert_eq!(status.kind, SchemaKind::Primitive(PrimitiveType::String));
        assert_eq!(status.enum_values.len(), 2);

        let untyped = build(&spec, "Untyped").unwrap();
        assert_eq!(untyped.kind, SchemaKind::Primitive(PrimitiveType::Integer));
        assert_eq!(untyped.enum_values.len(), 3);
    }

    #[test]
    fn test_array_shapes() {
        let spec = spec(
            r#"
    Tags:
      type: array
      items:
        type: string
    Anything:
      type: array
    Pair:
      type: array
      prefixItems:
        - type: string
        - type: integer
      items: false
"#,
        );
        let SchemaKind::Array(tags) = build(&spec, "Tags").unwrap().kind else {
            panic!("expected array");
        };
        assert!(matches!(tags.items, Some(SchemaOrFlag::Schema(_))));

        let SchemaKind::Array(anything) = build(&spec, "Anything").unwrap().kind else {
            panic!("expected array");
        };
        assert!(anything.items.is_none());

        let SchemaKind::Array(pair) = build(&spec, "Pair").unwrap().kind else {
            panic!("expected array");
        };
        assert_eq!(pair.prefix_items.len(), 2);
        assert_eq!(pair.items, Some(SchemaOrFlag::Flag(false)));
    }

    #[test]
    fn test_object_fallbacks() {
        let spec = spec(
            r#"
    Empty:
      type: object
    Map:
      additionalProperties:
        type: integer
    Free:
      description: anything goes
"#,
        );
        let empty = build(&spec, "Empty").unwrap();
        assert!(object(&empty).properties.is_empty());

        let map = build(&spec, "Map").unwrap();
        assert!(matches!(
            object(&map).additional_properties,
            Some(SchemaOrFlag::Schema(_))
        ));

        let free = build(&spec, "Free").unwrap();
        assert_eq!(free.kind, SchemaKind::Unknown);
    }

    #[test]
    fn test_unrecognized_type_fails_with_path() {
        let spec = spec(
            r#"
    Broken:
      type: object
      properties:
        when:
          type: datetime
"#,
        );
        let err = build(&spec, "Broken").unwrap_err();
        let BuildError::UnsupportedSchema { path, reason } = err else {
            panic!("expected unsupported schema, got {err:?}");
        };
        assert_eq!(path, "#/components/schemas/Broken/properties/when");
        assert!(reason.contains("datetime"));
    }

    #[test]
    fn test_exclusive_bounds_normalized() {
        let spec = spec(
            r#"
    Legacy:
      type: number
      minimum: 0
      exclusiveMinimum: true
    Modern:
      type: number
      exclusiveMaximum: 10
"#,
        );
        let legacy = build(&spec, "Legacy").unwrap();
        assert_eq!(legacy.constraints.minimum, None);
        assert_eq!(legacy.constraints.exclusive_minimum, Some(0.0));

        let modern = build(&spec, "Modern").unwrap();
        assert_eq!(modern.constraints.exclusive_maximum, Some(10.0));
        assert_eq!(modern.metadata.chain.validations, vec![".lt(10)"]);
    }

    #[test]
    fn test_operation_scope_rejects_double_indirection() {
        let spec = spec(
            r##"
    Pet:
      type: object
    PetAlias:
      $ref: "#/components/schemas/Pet"
"##,
        );
        let resolver = ComponentResolver::new(&spec);
        let graph = DependencyGraph::build(&resolver).unwrap();
        let options = BuildOptions::default();
        let ctx = BuildContext::new(resolver, &graph, &options, BuildScope::Operation, "#/paths");
        let slot = SchemaOrRef::Ref {
            ref_path: "#/components/schemas/PetAlias".to_string(),
        };
        let err = build_schema(&slot, &ctx).unwrap_err();
        assert!(err.to_string().contains("fully dereferenced"));

        let direct = SchemaOrRef::Ref {
            ref_path: "#/components/schemas/Pet".to_string(),
        };
        assert!(build_schema(&direct, &ctx).unwrap().is_reference());
    }

    #[test]
    fn test_build_is_deterministic() {
        let spec = spec(
            r##"
    A:
      type: object
      properties:
        b:
          $ref: "#/components/schemas/B"
    B:
      type: array
      items:
        $ref: "#/components/schemas/A"
"##,
        );
        assert_eq!(build(&spec, "A").unwrap(), build(&spec, "A").unwrap());
    }
}
