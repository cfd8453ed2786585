//! Enum Extractor.
//!
//! Walks the finished IR once and catalogs every node with a non-empty
//! `enum`. References are followed to their component node; a visited set
//! keyed by node address keeps shared and cyclic nodes to a single visit.

use std::collections::HashSet;

use indexmap::IndexMap;

use super::name_normalizer::type_name;
use crate::ir::{
    ComponentKind, IrComponent, IrEnum, IrHeader, IrOperation, SchemaIndex, SchemaKind,
    SchemaNode, SchemaOrFlag,
};
use crate::parse::ref_path::escape_pointer_segment;

/// Catalog enums across components, then operations, then webhooks.
pub fn extract_enums(
    components: &[IrComponent],
    operations: &[IrOperation],
    webhooks: &[IrOperation],
    index: &SchemaIndex,
) -> IndexMap<String, IrEnum> {
    let mut extractor = EnumExtractor {
        components,
        index,
        visited: HashSet::new(),
        enums: IndexMap::new(),
        anonymous: 0,
    };

    for component in components {
        extractor.visit_component(component);
    }
    for op in operations {
        extractor.visit_operation(op, "paths");
    }
    for op in webhooks {
        extractor.visit_operation(op, "webhooks");
    }

    log::debug!("extracted {} enums", extractor.enums.len());
    extractor.enums
}

struct EnumExtractor<'d> {
    components: &'d [IrComponent],
    index: &'d SchemaIndex,
    visited: HashSet<usize>,
    enums: IndexMap<String, IrEnum>,
    anonymous: usize,
}

impl<'d> EnumExtractor<'d> {
    fn visit_component(&mut self, component: &'d IrComponent) {
        let hint = Some(component.name.as_str());
        let source = &component.pointer;
        match &component.kind {
            ComponentKind::Schema(node) => self.visit(node, hint, source),
            ComponentKind::Parameter(param) => {
                self.visit(&param.schema, Some(param.original_name.as_str()), source);
            }
            ComponentKind::Header(header) => self.visit(&header.schema, hint, source),
            ComponentKind::RequestBody(body) => self.visit(&body.schema, hint, source),
            ComponentKind::Response(response) => {
                if let Some(schema) = &response.schema {
                    self.visit(schema, hint, source);
                }
                self.visit_headers(&response.headers, source);
            }
            ComponentKind::SecurityScheme(_)
            | ComponentKind::Link(_)
            | ComponentKind::Callback(_)
            | ComponentKind::PathItem(_)
            | ComponentKind::Example(_) => {}
        }
    }

    fn visit_operation(&mut self, op: &'d IrOperation, section: &str) {
        let base = format!(
            "#/{section}/{}/{}",
            escape_pointer_segment(&op.path),
            op.method.key()
        );

        for param in &op.parameters {
            let source = format!("{base}/parameters/{}", escape_pointer_segment(&param.original_name));
            self.visit(&param.schema, Some(param.original_name.as_str()), &source);
        }
        if let Some(body) = &op.request_body {
            let hint = format!("{}Body", op.name.pascal_case);
            self.visit(&body.schema, Some(hint.as_str()), &format!("{base}/requestBody"));
        }
        for (status, response) in &op.responses.all {
            let source = format!("{base}/responses/{status}");
            if let Some(schema) = &response.schema {
                let hint = format!("{}Response", op.name.pascal_case);
                self.visit(schema, Some(hint.as_str()), &source);
            }
            self.visit_headers(&response.headers, &source);
        }
    }

    fn visit_headers(&mut self, headers: &'d IndexMap<String, IrHeader>, source: &str) {
        for (name, header) in headers {
            let source = format!("{source}/headers/{}", escape_pointer_segment(name));
            self.visit(&header.schema, Some(name.as_str()), &source);
        }
    }

    fn visit(&mut self, node: &'d SchemaNode, hint: Option<&str>, source: &str) {
        if !self.visited.insert(std::ptr::from_ref(node) as usize) {
            return;
        }
        if node.has_enum() {
            self.register(node, hint, source);
        }

        match &node.kind {
            SchemaKind::Reference(reference) => {
                let target = self
                    .index
                    .lookup(&reference.target)
                    .and_then(|i| self.components.get(i));
                if let Some(component) = target
                    && let Some(schema) = component.as_schema()
                {
                    self.visit(schema, Some(component.name.as_str()), &component.pointer);
                }
            }
            SchemaKind::Object(obj) => {
                for (name, prop) in &obj.properties {
                    let source = format!("{source}/properties/{}", escape_pointer_segment(name));
                    self.visit(prop, Some(name.as_str()), &source);
                }
                self.visit_flag(obj.additional_properties.as_ref(), hint, source);
            }
            SchemaKind::Array(arr) => {
                for item in &arr.prefix_items {
                    self.visit(item, hint, source);
                }
                self.visit_flag(arr.items.as_ref(), hint, source);
                self.visit_flag(arr.unevaluated_items.as_ref(), hint, source);
            }
            SchemaKind::Composition(comp) => {
                for member in &comp.members {
                    self.visit(member, hint, source);
                }
            }
            SchemaKind::MultiType(members) => {
                for member in members {
                    self.visit(member, hint, source);
                }
            }
            // The values a `not` excludes say nothing about the property name.
            SchemaKind::Not(inner) => self.visit(inner, None, source),
            SchemaKind::Primitive(_) | SchemaKind::Unknown => {}
        }
    }

    fn visit_flag(&mut self, slot: Option<&'d SchemaOrFlag>, hint: Option<&str>, source: &str) {
        if let Some(SchemaOrFlag::Schema(inner)) = slot {
            self.visit(inner, hint, source);
        }
    }

    fn register(&mut self, node: &SchemaNode, hint: Option<&str>, source: &str) {
        let base = match hint.map(type_name) {
            Some(name) if name != "Unnamed" => name,
            _ => {
                self.anonymous += 1;
                let name = format!("Enum_{}", self.anonymous);
                log::warn!("enum at {source} has no contextual name; registered as {name}");
                name
            }
        };

        let primitive = match &node.kind {
            SchemaKind::Primitive(p) => Some(*p),
            _ => None,
        };

        let mut suffix = 1;
        loop {
            let name = if suffix == 1 {
                base.clone()
            } else {
                format!("{base}{suffix}")
            };
            match self.enums.get(&name) {
                Some(existing) if existing.values == node.enum_values => return,
                Some(_) => suffix += 1,
                None => {
                    log::trace!("enum {name} from {source}");
                    self.enums.insert(
                        name.clone(),
                        IrEnum {
                            name,
                            values: node.enum_values.clone(),
                            primitive,
                            description: node.description.clone(),
                            source: source.to_string(),
                        },
                    );
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ObjectShape, PrimitiveType, SchemaRef};
    use crate::parse::ref_path::RefLocation;
    use serde_json::json;

    fn enum_node(values: &[&str]) -> SchemaNode {
        let mut node = SchemaNode::new(SchemaKind::Primitive(PrimitiveType::String));
        node.enum_values = values.iter().map(|v| json!(v)).collect();
        node
    }

    fn object(props: Vec<(&str, SchemaNode)>) -> SchemaNode {
        SchemaNode::new(SchemaKind::Object(ObjectShape {
            properties: props.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            ..ObjectShape::default()
        }))
    }

    fn schema_component(name: &str, node: SchemaNode) -> IrComponent {
        IrComponent {
            name: name.to_string(),
            pointer: format!("#/components/schemas/{name}"),
            location: RefLocation::Standard,
            kind: ComponentKind::Schema(node),
        }
    }

    fn extract(components: &[IrComponent]) -> IndexMap<String, IrEnum> {
        let mut index = SchemaIndex::default();
        for (i, c) in components.iter().enumerate() {
            index.insert(c, i);
        }
        extract_enums(components, &[], &[], &index)
    }

    #[test]
    fn test_component_and_property_names() {
        let components = vec![
            schema_component("Status", enum_node(&["active", "inactive"])),
            schema_component(
                "Pet",
                object(vec![("kind", enum_node(&["cat", "dog"]))]),
            ),
        ];
        let enums = extract(&components);
        let names: Vec<&str> = enums.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Status", "Kind"]);
        assert_eq!(enums["Kind"].source, "#/components/schemas/Pet/properties/kind");
        assert_eq!(enums["Kind"].primitive, Some(PrimitiveType::String));
    }

    #[test]
    fn test_shared_component_visited_once() {
        let status_ref = || {
            SchemaNode::new(SchemaKind::Reference(SchemaRef {
                raw: "#/components/schemas/Status".to_string(),
                target: "#/components/schemas/Status".to_string(),
            }))
        };
        let components = vec![
            schema_component("A", object(vec![("status", status_ref())])),
            schema_component("B", object(vec![("state", status_ref())])),
            schema_component("Status", enum_node(&["on", "off"])),
        ];
        let enums = extract(&components);
        assert_eq!(enums.len(), 1);
        assert_eq!(enums["Status"].source, "#/components/schemas/Status");
    }

    #[test]
    fn test_same_name_different_values_gets_suffix() {
        let components = vec![
            schema_component("A", object(vec![("kind", enum_node(&["x", "y"]))])),
            schema_component("B", object(vec![("kind", enum_node(&["x", "y"]))])),
            schema_component("C", object(vec![("kind", enum_node(&["z"]))])),
        ];
        let enums = extract(&components);
        let names: Vec<&str> = enums.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Kind", "Kind2"]);
        assert_eq!(enums["Kind2"].values, vec![json!("z")]);
    }

    #[test]
    fn test_anonymous_enum_gets_fallback_name() {
        let mut not = SchemaNode::new(SchemaKind::Not(Box::new(enum_node(&["gone"]))));
        not.description = Some("anything but gone".to_string());
        let components = vec![schema_component("Filter", object(vec![("mode", not)]))];
        let enums = extract(&components);
        assert!(enums.contains_key("Enum_1"));
    }

    #[test]
    fn test_cyclic_reference_terminates() {
        let node_ref = SchemaNode::new(SchemaKind::Reference(SchemaRef {
            raw: "#/components/schemas/Node".to_string(),
            target: "#/components/schemas/Node".to_string(),
        }));
        let components = vec![schema_component(
            "Node",
            object(vec![("next", node_ref), ("color", enum_node(&["red", "black"]))]),
        )];
        let enums = extract(&components);
        assert_eq!(enums.len(), 1);
        assert!(enums.contains_key("Color"));
    }
}
