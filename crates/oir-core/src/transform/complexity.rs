//! Schema Complexity Scorer.
//!
//! A rough cost of emitting a node inline. Every child is always visited so
//! deeper nesting scores higher; references are a flat cost and are not
//! followed, which keeps the score finite on cyclic schemas.

use crate::ir::{CompositionKind, SchemaKind, SchemaNode, SchemaOrFlag};

const PRIMITIVE: u32 = 1;
const REFERENCE: u32 = 2;
const UNKNOWN: u32 = 1;
const OBJECT: u32 = 2;
const ARRAY: u32 = 1;
const ALL_OF: u32 = 2;
const ONE_OF: u32 = 2;
const ANY_OF: u32 = 3;
const NOT: u32 = 1;
const MULTI_TYPE: u32 = 1;
const ENUM: u32 = 1;

pub fn complexity_score(node: &SchemaNode) -> u32 {
    let base = match &node.kind {
        SchemaKind::Primitive(_) => PRIMITIVE,
        SchemaKind::Reference(_) => REFERENCE,
        SchemaKind::Unknown => {
            log::trace!("scoring an unknown-shaped schema as {UNKNOWN}");
            UNKNOWN
        }
        SchemaKind::Object(obj) => {
            let properties: u32 = obj.properties.values().map(complexity_score).sum();
            OBJECT + properties + flag_slot(obj.additional_properties.as_ref())
        }
        SchemaKind::Array(arr) => {
            let prefix: u32 = arr.prefix_items.iter().map(complexity_score).sum();
            ARRAY
                + prefix
                + flag_slot(arr.items.as_ref())
                + flag_slot(arr.unevaluated_items.as_ref())
        }
        SchemaKind::Composition(comp) => {
            let fixed = match comp.kind {
                CompositionKind::AllOf => ALL_OF,
                CompositionKind::OneOf => ONE_OF,
                CompositionKind::AnyOf => ANY_OF,
            };
            fixed + comp.members.iter().map(complexity_score).sum::<u32>()
        }
        SchemaKind::Not(inner) => NOT + complexity_score(inner),
        SchemaKind::MultiType(members) => {
            MULTI_TYPE + members.iter().map(complexity_score).sum::<u32>()
        }
    };
    if node.has_enum() { base + ENUM } else { base }
}

fn flag_slot(slot: Option<&SchemaOrFlag>) -> u32 {
    match slot {
        Some(SchemaOrFlag::Schema(inner)) => complexity_score(inner),
        Some(SchemaOrFlag::Flag(_)) | None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ArrayShape, Composition, ObjectShape, PrimitiveType, SchemaRef};
    use indexmap::IndexMap;

    fn primitive() -> SchemaNode {
        SchemaNode::new(SchemaKind::Primitive(PrimitiveType::String))
    }

    fn reference() -> SchemaNode {
        SchemaNode::new(SchemaKind::Reference(SchemaRef {
            raw: "#/components/schemas/Pet".to_string(),
            target: "#/components/schemas/Pet".to_string(),
        }))
    }

    fn object(props: Vec<(&str, SchemaNode)>) -> SchemaNode {
        let properties: IndexMap<String, SchemaNode> =
            props.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        SchemaNode::new(SchemaKind::Object(ObjectShape {
            properties,
            ..ObjectShape::default()
        }))
    }

    fn composition(kind: CompositionKind, members: Vec<SchemaNode>) -> SchemaNode {
        SchemaNode::new(SchemaKind::Composition(Composition {
            kind,
            members,
            discriminator: None,
            inheritance: None,
        }))
    }

    #[test]
    fn test_leaves() {
        assert_eq!(complexity_score(&primitive()), 1);
        assert_eq!(complexity_score(&reference()), 2);
        assert_eq!(complexity_score(&SchemaNode::unknown()), 1);
    }

    #[test]
    fn test_enum_adds_to_base() {
        let mut status = primitive();
        status.enum_values = vec![serde_json::json!("a"), serde_json::json!("b")];
        assert_eq!(complexity_score(&status), 2);
    }

    #[test]
    fn test_object_sums_properties() {
        let node = object(vec![("id", primitive()), ("owner", reference())]);
        assert_eq!(complexity_score(&node), 2 + 1 + 2);
    }

    #[test]
    fn test_array_adds_items() {
        let node = SchemaNode::new(SchemaKind::Array(ArrayShape {
            items: Some(SchemaOrFlag::Schema(Box::new(reference()))),
            ..ArrayShape::default()
        }));
        assert_eq!(complexity_score(&node), 3);
    }

    #[test]
    fn test_any_of_costs_more_than_one_of() {
        let one = composition(CompositionKind::OneOf, vec![primitive(), primitive()]);
        let any = composition(CompositionKind::AnyOf, vec![primitive(), primitive()]);
        assert!(complexity_score(&any) > complexity_score(&one));
        assert_eq!(
            complexity_score(&composition(CompositionKind::AllOf, vec![primitive(), primitive()])),
            complexity_score(&one)
        );
    }

    #[test]
    fn test_nesting_scores_higher() {
        let shallow = object(vec![("a", primitive())]);
        let deep = object(vec![("a", object(vec![("b", object(vec![("c", primitive())]))]))]);
        assert!(complexity_score(&deep) > complexity_score(&shallow));
        assert_eq!(complexity_score(&deep), 7);
    }
}
