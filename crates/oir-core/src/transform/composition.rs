//! `allOf` inheritance inference.
//!
//! A best-effort reading of `allOf: [$ref Base, {properties: ...}]` as
//! "extends Base". It only feeds naming and deduplication downstream and is
//! switched off with `BuildOptions::infer_all_of_inheritance`.

use crate::ir::Inheritance;
use crate::parse::schema::{Schema, SchemaOrRef};

/// Split `allOf` members into bases, extensions and required property names.
///
/// Returns `None` when no member names a base schema.
pub fn infer_inheritance(members: &[SchemaOrRef]) -> Option<Inheritance> {
    let mut inheritance = Inheritance::default();

    for (index, member) in members.iter().enumerate() {
        match member {
            SchemaOrRef::Ref { ref_path } => inheritance.bases.push(ref_path.clone()),
            SchemaOrRef::Schema(schema) => {
                for name in &schema.required {
                    if !inheritance.required.contains(name) {
                        inheritance.required.push(name.clone());
                    }
                }
                if !is_requirement_only(schema) {
                    inheritance.extensions.push(index);
                }
            }
        }
    }

    if inheritance.bases.is_empty() {
        return None;
    }
    Some(inheritance)
}

/// A member that only lists required property names, e.g. `{required: [id]}`.
fn is_requirement_only(schema: &Schema) -> bool {
    !schema.required.is_empty()
        && schema.properties.is_empty()
        && schema.additional_properties.is_none()
        && schema.all_of.is_empty()
        && schema.one_of.is_empty()
        && schema.any_of.is_empty()
        && schema.items.is_none()
        && schema.enum_values.is_empty()
}
