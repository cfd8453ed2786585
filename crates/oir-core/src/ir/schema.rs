use indexmap::IndexMap;
use serde_json::Value;

use super::metadata::SchemaMetadata;

/// A built schema: exactly one shape plus the keywords shared by every shape.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    pub format: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub constraints: Constraints,
    pub enum_values: Vec<Value>,
    pub const_value: Option<Value>,
    pub default_value: Option<Value>,
    pub example: Option<Value>,
    pub read_only: bool,
    pub write_only: bool,
    pub deprecated: bool,
    pub metadata: SchemaMetadata,
}

impl SchemaNode {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            format: None,
            title: None,
            description: None,
            constraints: Constraints::default(),
            enum_values: Vec::new(),
            const_value: None,
            default_value: None,
            example: None,
            read_only: false,
            write_only: false,
            deprecated: false,
            metadata: SchemaMetadata::default(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(SchemaKind::Unknown)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.kind, SchemaKind::Reference(_))
    }

    pub fn reference(&self) -> Option<&SchemaRef> {
        match &self.kind {
            SchemaKind::Reference(r) => Some(r),
            _ => None,
        }
    }

    pub fn has_enum(&self) -> bool {
        !self.enum_values.is_empty()
    }

    /// Direct child nodes, in declaration order.
    pub fn children(&self) -> Vec<&SchemaNode> {
        let mut out = Vec::new();
        match &self.kind {
            SchemaKind::Object(obj) => {
                out.extend(obj.properties.values());
                if let Some(SchemaOrFlag::Schema(s)) = &obj.additional_properties {
                    out.push(s.as_ref());
                }
            }
            SchemaKind::Array(arr) => {
                out.extend(arr.prefix_items.iter());
                if let Some(SchemaOrFlag::Schema(s)) = &arr.items {
                    out.push(s.as_ref());
                }
                if let Some(SchemaOrFlag::Schema(s)) = &arr.unevaluated_items {
                    out.push(s.as_ref());
                }
            }
            SchemaKind::Composition(c) => out.extend(c.members.iter()),
            SchemaKind::Not(inner) => out.push(inner.as_ref()),
            SchemaKind::MultiType(members) => out.extend(members.iter()),
            SchemaKind::Reference(_) | SchemaKind::Primitive(_) | SchemaKind::Unknown => {}
        }
        out
    }
}

/// The shape of a schema node, chosen once at build time.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    /// A `$ref` kept as-is.
    Reference(SchemaRef),
    Primitive(PrimitiveType),
    Object(ObjectShape),
    Array(ArrayShape),
    Composition(Composition),
    Not(Box<SchemaNode>),
    /// An OAS 3.1 type array with more than one non-null member.
    MultiType(Vec<SchemaNode>),
    /// No recognized keyword at all: accepts any value.
    Unknown,
}

/// A `$ref` as written, plus the canonical pointer it was found at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRef {
    pub raw: String,
    pub target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl PrimitiveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Number => "number",
            PrimitiveType::Integer => "integer",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Null => "null",
        }
    }
}

/// A child slot that may be a boolean instead of a schema
/// (`additionalProperties`, `items`, `unevaluatedItems`).
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaOrFlag {
    Flag(bool),
    Schema(Box<SchemaNode>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectShape {
    pub properties: IndexMap<String, SchemaNode>,
    pub required: Vec<String>,
    pub additional_properties: Option<SchemaOrFlag>,
    pub min_properties: Option<u64>,
    pub max_properties: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArrayShape {
    /// `None` for an array with no `items` keyword.
    pub items: Option<SchemaOrFlag>,
    /// Positional schemas for tuple validation.
    pub prefix_items: Vec<SchemaNode>,
    pub unevaluated_items: Option<SchemaOrFlag>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositionKind {
    AllOf,
    OneOf,
    AnyOf,
}

impl CompositionKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            CompositionKind::AllOf => "allOf",
            CompositionKind::OneOf => "oneOf",
            CompositionKind::AnyOf => "anyOf",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub kind: CompositionKind,
    pub members: Vec<SchemaNode>,
    pub discriminator: Option<IrDiscriminator>,
    /// Base/extension split inferred for `allOf`, when inference is enabled.
    pub inheritance: Option<Inheritance>,
}

/// Discriminator for union types.
#[derive(Debug, Clone, PartialEq)]
pub struct IrDiscriminator {
    pub property_name: String,
    pub mapping: Vec<(String, String)>,
}

/// An `allOf` read as "extends these bases, requires these properties".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Inheritance {
    /// Raw refs of the members that name a base schema.
    pub bases: Vec<String>,
    /// Indices into `members` of the extension parts.
    pub extensions: Vec<usize>,
    /// Property names required across the composition.
    pub required: Vec<String>,
}

/// String, number and array bounds.
///
/// Exclusive bounds are stored as numbers regardless of dialect: the OAS 3.0
/// `exclusiveMinimum: true` flag moves `minimum` into `exclusive_minimum`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Constraints {
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
    pub exclusive_maximum: Option<f64>,
    pub multiple_of: Option<f64>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: bool,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        *self == Constraints::default()
    }
}
