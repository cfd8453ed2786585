use serde_json::Value;

use super::operations::{IrHeader, IrParameter, IrRequestBody, IrResponse};
use super::schema::SchemaNode;
use crate::parse::ref_path::{ComponentType, RefLocation};
use crate::parse::security::SecurityScheme;

/// A named, reusable definition from `components` or a bundled `x-ext` file.
#[derive(Debug, Clone, PartialEq)]
pub struct IrComponent {
    pub name: String,
    /// Canonical pointer of the definition.
    pub pointer: String,
    pub location: RefLocation,
    pub kind: ComponentKind,
}

impl IrComponent {
    pub fn component_type(&self) -> ComponentType {
        self.kind.component_type()
    }

    pub fn as_schema(&self) -> Option<&SchemaNode> {
        match &self.kind {
            ComponentKind::Schema(node) => Some(node),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComponentKind {
    Schema(SchemaNode),
    Parameter(IrParameter),
    Response(IrResponse),
    RequestBody(IrRequestBody),
    SecurityScheme(SecurityScheme),
    Header(IrHeader),
    Link(Value),
    Callback(Value),
    PathItem(Value),
    Example(Value),
}

impl ComponentKind {
    pub fn component_type(&self) -> ComponentType {
        match self {
            ComponentKind::Schema(_) => ComponentType::Schemas,
            ComponentKind::Parameter(_) => ComponentType::Parameters,
            ComponentKind::Response(_) => ComponentType::Responses,
            ComponentKind::RequestBody(_) => ComponentType::RequestBodies,
            ComponentKind::SecurityScheme(_) => ComponentType::SecuritySchemes,
            ComponentKind::Header(_) => ComponentType::Headers,
            ComponentKind::Link(_) => ComponentType::Links,
            ComponentKind::Callback(_) => ComponentType::Callbacks,
            ComponentKind::PathItem(_) => ComponentType::PathItems,
            ComponentKind::Example(_) => ComponentType::Examples,
        }
    }
}
