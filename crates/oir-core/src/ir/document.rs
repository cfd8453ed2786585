use indexmap::IndexMap;
use serde_json::Value;

use super::components::{ComponentKind, IrComponent};
use super::operations::IrOperation;
use super::schema::{PrimitiveType, SchemaNode};
use super::types::{IrInfo, IrSecurityRequirement, IrServer, IrTag};
use crate::parse::ref_path::{ComponentRef, RefLocation, schema_pointer};
use crate::transform::complexity::complexity_score;
use crate::transform::dependency_graph::DependencyGraph;

/// The built IR of one OpenAPI document.
#[derive(Debug, Clone, PartialEq)]
pub struct IrDocument {
    /// The `openapi` version string of the source document.
    pub openapi: String,
    pub info: IrInfo,
    pub servers: Vec<IrServer>,
    pub components: Vec<IrComponent>,
    pub operations: Vec<IrOperation>,
    pub webhooks: Vec<IrOperation>,
    pub graph: DependencyGraph,
    pub schema_index: SchemaIndex,
    pub enums: IndexMap<String, IrEnum>,
    pub security: Vec<IrSecurityRequirement>,
    pub tags: Vec<IrTag>,
    pub complexity_threshold: u32,
}

impl IrDocument {
    /// Look up a component schema by canonical pointer or raw `$ref`.
    pub fn schema(&self, reference: &str) -> Option<&SchemaNode> {
        self.schema_component(reference)
            .and_then(IrComponent::as_schema)
    }

    pub fn schema_component(&self, reference: &str) -> Option<&IrComponent> {
        self.schema_index
            .lookup(reference)
            .and_then(|index| self.components.get(index))
    }

    /// Look up a component schema by its bare name.
    pub fn schema_by_name(&self, name: &str) -> Option<&SchemaNode> {
        self.schema_index
            .by_name(name)
            .and_then(|index| self.components.get(index))
            .and_then(IrComponent::as_schema)
    }

    /// Component schemas in declaration order.
    pub fn schemas(&self) -> impl Iterator<Item = &IrComponent> {
        self.components
            .iter()
            .filter(|c| matches!(c.kind, ComponentKind::Schema(_)))
    }

    /// Component schemas in leaves-first declaration order.
    pub fn ordered_schemas(&self) -> Vec<&IrComponent> {
        self.graph
            .topological_order()
            .iter()
            .filter_map(|pointer| self.schema_component(pointer))
            .collect()
    }

    /// Whether the schema at `pointer` must be emitted with deferred evaluation.
    pub fn is_circular(&self, pointer: &str) -> bool {
        self.graph.is_circular(pointer)
    }

    /// Whether a node is complex enough to be emitted as a named variable.
    pub fn should_extract(&self, node: &SchemaNode) -> bool {
        complexity_score(node) >= self.complexity_threshold
    }

    /// Operations followed by webhooks.
    pub fn all_operations(&self) -> impl Iterator<Item = &IrOperation> {
        self.operations.iter().chain(self.webhooks.iter())
    }
}

/// Component schemas by canonical pointer and by bare name.
///
/// On a name clash between the document's own components and a bundled
/// file, the document's own definition wins.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaIndex {
    by_pointer: IndexMap<String, usize>,
    by_name: IndexMap<String, usize>,
}

impl SchemaIndex {
    pub fn insert(&mut self, component: &IrComponent, index: usize) {
        self.by_pointer.insert(component.pointer.clone(), index);
        match component.location {
            RefLocation::Standard => {
                self.by_name.insert(component.name.clone(), index);
            }
            RefLocation::External { .. } => {
                self.by_name.entry(component.name.clone()).or_insert(index);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_pointer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_pointer.is_empty()
    }

    pub fn by_name(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Find a schema by canonical pointer, raw `$ref` or bare name. An
    /// external ref whose file lacks the schema falls back to the document's
    /// own components.
    pub fn lookup(&self, reference: &str) -> Option<usize> {
        if let Some(index) = self.by_pointer.get(reference) {
            return Some(*index);
        }
        let parsed = ComponentRef::parse(reference).ok()?;
        self.by_pointer
            .get(&parsed.canonical())
            .or_else(|| self.by_pointer.get(&schema_pointer(&parsed.name)))
            .copied()
    }

    pub fn pointers(&self) -> impl Iterator<Item = &str> {
        self.by_pointer.keys().map(String::as_str)
    }
}

/// An enum found anywhere in the document.
#[derive(Debug, Clone, PartialEq)]
pub struct IrEnum {
    pub name: String,
    pub values: Vec<Value>,
    pub primitive: Option<PrimitiveType>,
    pub description: Option<String>,
    /// Where the enum was first found.
    pub source: String,
}
