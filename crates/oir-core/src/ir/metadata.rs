/// Metadata every schema node carries.
///
/// `required` and `nullable` describe how the node is used by its immediate
/// parent. The remaining fields are computed by the builder and the
/// dependency graph so that downstream emitters never re-derive them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaMetadata {
    /// Whether the immediate parent requires this node.
    pub required: bool,
    /// `nullable: true` (OAS 3.0) or a `"null"` member of a type array (OAS 3.1).
    pub nullable: bool,
    pub dependencies: DependencyInfo,
    pub chain: ChainHints,
    /// Canonical refs of the schemas this node participates in a cycle with.
    pub circular_references: Vec<String>,
}

impl SchemaMetadata {
    pub fn is_circular(&self) -> bool {
        !self.circular_references.is_empty()
    }
}

/// Outgoing and incoming reference edges of a schema node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DependencyInfo {
    /// Canonical refs appearing anywhere below this node, in first-seen order.
    pub references: Vec<String>,
    /// Component schemas that reference this one. Only set on component roots.
    pub referenced_by: Vec<String>,
    /// Longest chain of references below this node.
    pub depth: usize,
}

/// Method-chain fragments for validation-library emitters, e.g. `.optional()`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChainHints {
    /// `.optional()`, `.nullable()` or `.nullish()`.
    pub presence: Option<String>,
    pub validations: Vec<String>,
    /// `.default(<json>)`.
    pub default: Option<String>,
}

impl ChainHints {
    /// All fragments in emission order: validations, default, presence.
    pub fn render(&self) -> String {
        let mut out = self.validations.concat();
        if let Some(default) = &self.default {
            out.push_str(default);
        }
        if let Some(presence) = &self.presence {
            out.push_str(presence);
        }
        out
    }
}
