use std::fmt;

use indexmap::IndexMap;

use crate::parse::server::expand_url;

#[derive(Debug, Clone, PartialEq)]
pub struct IrInfo {
    pub title: String,
    /// OAS 3.1 short summary.
    pub summary: Option<String>,
    pub description: Option<String>,
    pub version: String,
}

/// A server URL template with the default of each variable.
#[derive(Debug, Clone, PartialEq)]
pub struct IrServer {
    pub url: String,
    pub description: Option<String>,
    pub variables: IndexMap<String, String>,
}

impl IrServer {
    /// The URL with every variable at its default.
    pub fn default_url(&self) -> String {
        expand_url(&self.url, &self.variables)
    }
}

/// A document-level tag.
#[derive(Debug, Clone, PartialEq)]
pub struct IrTag {
    pub name: String,
    pub description: Option<String>,
}

/// A security requirement: scheme name to required scopes.
pub type IrSecurityRequirement = IndexMap<String, Vec<String>>;

/// A name with multiple casing variants pre-computed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedName {
    pub original: String,
    pub pascal_case: String,
    pub camel_case: String,
    pub snake_case: String,
    pub screaming_snake: String,
}

impl fmt::Display for NormalizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}
