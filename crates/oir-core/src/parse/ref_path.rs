use std::fmt;

use crate::error::ResolveError;

const EXPECTED_FORMAT: &str =
    "#/components/{type}/{name} or #/x-ext/{hash}/components/{type}/{name}";

/// The `components` section a reference points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Schemas,
    Parameters,
    Responses,
    RequestBodies,
    Headers,
    SecuritySchemes,
    Examples,
    Links,
    Callbacks,
    PathItems,
}

impl ComponentType {
    pub fn section(&self) -> &'static str {
        match self {
            ComponentType::Schemas => "schemas",
            ComponentType::Parameters => "parameters",
            ComponentType::Responses => "responses",
            ComponentType::RequestBodies => "requestBodies",
            ComponentType::Headers => "headers",
            ComponentType::SecuritySchemes => "securitySchemes",
            ComponentType::Examples => "examples",
            ComponentType::Links => "links",
            ComponentType::Callbacks => "callbacks",
            ComponentType::PathItems => "pathItems",
        }
    }

    pub fn from_section(section: &str) -> Option<Self> {
        let kind = match section {
            "schemas" => ComponentType::Schemas,
            "parameters" => ComponentType::Parameters,
            "responses" => ComponentType::Responses,
            "requestBodies" => ComponentType::RequestBodies,
            "headers" => ComponentType::Headers,
            "securitySchemes" => ComponentType::SecuritySchemes,
            "examples" => ComponentType::Examples,
            "links" => ComponentType::Links,
            "callbacks" => ComponentType::Callbacks,
            "pathItems" => ComponentType::PathItems,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section())
    }
}

/// Where a component lives: the document's own `components` or a bundled file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RefLocation {
    Standard,
    External { hash: String },
}

/// A parsed `$ref` into a components section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRef {
    pub raw: String,
    pub location: RefLocation,
    pub component_type: ComponentType,
    pub name: String,
}

impl ComponentRef {
    /// Parse a `$ref` string.
    ///
    /// Accepts `#/components/{type}/{name}`, `#/x-ext/{hash}/components/{type}/{name}`
    /// and, for backward compatibility, a bare schema name such as `User`.
    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        let invalid = || ResolveError::InvalidRefFormat {
            reference: raw.to_string(),
            expected: EXPECTED_FORMAT.to_string(),
        };

        let Some(pointer) = raw.strip_prefix('#') else {
            if raw.is_empty() || raw.contains('/') || raw.contains('#') {
                return Err(invalid());
            }
            return Ok(Self {
                raw: raw.to_string(),
                location: RefLocation::Standard,
                component_type: ComponentType::Schemas,
                name: raw.to_string(),
            });
        };

        let pointer = pointer.strip_prefix('/').ok_or_else(invalid)?;
        let segments: Vec<&str> = pointer.split('/').collect();

        let (location, section, name) = match segments.as_slice() {
            ["components", section, name] => (RefLocation::Standard, *section, *name),
            ["x-ext", hash, "components", section, name] if !hash.is_empty() => (
                RefLocation::External {
                    hash: (*hash).to_string(),
                },
                *section,
                *name,
            ),
            _ => return Err(invalid()),
        };

        if name.is_empty() {
            return Err(invalid());
        }
        let component_type = ComponentType::from_section(section).ok_or_else(invalid)?;

        Ok(Self {
            raw: raw.to_string(),
            location,
            component_type,
            name: unescape_pointer_segment(name),
        })
    }

    /// The canonical pointer for this reference at its declared location.
    pub fn canonical(&self) -> String {
        component_pointer(&self.location, self.component_type, &self.name)
    }

    /// Fail unless this reference points into the expected section.
    pub fn expect_type(&self, expected: ComponentType) -> Result<(), ResolveError> {
        if self.component_type == expected {
            return Ok(());
        }
        Err(ResolveError::ComponentTypeMismatch {
            reference: self.raw.clone(),
            expected: expected.section().to_string(),
            found: self.component_type.section().to_string(),
        })
    }
}

/// Build the JSON pointer of a named component.
pub fn component_pointer(location: &RefLocation, kind: ComponentType, name: &str) -> String {
    let name = escape_pointer_segment(name);
    match location {
        RefLocation::Standard => format!("#/components/{}/{}", kind.section(), name),
        RefLocation::External { hash } => {
            format!("#/x-ext/{}/components/{}/{}", hash, kind.section(), name)
        }
    }
}

/// Canonical pointer of a component schema in the document's own components.
pub fn schema_pointer(name: &str) -> String {
    component_pointer(&RefLocation::Standard, ComponentType::Schemas, name)
}

fn unescape_pointer_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

pub fn escape_pointer_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}
