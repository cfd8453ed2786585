use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;

use super::schema::SchemaNode;
use super::types::{IrSecurityRequirement, IrServer, NormalizedName};

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Trace => "TRACE",
        }
    }

    /// The lower-case key used in path items.
    pub fn key(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
            HttpMethod::Trace => "trace",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully built API operation: one method on one path.
#[derive(Debug, Clone, PartialEq)]
pub struct IrOperation {
    pub name: NormalizedName,
    pub operation_id: Option<String>,
    pub method: HttpMethod,
    pub path: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub deprecated: bool,
    /// Merged path-level and operation-level parameters.
    pub parameters: Vec<IrParameter>,
    pub parameter_groups: ParameterGroups,
    pub request_body: Option<IrRequestBody>,
    pub responses: IrResponses,
    /// Effective security: the operation's own list, else the document's.
    pub security: Vec<IrSecurityRequirement>,
    pub servers: Vec<IrServer>,
    pub path_item: PathItemMeta,
}

impl IrOperation {
    pub fn main_response(&self) -> Option<&IrResponse> {
        self.responses.main_response()
    }
}

/// Path-item metadata, kept apart from the operation's own.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathItemMeta {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub servers: Vec<IrServer>,
    /// Path-level parameters in declaration order.
    pub parameters: Vec<SharedParameter>,
}

impl PathItemMeta {
    /// Raw `$ref`s of path-level parameters.
    pub fn parameter_refs(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter_map(|shared| shared.reference.as_deref())
            .collect()
    }

    /// Whether `param` is a path-level parameter the operation did not
    /// override.
    pub fn is_shared(&self, param: &IrParameter) -> bool {
        self.parameters.iter().any(|shared| shared.parameter == *param)
    }
}

/// A path-level parameter and the `$ref` it was declared through, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedParameter {
    pub reference: Option<String>,
    pub parameter: IrParameter,
}

/// Parameter location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IrParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl IrParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            IrParameterLocation::Path => "path",
            IrParameterLocation::Query => "query",
            IrParameterLocation::Header => "header",
            IrParameterLocation::Cookie => "cookie",
        }
    }
}

impl fmt::Display for IrParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A built path/query/header/cookie parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct IrParameter {
    pub name: NormalizedName,
    pub original_name: String,
    pub location: IrParameterLocation,
    pub required: bool,
    pub description: Option<String>,
    pub deprecated: bool,
    pub schema: SchemaNode,
    /// Set when the schema came from `content` instead of `schema`.
    pub media_type: Option<String>,
    pub style: Option<String>,
    pub explode: Option<bool>,
}

/// Parameters keyed by name, per location.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterGroups {
    pub path: IndexMap<String, IrParameter>,
    pub query: IndexMap<String, IrParameter>,
    pub header: IndexMap<String, IrParameter>,
    pub cookie: IndexMap<String, IrParameter>,
}

impl ParameterGroups {
    pub fn get(&self, location: IrParameterLocation) -> &IndexMap<String, IrParameter> {
        match location {
            IrParameterLocation::Path => &self.path,
            IrParameterLocation::Query => &self.query,
            IrParameterLocation::Header => &self.header,
            IrParameterLocation::Cookie => &self.cookie,
        }
    }

    pub fn get_mut(&mut self, location: IrParameterLocation) -> &mut IndexMap<String, IrParameter> {
        match location {
            IrParameterLocation::Path => &mut self.path,
            IrParameterLocation::Query => &mut self.query,
            IrParameterLocation::Header => &mut self.header,
            IrParameterLocation::Cookie => &mut self.cookie,
        }
    }

    /// Groups that feed tool input schemas. Cookies have no tool transport.
    pub fn tool_groups(&self) -> [(IrParameterLocation, &IndexMap<String, IrParameter>); 3] {
        [
            (IrParameterLocation::Path, &self.path),
            (IrParameterLocation::Query, &self.query),
            (IrParameterLocation::Header, &self.header),
        ]
    }
}

/// A response or encoding header.
#[derive(Debug, Clone, PartialEq)]
pub struct IrHeader {
    pub name: String,
    pub description: Option<String>,
    pub required: bool,
    pub deprecated: bool,
    pub schema: SchemaNode,
    pub media_type: Option<String>,
}

/// Encoding metadata for a single field in a form or multipart body.
#[derive(Debug, Clone, PartialEq)]
pub struct IrFieldEncoding {
    pub content_type: Option<String>,
    pub headers: IndexMap<String, IrHeader>,
    pub style: Option<String>,
    pub explode: Option<bool>,
    pub allow_reserved: Option<bool>,
}

/// A built request body for the selected media type.
#[derive(Debug, Clone, PartialEq)]
pub struct IrRequestBody {
    pub description: Option<String>,
    pub required: bool,
    pub media_type: String,
    pub schema: SchemaNode,
    pub encoding: IndexMap<String, IrFieldEncoding>,
    /// Every media type the body declared, in declaration order.
    pub content_types: Vec<String>,
}

/// A response status key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKey {
    Code(u16),
    /// `1XX` through `5XX`, stored as the leading digit.
    Range(u8),
    Default,
}

impl StatusKey {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("default") {
            return Some(StatusKey::Default);
        }
        let bytes = raw.as_bytes();
        if bytes.len() != 3 {
            return None;
        }
        let class = bytes[0];
        if !(b'1'..=b'5').contains(&class) {
            return None;
        }
        if bytes[1..].eq_ignore_ascii_case(b"xx") {
            return Some(StatusKey::Range(class - b'0'));
        }
        raw.parse::<u16>().ok().map(StatusKey::Code)
    }

    /// The hundreds digit of a code or range.
    pub fn class(&self) -> Option<u8> {
        match self {
            // Codes are three digits so the quotient fits in a u8.
            StatusKey::Code(code) => u8::try_from(code / 100).ok(),
            StatusKey::Range(class) => Some(*class),
            StatusKey::Default => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.class() == Some(2)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.class(), Some(4 | 5))
    }
}

impl fmt::Display for StatusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusKey::Code(code) => write!(f, "{code}"),
            StatusKey::Range(class) => write!(f, "{class}XX"),
            StatusKey::Default => f.write_str("default"),
        }
    }
}

impl Ord for StatusKey {
    /// Explicit codes ascend, a range sorts after the codes of its class,
    /// `default` sorts last.
    fn cmp(&self, other: &Self) -> Ordering {
        fn rank(key: &StatusKey) -> (u16, u8) {
            match key {
                StatusKey::Code(code) => (*code, 0),
                StatusKey::Range(class) => (u16::from(*class) * 100 + 99, 1),
                StatusKey::Default => (u16::MAX, 2),
            }
        }
        rank(self).cmp(&rank(other))
    }
}

impl PartialOrd for StatusKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A built response.
#[derive(Debug, Clone, PartialEq)]
pub struct IrResponse {
    pub description: String,
    pub media_type: Option<String>,
    /// `None` when the response has no body schema.
    pub schema: Option<SchemaNode>,
    pub headers: IndexMap<String, IrHeader>,
}

/// Every response of an operation plus the categorization the status policy
/// decided on. `main` and `errors` point into `all`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IrResponses {
    pub all: IndexMap<StatusKey, IrResponse>,
    pub main: Option<StatusKey>,
    /// Error entries keyed by their status text (`"404"`, `"5XX"`, `"default"`).
    pub errors: IndexMap<String, StatusKey>,
}

impl IrResponses {
    pub fn main_response(&self) -> Option<&IrResponse> {
        self.main.and_then(|key| self.all.get(&key))
    }

    pub fn error_responses(&self) -> impl Iterator<Item = (&str, &IrResponse)> {
        self.errors
            .iter()
            .filter_map(|(key, status)| self.all.get(status).map(|r| (key.as_str(), r)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_key_parse() {
        assert_eq!(StatusKey::parse("200"), Some(StatusKey::Code(200)));
        assert_eq!(StatusKey::parse("4XX"), Some(StatusKey::Range(4)));
        assert_eq!(StatusKey::parse("2xx"), Some(StatusKey::Range(2)));
        assert_eq!(StatusKey::parse("default"), Some(StatusKey::Default));
        assert_eq!(StatusKey::parse("ok"), None);
        assert_eq!(StatusKey::parse("20"), None);
        assert_eq!(StatusKey::parse("6XX"), None);
    }

    #[test]
    fn test_status_key_ordering() {
        let mut keys = vec![
            StatusKey::Default,
            StatusKey::Range(2),
            StatusKey::Code(404),
            StatusKey::Code(201),
            StatusKey::Code(200),
        ];
        keys.sort();
        let rendered: Vec<String> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["200", "201", "2XX", "404", "default"]);
    }

    #[test]
    fn test_status_key_classes() {
        assert!(StatusKey::Code(204).is_success());
        assert!(StatusKey::Range(5).is_error());
        assert!(!StatusKey::Code(302).is_error());
        assert!(!StatusKey::Default.is_success());
        assert!(!StatusKey::Default.is_error());
    }
}
