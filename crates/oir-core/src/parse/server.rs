use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A substitution variable in a server URL template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerVariable {
    pub default: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

/// A server URL, possibly templated (`https://{region}.example.com`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, ServerVariable>,
}

impl Server {
    /// Each variable's default value, in declaration order.
    pub fn variable_defaults(&self) -> IndexMap<String, String> {
        self.variables
            .iter()
            .map(|(name, var)| (name.clone(), var.default.clone()))
            .collect()
    }
}

/// Substitute `{name}` placeholders in a URL template. Placeholders without a
/// value are left as written.
pub fn expand_url(template: &str, values: &IndexMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let name = &after[..close];
        match values.get(name) {
            Some(value) => out.push_str(value),
            None => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_with_defaults() {
        let server: Server = serde_yaml_ng::from_str(
            "url: https://{region}.example.com/{version}\nvariables:\n  region:\n    default: eu\n    enum: [eu, us]\n",
        )
        .unwrap();
        let defaults = server.variable_defaults();
        assert_eq!(defaults["region"], "eu");
        assert_eq!(
            expand_url(&server.url, &defaults),
            "https://eu.example.com/{version}"
        );
    }

    #[test]
    fn test_unterminated_placeholder_is_kept() {
        assert_eq!(expand_url("https://{host", &IndexMap::new()), "https://{host");
    }
}
