use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SecuritySchemeType {
    ApiKey,
    Http,
    #[serde(rename = "oauth2")]
    OAuth2,
    OpenIdConnect,
    #[serde(rename = "mutualTLS")]
    MutualTls,
}

impl SecuritySchemeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecuritySchemeType::ApiKey => "apiKey",
            SecuritySchemeType::Http => "http",
            SecuritySchemeType::OAuth2 => "oauth2",
            SecuritySchemeType::OpenIdConnect => "openIdConnect",
            SecuritySchemeType::MutualTls => "mutualTLS",
        }
    }
}

/// Where an API key travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    Query,
    Header,
    Cookie,
}

/// OAuth2 flows configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthFlows {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implicit: Option<OAuthFlow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<OAuthFlow>,
    #[serde(rename = "clientCredentials", skip_serializing_if = "Option::is_none")]
    pub client_credentials: Option<OAuthFlow>,
    #[serde(rename = "authorizationCode", skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<OAuthFlow>,
}

/// A single OAuth2 flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthFlow {
    #[serde(rename = "authorizationUrl", skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
    #[serde(rename = "tokenUrl", skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(rename = "refreshUrl", skip_serializing_if = "Option::is_none")]
    pub refresh_url: Option<String>,
    #[serde(default)]
    pub scopes: IndexMap<String, String>,
}

/// A security scheme definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityScheme {
    #[serde(rename = "type")]
    pub scheme_type: SecuritySchemeType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub location: Option<ApiKeyLocation>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,

    #[serde(rename = "bearerFormat", skip_serializing_if = "Option::is_none")]
    pub bearer_format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub flows: Option<OAuthFlows>,

    #[serde(rename = "openIdConnectUrl", skip_serializing_if = "Option::is_none")]
    pub open_id_connect_url: Option<String>,
}

impl SecurityScheme {
    /// One-line description such as `apiKey (header X-Api-Key)` or `http bearer`.
    pub fn summary(&self) -> String {
        match (self.scheme_type, &self.location, &self.name, &self.scheme) {
            (SecuritySchemeType::ApiKey, Some(location), Some(name), _) => {
                let location = match location {
                    ApiKeyLocation::Query => "query",
                    ApiKeyLocation::Header => "header",
                    ApiKeyLocation::Cookie => "cookie",
                };
                format!("apiKey ({location} {name})")
            }
            (SecuritySchemeType::Http, _, _, Some(scheme)) => format!("http {scheme}"),
            (kind, ..) => kind.as_str().to_string(),
        }
    }
}

/// A security requirement: scheme name to required scopes. An empty list of
/// requirements means the operation needs no authentication.
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

/// Scheme names used by `requirements` that `is_declared` does not know, in
/// first-seen order.
pub fn undeclared_schemes<'a>(
    requirements: &'a [SecurityRequirement],
    is_declared: impl Fn(&str) -> bool,
) -> Vec<&'a str> {
    let mut missing: Vec<&str> = Vec::new();
    for name in requirements.iter().flat_map(IndexMap::keys) {
        if !is_declared(name) && !missing.contains(&name.as_str()) {
            missing.push(name);
        }
    }
    missing
}
