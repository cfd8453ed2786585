use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported OpenAPI version: {0}")]
    UnsupportedVersion(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("invalid reference format: {reference} (expected {expected})")]
    InvalidRefFormat { reference: String, expected: String },

    #[error("reference {reference} points at {found}, expected {expected}")]
    ComponentTypeMismatch {
        reference: String,
        expected: String,
        found: String,
    },

    #[error("reference target not found: {reference} (looked in {})", attempted.join(", "))]
    RefTargetNotFound {
        reference: String,
        attempted: Vec<String>,
    },

    #[error("circular component reference: {}", chain.join(" -> "))]
    CircularRef { chain: Vec<String> },

    #[error(
        "schema reference {reference} resolves to another reference ({target}); \
         the document must be fully dereferenced at the operation level before building the IR"
    )]
    NestedSchemaRef { reference: String, target: String },
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("unsupported schema at {path}: {reason}")]
    UnsupportedSchema { path: String, reason: String },

    #[error("invalid parameter '{name}' in {location}: {reason}")]
    ParameterContract {
        name: String,
        location: String,
        reason: String,
    },

    #[error("invalid request body at {path}: {reason}")]
    RequestBodyContract { path: String, reason: String },

    #[error("invalid status code '{status}' at {path}")]
    InvalidStatusCode { path: String, status: String },
}
