use heck::{ToLowerCamelCase, ToPascalCase, ToShoutySnakeCase, ToSnakeCase};
use indexmap::IndexMap;

use crate::config::NamingStrategy;
use crate::ir::{HttpMethod, NormalizedName};

/// Compute every casing variant of an arbitrary identifier-ish string.
pub fn normalize_name(name: &str) -> NormalizedName {
    let sanitized = sanitize_identifier(name);

    NormalizedName {
        original: name.to_string(),
        pascal_case: sanitized.to_pascal_case(),
        camel_case: sanitized.to_lower_camel_case(),
        snake_case: sanitized.to_snake_case(),
        screaming_snake: sanitized.to_shouty_snake_case(),
    }
}

/// The name of an operation before normalization: its `operationId` or a
/// route-derived name, then any configured alias.
pub fn operation_name(
    method: HttpMethod,
    path: &str,
    operation_id: Option<&str>,
    strategy: NamingStrategy,
    aliases: &IndexMap<String, String>,
) -> String {
    let raw = match (strategy, operation_id) {
        (NamingStrategy::UseOperationId, Some(id)) if !id.trim().is_empty() => id.to_string(),
        _ => route_to_name(method, path),
    };
    match aliases.get(&raw) {
        Some(alias) => {
            log::trace!("operation {raw} renamed to {alias}");
            alias.clone()
        }
        None => raw,
    }
}

/// Derive a camelCase operation name from an HTTP method and a route.
///
/// - `GET /users` gives `listUsers`
/// - `GET /users/{userId}` gives `getUser`
/// - `POST /users` gives `createUsers`
/// - `GET /users/{userId}/messages` gives `listUsersMessages`
///
/// The last static segment is singularized when the route ends in a parameter.
pub fn route_to_name(method: HttpMethod, path: &str) -> String {
    let mut resources: Vec<&str> = Vec::new();
    let mut ends_with_param = false;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        ends_with_param = segment.starts_with('{') && segment.ends_with('}');
        if !ends_with_param {
            resources.push(segment);
        }
    }

    let verb = match method {
        HttpMethod::Get if ends_with_param => "get",
        HttpMethod::Get => "list",
        HttpMethod::Post => "create",
        HttpMethod::Put => "update",
        HttpMethod::Delete => "delete",
        HttpMethod::Patch => "patch",
        HttpMethod::Options => "options",
        HttpMethod::Head => "head",
        HttpMethod::Trace => "trace",
    };

    let last = resources.len().saturating_sub(1);
    let mut name = verb.to_string();
    for (i, part) in resources.iter().enumerate() {
        let word = if i == last && ends_with_param {
            singularize(part)
        } else {
            (*part).to_string()
        };
        name.push_str(&sanitize_identifier(&word).to_pascal_case());
    }
    name
}

/// PascalCase type name for a context hint, e.g. a property or parameter name.
pub fn type_name(hint: &str) -> String {
    normalize_name(hint).pascal_case
}

fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies")
        && !stem.is_empty()
    {
        return format!("{stem}y");
    }
    for suffix in ["sses", "xes", "zes", "ches", "shes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    match word.strip_suffix('s') {
        Some(stem) if !stem.is_empty() && !stem.ends_with('s') => stem.to_string(),
        _ => word.to_string(),
    }
}

/// Keep alphanumerics, collapse every other run into `_`, and prefix a
/// leading digit.
fn sanitize_identifier(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 1);
    let mut pending_separator = false;

    for ch in name.chars() {
        if !ch.is_alphanumeric() {
            pending_separator = true;
            continue;
        }
        if result.is_empty() && ch.is_ascii_digit() {
            result.push('_');
        } else if pending_separator && !result.is_empty() {
            result.push('_');
        }
        result.push(ch);
        pending_separator = false;
    }

    if result.is_empty() {
        "unnamed".to_string()
    } else {
        result
    }
}
