//! Method-chain hints for validation-library emitters.
//!
//! Fragments follow the Zod builder API (`.min(1)`, `.email()`, `.nullish()`).
//! They are computed once here so emitters never re-derive required or
//! nullable handling.

use crate::ir::{ChainHints, PrimitiveType, SchemaKind, SchemaNode};

pub fn chain_hints(node: &SchemaNode) -> ChainHints {
    ChainHints {
        presence: presence(node.metadata.required, node.metadata.nullable),
        validations: validations(node),
        default: node
            .default_value
            .as_ref()
            .map(|value| format!(".default({value})")),
    }
}

fn presence(required: bool, nullable: bool) -> Option<String> {
    let fragment = match (required, nullable) {
        (true, false) => return None,
        (true, true) => ".nullable()",
        (false, false) => ".optional()",
        (false, true) => ".nullish()",
    };
    Some(fragment.to_string())
}

fn validations(node: &SchemaNode) -> Vec<String> {
    let c = &node.constraints;
    let mut out = Vec::new();
    match &node.kind {
        SchemaKind::Primitive(PrimitiveType::String) => {
            if let Some(format) = node.format.as_deref().and_then(string_format) {
                out.push(format.to_string());
            }
            if let Some(min) = c.min_length {
                out.push(format!(".min({min})"));
            }
            if let Some(max) = c.max_length {
                out.push(format!(".max({max})"));
            }
            if let Some(pattern) = &c.pattern {
                out.push(format!(".regex(/{}/)", pattern.replace('/', "\\/")));
            }
        }
        SchemaKind::Primitive(PrimitiveType::Integer) => {
            out.push(".int()".to_string());
            numeric(node, &mut out);
        }
        SchemaKind::Primitive(PrimitiveType::Number) => numeric(node, &mut out),
        SchemaKind::Array(_) => {
            if let Some(min) = c.min_items {
                out.push(format!(".min({min})"));
            }
            if let Some(max) = c.max_items {
                out.push(format!(".max({max})"));
            }
        }
        _ => {}
    }
    out
}

fn numeric(node: &SchemaNode, out: &mut Vec<String>) {
    let c = &node.constraints;
    if let Some(v) = c.minimum {
        out.push(format!(".gte({v})"));
    }
    if let Some(v) = c.exclusive_minimum {
        out.push(format!(".gt({v})"));
    }
    if let Some(v) = c.maximum {
        out.push(format!(".lte({v})"));
    }
    if let Some(v) = c.exclusive_maximum {
        out.push(format!(".lt({v})"));
    }
    if let Some(v) = c.multiple_of {
        out.push(format!(".multipleOf({v})"));
    }
}

fn string_format(format: &str) -> Option<&'static str> {
    let fragment = match format {
        "email" => ".email()",
        "uri" | "url" => ".url()",
        "uuid" => ".uuid()",
        "date-time" => ".datetime()",
        "date" => ".date()",
        "time" => ".time()",
        "ipv4" | "ipv6" => ".ip()",
        _ => return None,
    };
    Some(fragment)
}
