//! Media-type selection for parameter/body `content` maps and responses.

use indexmap::IndexMap;

use crate::parse::media_type::MediaType;

/// Families in preference order for parameters and request bodies.
const REQUEST_FAMILIES: &[MediaFamily] = &[
    MediaFamily::Json,
    MediaFamily::FormUrlEncoded,
    MediaFamily::Multipart,
    MediaFamily::OctetStream,
    MediaFamily::Text,
    MediaFamily::Any,
];

/// Responses carry no form encodings.
const RESPONSE_FAMILIES: &[MediaFamily] = &[MediaFamily::Json, MediaFamily::Text, MediaFamily::Any];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFamily {
    Json,
    FormUrlEncoded,
    Multipart,
    OctetStream,
    Text,
    Any,
}

impl MediaFamily {
    pub fn of(media_type: &str) -> Option<Self> {
        let essence = essence(media_type);
        let family = match essence.as_str() {
            "application/json" | "text/json" => MediaFamily::Json,
            e if e.ends_with("+json") => MediaFamily::Json,
            "application/x-www-form-urlencoded" => MediaFamily::FormUrlEncoded,
            e if e.starts_with("multipart/") => MediaFamily::Multipart,
            "application/octet-stream" => MediaFamily::OctetStream,
            e if e.starts_with("text/") => MediaFamily::Text,
            "*/*" => MediaFamily::Any,
            _ => return None,
        };
        Some(family)
    }
}

/// The media type without parameters, lower-cased: `Application/JSON; charset=utf-8`
/// becomes `application/json`.
fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Pick the request-side media type: best family first, declaration order within a family.
pub fn select_request_media(
    content: &IndexMap<String, MediaType>,
) -> Option<(&str, &MediaType)> {
    select(content, REQUEST_FAMILIES)
}

/// Pick the response-side media type: JSON or text family, or `*/*`.
///
/// Entries carrying a schema win over schemaless ones in any family; a
/// schemaless entry is only picked when no candidate has a schema.
pub fn select_response_media(
    content: &IndexMap<String, MediaType>,
) -> Option<(&str, &MediaType)> {
    select_where(content, RESPONSE_FAMILIES, |media| media.schema.is_some())
        .or_else(|| select(content, RESPONSE_FAMILIES))
}

fn select<'c>(
    content: &'c IndexMap<String, MediaType>,
    families: &[MediaFamily],
) -> Option<(&'c str, &'c MediaType)> {
    select_where(content, families, |_| true)
}

fn select_where<'c>(
    content: &'c IndexMap<String, MediaType>,
    families: &[MediaFamily],
    accept: impl Fn(&MediaType) -> bool,
) -> Option<(&'c str, &'c MediaType)> {
    families.iter().find_map(|family| {
        content
            .iter()
            .find(|(key, media)| MediaFamily::of(key) == Some(*family) && accept(media))
            .map(|(key, media)| (key.as_str(), media))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(keys: &[&str]) -> IndexMap<String, MediaType> {
        keys.iter()
            .map(|k| (k.to_string(), MediaType::default()))
            .collect()
    }

    #[test]
    fn test_families() {
        assert_eq!(MediaFamily::of("application/json"), Some(MediaFamily::Json));
        assert_eq!(
            MediaFamily::of("application/problem+json"),
            Some(MediaFamily::Json)
        );
        assert_eq!(
            MediaFamily::of("Application/JSON; charset=utf-8"),
            Some(MediaFamily::Json)
        );
        assert_eq!(
            MediaFamily::of("multipart/form-data"),
            Some(MediaFamily::Multipart)
        );
        assert_eq!(MediaFamily::of("text/plain"), Some(MediaFamily::Text));
        assert_eq!(MediaFamily::of("*/*"), Some(MediaFamily::Any));
        assert_eq!(MediaFamily::of("application/xml"), None);
        assert_eq!(MediaFamily::of("image/png"), None);
    }

    #[test]
    fn test_request_prefers_json() {
        let c = content(&["multipart/form-data", "application/json"]);
        assert_eq!(select_request_media(&c).unwrap().0, "application/json");
    }

    #[test]
    fn test_request_accepts_form_and_binary() {
        let c = content(&["application/xml", "application/x-www-form-urlencoded"]);
        assert_eq!(
            select_request_media(&c).unwrap().0,
            "application/x-www-form-urlencoded"
        );
        let c = content(&["application/octet-stream"]);
        assert!(select_request_media(&c).is_some());
    }

    #[test]
    fn test_response_ignores_form_encodings() {
        let c = content(&["multipart/form-data", "application/octet-stream"]);
        assert!(select_response_media(&c).is_none());
        let c = content(&["application/xml", "text/csv"]);
        assert_eq!(select_response_media(&c).unwrap().0, "text/csv");
    }

    #[test]
    fn test_response_prefers_entries_with_schema() {
        let mut c = content(&["application/json", "text/plain"]);
        c["text/plain"].schema = Some(
            serde_yaml_ng::from_str("type: string").unwrap(),
        );
        assert_eq!(select_response_media(&c).unwrap().0, "text/plain");

        let c = content(&["application/json", "text/plain"]);
        assert_eq!(select_response_media(&c).unwrap().0, "application/json");
    }

    #[test]
    fn test_wildcard_always_matches() {
        let c = content(&["*/*"]);
        assert!(select_request_media(&c).is_some());
        assert!(select_response_media(&c).is_some());
    }
}
