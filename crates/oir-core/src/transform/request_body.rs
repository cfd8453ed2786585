use indexmap::IndexMap;

use super::media_type::select_request_media;
use super::parameters::build_header;
use super::schema_builder::{BuildContext, build_optional_schema};
use crate::error::BuildError;
use crate::ir::{IrFieldEncoding, IrRequestBody};
use crate::parse::media_type::MediaType;
use crate::parse::ref_path::escape_pointer_segment;
use crate::parse::request_body::RequestBody;

/// Build a concrete request body. `ctx` points at the body itself.
///
/// Returns `None` when no declared media type is supported.
pub fn build_request_body(
    body: &RequestBody,
    ctx: &BuildContext<'_>,
) -> Result<Option<IrRequestBody>, BuildError> {
    if body.content.is_empty() {
        return Err(BuildError::RequestBodyContract {
            path: ctx.path.clone(),
            reason: "request body declares no content".to_string(),
        });
    }

    let Some((media, media_type)) = select_request_media(&body.content) else {
        log::warn!(
            "request body at {} has no supported media type ({}); skipping it",
            ctx.path,
            body.content.keys().cloned().collect::<Vec<_>>().join(", ")
        );
        return Ok(None);
    };

    let media_ctx = ctx.child(&format!("content/{}", escape_pointer_segment(media)), body.required);
    let schema = build_optional_schema(
        media_type.schema.as_ref(),
        &media_ctx.child("schema", body.required),
    )?;
    let encoding = build_encoding(media_type, &media_ctx)?;

    Ok(Some(IrRequestBody {
        description: body.description.clone(),
        required: body.required,
        media_type: media.to_string(),
        schema,
        encoding,
        content_types: body.media_types().map(str::to_string).collect(),
    }))
}

fn build_encoding(
    media_type: &MediaType,
    ctx: &BuildContext<'_>,
) -> Result<IndexMap<String, IrFieldEncoding>, BuildError> {
    let mut out = IndexMap::with_capacity(media_type.encoding.len());
    for (field, encoding) in &media_type.encoding {
        let field_ctx = ctx.named_child("encoding", field, true);
        let mut headers = IndexMap::new();
        for (name, slot) in &encoding.headers {
            let header = field_ctx.resolver.resolve_slot(slot)?;
            let header_ctx = field_ctx.named_child("headers", name, header.required);
            headers.insert(name.clone(), build_header(name, header, &header_ctx)?);
        }
        out.insert(
            field.clone(),
            IrFieldEncoding {
                content_type: encoding.content_type.clone(),
                headers,
                style: encoding.style.clone(),
                explode: encoding.explode,
                allow_reserved: encoding.allow_reserved,
            },
        );
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::SchemaKind;
    use crate::parse;
    use crate::parse::ref_resolve::ComponentResolver;
    use crate::parse::spec::OpenApiSpec;
    use crate::transform::dependency_graph::DependencyGraph;
    use crate::transform::schema_builder::BuildScope;
    use crate::transform::spec_to_ir::BuildOptions;

    fn empty_spec() -> OpenApiSpec {
        parse::from_yaml("openapi: \"3.1.0\"\ninfo:\n  title: t\n  version: \"1\"\npaths: {}\n")
            .unwrap()
    }

    fn build(spec: &OpenApiSpec, yaml: &str) -> Result<Option<IrRequestBody>, BuildError> {
        let body: RequestBody = serde_yaml_ng::from_str(yaml).unwrap();
        let graph = DependencyGraph::default();
        let options = BuildOptions::default();
        let ctx = BuildContext::new(
            ComponentResolver::new(spec),
            &graph,
            &options,
            BuildScope::Operation,
            "#/paths/~1pets/post/requestBody",
        );
        build_request_body(&body, &ctx)
    }

    #[test]
    fn test_required_defaults_to_false() {
        let spec = empty_spec();
        let body = build(
            &spec,
            "content:\n  application/json:\n    schema:\n      type: object\n",
        )
        .unwrap()
        .unwrap();
        assert!(!body.required);
        assert!(!body.schema.metadata.required);
        assert_eq!(body.media_type, "application/json");
    }

    #[test]
    fn test_multipart_encoding_passes_through() {
        let spec = empty_spec();
        let body = build(
            &spec,
            r#"
required: true
content:
  multipart/form-data:
    schema:
      type: object
      properties:
        file:
          type: string
          format: binary
    encoding:
      file:
        contentType: image/png
        headers:
          X-Rate-Limit:
            schema:
              type: integer
"#,
        )
        .unwrap()
        .unwrap();
        assert!(body.required);
        assert_eq!(body.media_type, "multipart/form-data");
        let file = &body.encoding["file"];
        assert_eq!(file.content_type.as_deref(), Some("image/png"));
        assert!(file.headers.contains_key("X-Rate-Limit"));
    }

    #[test]
    fn test_missing_schema_builds_unknown() {
        let spec = empty_spec();
        let body = build(&spec, "content:\n  text/plain: {}\n").unwrap().unwrap();
        assert_eq!(body.schema.kind, SchemaKind::Unknown);
    }

    #[test]
    fn test_unsupported_media_is_skipped() {
        let spec = empty_spec();
        let body = build(&spec, "content:\n  application/xml:\n    schema:\n      type: string\n")
            .unwrap();
        assert!(body.is_none());
    }

    #[test]
    fn test_empty_content_is_a_contract_violation() {
        let spec = empty_spec();
        let err = build(&spec, "description: nothing\ncontent: {}\n").unwrap_err();
        assert!(matches!(err, BuildError::RequestBodyContract { .. }));
    }
}
