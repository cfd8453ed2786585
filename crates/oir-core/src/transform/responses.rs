use indexmap::IndexMap;

use super::media_type::select_response_media;
use super::parameters::build_header;
use super::schema_builder::{BuildContext, build_schema};
use super::status_policy::categorize;
use crate::config::DefaultStatusBehavior;
use crate::error::BuildError;
use crate::ir::{IrResponse, IrResponses, StatusKey};
use crate::parse::ref_path::escape_pointer_segment;
use crate::parse::response::{Response, ResponseOrRef};

/// Build one response. `ctx` points at the response itself.
///
/// The body schema comes from the preferred `content` entry, or from a direct
/// `schema` field when the response has no content map.
pub fn build_response(response: &Response, ctx: &BuildContext<'_>) -> Result<IrResponse, BuildError> {
    let (media_type, schema) = match select_response_media(&response.content) {
        Some((media, media_type)) => {
            let schema = media_type
                .schema
                .as_ref()
                .map(|slot| {
                    let path = format!("content/{}/schema", escape_pointer_segment(media));
                    build_schema(slot, &ctx.child(&path, true))
                })
                .transpose()?;
            (Some(media.to_string()), schema)
        }
        None => {
            if !response.content.is_empty() {
                log::debug!(
                    "response at {} has no JSON or text media type; body left untyped",
                    ctx.path
                );
            }
            let schema = response
                .schema
                .as_ref()
                .map(|slot| build_schema(slot, &ctx.child("schema", true)))
                .transpose()?;
            (None, schema)
        }
    };

    let mut headers = IndexMap::with_capacity(response.headers.len());
    for (name, slot) in &response.headers {
        let header = ctx.resolver.resolve_slot(slot)?;
        let header_ctx = ctx.named_child("headers", name, header.required);
        headers.insert(name.clone(), build_header(name, header, &header_ctx)?);
    }

    Ok(IrResponse {
        description: response.description.clone(),
        media_type,
        schema,
        headers,
    })
}

/// Build every response of an operation and pick the main and error entries.
/// `ctx` points at the `responses` map.
pub fn build_responses(
    responses: &IndexMap<String, ResponseOrRef>,
    behavior: DefaultStatusBehavior,
    ctx: &BuildContext<'_>,
) -> Result<IrResponses, BuildError> {
    let mut all = IndexMap::with_capacity(responses.len());
    for (status, slot) in responses {
        let key = StatusKey::parse(status).ok_or_else(|| BuildError::InvalidStatusCode {
            path: ctx.path.clone(),
            status: status.clone(),
        })?;
        let response = ctx.resolver.resolve_slot(slot)?;
        let built = build_response(response, &ctx.child(&escape_pointer_segment(status), true))?;
        all.insert(key, built);
    }

    let (main, errors) = categorize(&all, behavior);
    if main.is_none() && !all.is_empty() {
        log::debug!("no main response at {}", ctx.path);
    }
    Ok(IrResponses { all, main, errors })
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

    fn spec() -> OpenApiSpec {
        parse::from_yaml(
            r##"
openapi: "3.1.0"
info:
  title: t
  version: "1"
paths: {}
components:
  schemas:
    Pet:
      type: object
    Error:
      type: object
  responses:
    NotFound:
      description: not found
      content:
        application/json:
          schema:
            $ref: "#/components/schemas/Error"
"##,
        )
        .unwrap()
    }

    fn build(
        spec: &OpenApiSpec,
        yaml: &str,
        behavior: DefaultStatusBehavior,
    ) -> Result<IrResponses, BuildError> {
        let responses: IndexMap<String, ResponseOrRef> = serde_yaml_ng::from_str(yaml).unwrap();
        let graph = DependencyGraph::default();
        let options = BuildOptions::default();
        let ctx = BuildContext::new(
            ComponentResolver::new(spec),
            &graph,
            &options,
            BuildScope::Operation,
            "#/paths/~1pets/get/responses",
        );
        build_responses(&responses, behavior, &ctx)
    }

    #[test]
    fn test_main_and_errors() {
        let spec = spec();
        let responses = build(
            &spec,
            r##"
"204":
  description: empty
"200":
  description: ok
  content:
    application/json:
      schema:
        $ref: "#/components/schemas/Pet"
"404":
  $ref: "#/components/responses/NotFound"
"##,
            DefaultStatusBehavior::SpecCompliant,
        )
        .unwrap();
        assert_eq!(responses.main, Some(StatusKey::Code(200)));
        let main = responses.main_response().unwrap();
        assert!(main.schema.as_ref().unwrap().is_reference());
        let errors: Vec<&str> = responses.error_responses().map(|(k, _)| k).collect();
        assert_eq!(errors, vec!["404"]);
        assert_eq!(responses.all.len(), 3);
    }

    #[test]
    fn test_text_response_keeps_media_type() {
        let spec = spec();
        let responses = build(
            &spec,
            r#"
"200":
  description: csv
  content:
    text/csv:
      schema:
        type: string
"#,
            DefaultStatusBehavior::SpecCompliant,
        )
        .unwrap();
        let main = responses.main_response().unwrap();
        assert_eq!(main.media_type.as_deref(), Some("text/csv"));
        assert!(matches!(
            main.schema.as_ref().unwrap().kind,
            SchemaKind::Primitive(_)
        ));
    }

    #[test]
    fn test_schemaless_json_entry_yields_to_text_schema() {
        let spec = spec();
        let responses = build(
            &spec,
            r#"
"200":
  description: ok
  content:
    application/json: {}
    text/plain:
      schema:
        type: string
"#,
            DefaultStatusBehavior::SpecCompliant,
        )
        .unwrap();
        let main = responses.main_response().unwrap();
        assert_eq!(main.media_type.as_deref(), Some("text/plain"));
        assert!(main.schema.is_some());
    }

    #[test]
    fn test_direct_schema_field() {
        let spec = spec();
        let responses = build(
            &spec,
            r#"
"201":
  description: created
  schema:
    type: object
"#,
            DefaultStatusBehavior::SpecCompliant,
        )
        .unwrap();
        assert_eq!(responses.main, Some(StatusKey::Code(201)));
        assert!(responses.main_response().unwrap().media_type.is_none());
    }

    #[test]
    fn test_headers_are_built() {
        let spec = spec();
        let responses = build(
            &spec,
            r#"
"200":
  description: ok
  headers:
    X-Next:
      required: true
      schema:
        type: string
"#,
            DefaultStatusBehavior::SpecCompliant,
        )
        .unwrap();
        let header = &responses.all[&StatusKey::Code(200)].headers["X-Next"];
        assert!(header.required);
        assert!(header.schema.metadata.required);
    }

    #[test]
    fn test_default_status_policies() {
        let spec = spec();
        let yaml = r#"
default:
  description: fallback
  content:
    application/json:
      schema:
        type: object
"#;
        let compliant = build(&spec, yaml, DefaultStatusBehavior::SpecCompliant).unwrap();
        assert_eq!(compliant.main, None);

        let corrected = build(&spec, yaml, DefaultStatusBehavior::AutoCorrect).unwrap();
        assert_eq!(corrected.main, Some(StatusKey::Default));
    }

    #[test]
    fn test_invalid_status_code() {
        let spec = spec();
        let err = build(
            &spec,
            "\"OK\":\n  description: nope\n",
            DefaultStatusBehavior::SpecCompliant,
        )
        .unwrap_err();
        let BuildError::InvalidStatusCode { path, status } = err else {
            panic!("expected invalid status code, got {err:?}");
        };
        assert_eq!(status, "OK");
        assert_eq!(path, "#/paths/~1pets/get/responses");
    }
}
