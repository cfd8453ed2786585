use indexmap::IndexMap;

use super::media_type::select_request_media;
use super::name_normalizer::normalize_name;
use super::schema_builder::{BuildContext, build_optional_schema, build_schema};
use crate::error::BuildError;
use crate::ir::{IrHeader, IrParameter, IrParameterLocation, SchemaNode};
use crate::parse::header::Header;
use crate::parse::media_type::MediaType;
use crate::parse::parameter::{Parameter, ParameterLocation};
use crate::parse::ref_path::escape_pointer_segment;
use crate::parse::schema::SchemaOrRef;

impl From<ParameterLocation> for IrParameterLocation {
    fn from(location: ParameterLocation) -> Self {
        match location {
            ParameterLocation::Path => IrParameterLocation::Path,
            ParameterLocation::Query => IrParameterLocation::Query,
            ParameterLocation::Header => IrParameterLocation::Header,
            ParameterLocation::Cookie => IrParameterLocation::Cookie,
        }
    }
}

/// Build a concrete parameter. `ctx` points at the parameter itself.
///
/// Path parameters are always required, whatever the document declares.
pub fn build_parameter(param: &Parameter, ctx: &BuildContext<'_>) -> Result<IrParameter, BuildError> {
    let location = IrParameterLocation::from(param.location);
    let required = location == IrParameterLocation::Path || param.required;
    if location == IrParameterLocation::Path && !param.required {
        log::warn!(
            "path parameter '{}' at {} is not marked required; treating it as required",
            param.name,
            ctx.path
        );
    }

    let (schema, media_type) = build_schema_or_content(
        &param.name,
        location.as_str(),
        param.schema.as_ref(),
        param.content.as_ref(),
        &ctx.clone().with_required(required),
    )?;

    Ok(IrParameter {
        name: normalize_name(&param.name),
        original_name: param.name.clone(),
        location,
        required,
        description: param.description.clone(),
        deprecated: param.deprecated.unwrap_or(false),
        schema,
        media_type,
        style: param.style.clone(),
        explode: param.explode,
    })
}

/// Build a response or encoding header; same schema/content rule as parameters.
pub fn build_header(name: &str, header: &Header, ctx: &BuildContext<'_>) -> Result<IrHeader, BuildError> {
    let (schema, media_type) = build_schema_or_content(
        name,
        "header",
        header.schema.as_ref(),
        header.content.as_ref(),
        &ctx.clone().with_required(header.required),
    )?;

    Ok(IrHeader {
        name: name.to_string(),
        description: header.description.clone(),
        required: header.required,
        deprecated: header.deprecated.unwrap_or(false),
        schema,
        media_type,
    })
}

/// Exactly one of `schema` or `content` must be present.
fn build_schema_or_content(
    name: &str,
    location: &str,
    schema: Option<&SchemaOrRef>,
    content: Option<&IndexMap<String, MediaType>>,
    ctx: &BuildContext<'_>,
) -> Result<(SchemaNode, Option<String>), BuildError> {
    let contract = |reason: &str| BuildError::ParameterContract {
        name: name.to_string(),
        location: format!("{location} at {}", ctx.path),
        reason: reason.to_string(),
    };

    match (schema, content) {
        (Some(schema), None) => {
            let node = build_schema(schema, &ctx.child("schema", ctx.required))?;
            Ok((node, None))
        }
        (None, Some(content)) => {
            if content.is_empty() {
                return Err(contract("'content' must declare a media type"));
            }
            let Some((media, media_type)) = select_request_media(content) else {
                log::warn!(
                    "{location} '{name}' at {} has no supported media type; schema left open",
                    ctx.path
                );
                let node = build_optional_schema(None, &ctx.child("content", ctx.required))?;
                return Ok((node, content.keys().next().cloned()));
            };
            let child = ctx.child(
                &format!("content/{}/schema", escape_pointer_segment(media)),
                ctx.required,
            );
            let node = build_optional_schema(media_type.schema.as_ref(), &child)?;
            Ok((node, Some(media.to_string())))
        }
        (Some(_), Some(_)) => Err(contract("declares both 'schema' and 'content'")),
        (None, None) => Err(contract("declares neither 'schema' nor 'content'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{PrimitiveType, SchemaKind};
    use crate::parse;
    use crate::parse::ref_resolve::ComponentResolver;
    use crate::parse::spec::OpenApiSpec;
    use crate::transform::dependency_graph::DependencyGraph;
    use crate::transform::schema_builder::BuildScope;
    use crate::transform::spec_to_ir::BuildOptions;

    fn empty_spec() -> OpenApiSpec {
        parse::from_yaml("openapi: \"3.0.3\"\ninfo:\n  title: t\n  version: \"1\"\npaths: {}\n")
            .unwrap()
    }

    fn build(spec: &OpenApiSpec, yaml: &str) -> Result<IrParameter, BuildError> {
        let param: Parameter = serde_yaml_ng::from_str(yaml).unwrap();
        let graph = DependencyGraph::default();
        let options = BuildOptions::default();
        let ctx = BuildContext::new(
            ComponentResolver::new(spec),
            &graph,
            &options,
            BuildScope::Operation,
            "#/paths/~1pets/get/parameters/0",
        );
        build_parameter(&param, &ctx)
    }

    #[test]
    fn test_path_parameter_forced_required() {
        let spec = empty_spec();
        let param = build(
            &spec,
            "name: petId\nin: path\nrequired: false\nschema:\n  type: string\n",
        )
        .unwrap();
        assert!(param.required);
        assert!(param.schema.metadata.required);
        assert_eq!(param.location, IrParameterLocation::Path);
    }

    #[test]
    fn test_query_parameter_keeps_declared_required() {
        let spec = empty_spec();
        let param = build(&spec, "name: limit\nin: query\nschema:\n  type: integer\n").unwrap();
        assert!(!param.required);
        assert!(!param.schema.metadata.required);
        assert_eq!(param.schema.kind, SchemaKind::Primitive(PrimitiveType::Integer));
        assert_eq!(param.name.camel_case, "limit");
    }

    #[test]
    fn test_content_parameter_selects_media_type() {
        let spec = empty_spec();
        let param = build(
            &spec,
            r#"
name: filter
in: query
content:
  application/xml:
    schema:
      type: string
  application/json:
    schema:
      type: object
"#,
        )
        .unwrap();
        assert_eq!(param.media_type.as_deref(), Some("application/json"));
        assert!(matches!(param.schema.kind, SchemaKind::Object(_)));
    }

    #[test]
    fn test_schema_and_content_are_exclusive() {
        let spec = empty_spec();
        let both = build(
            &spec,
            r#"
name: q
in: query
schema:
  type: string
content:
  application/json:
    schema:
      type: string
"#,
        )
        .unwrap_err();
        let message = both.to_string();
        assert!(message.contains("'q'"));
        assert!(message.contains("query"));
        assert!(message.contains("both"));

        let neither = build(&spec, "name: q\nin: query\n").unwrap_err();
        assert!(matches!(neither, BuildError::ParameterContract { .. }));
    }
}
