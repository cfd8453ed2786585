use indexmap::IndexMap;

use crate::config::{BuildConfig, DefaultStatusBehavior, NamingStrategy};
use crate::error::BuildError;
use crate::ir::*;
use crate::parse::components::Components;
use crate::parse::ref_path::{ComponentType, RefLocation, component_pointer, escape_pointer_segment};
use crate::parse::ref_resolve::ComponentResolver;
use crate::parse::security::undeclared_schemes;
use crate::parse::spec::OpenApiSpec;

use super::dependency_graph::DependencyGraph;
use super::enum_extractor::extract_enums;
use super::operations::build_path_item;
use super::parameters::{build_header, build_parameter};
use super::request_body::build_request_body;
use super::responses::build_response;
use super::schema_builder::{BuildContext, BuildScope, build_component_schema};

/// Options controlling how the IR is built.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub default_status_behavior: DefaultStatusBehavior,
    /// Score at or above which `IrDocument::should_extract` answers yes.
    pub complexity_threshold: u32,
    pub infer_all_of_inheritance: bool,
    pub naming_strategy: NamingStrategy,
    /// Map from resolved operation name to a custom name.
    pub aliases: IndexMap<String, String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        let config = BuildConfig::default();
        Self {
            default_status_behavior: config.default_status_behavior,
            complexity_threshold: config.complexity_threshold,
            infer_all_of_inheritance: config.infer_all_of_inheritance,
            naming_strategy: config.naming_strategy,
            aliases: config.aliases,
        }
    }
}

/// Build the IR of a parsed document with default options.
pub fn build_document(spec: &OpenApiSpec) -> Result<IrDocument, BuildError> {
    build_document_with_options(spec, &BuildOptions::default())
}

/// Build the IR of a parsed document. All or nothing: the first error aborts
/// the build.
pub fn build_document_with_options(
    spec: &OpenApiSpec,
    options: &BuildOptions,
) -> Result<IrDocument, BuildError> {
    let resolver = ComponentResolver::new(spec);

    // Phase 1: Dependency graph over component schemas
    let graph = DependencyGraph::build(&resolver)?;

    // Phase 2: Components, the document's own first, then each bundled file
    let mut components = Vec::new();
    if let Some(own) = &spec.components {
        build_components(RefLocation::Standard, own, resolver, &graph, options, &mut components)?;
    }
    for (hash, doc) in &spec.x_ext {
        if let Some(bundled) = &doc.components {
            let location = RefLocation::External { hash: hash.clone() };
            build_components(location, bundled, resolver, &graph, options, &mut components)?;
        }
    }

    let mut schema_index = SchemaIndex::default();
    for (index, component) in components.iter().enumerate() {
        if component.as_schema().is_some() {
            schema_index.insert(component, index);
        }
    }
    log::debug!(
        "built {} components ({} schemas)",
        components.len(),
        schema_index.len()
    );

    // Phase 3: Operations and webhooks
    let document_security = spec.security.as_deref();
    let mut operations = Vec::new();
    for (path, item) in &spec.paths {
        let ctx = BuildContext::new(
            resolver,
            &graph,
            options,
            BuildScope::Operation,
            format!("#/paths/{}", escape_pointer_segment(path)),
        );
        operations.extend(build_path_item(path, item, document_security, &ctx)?);
    }
    let mut webhooks = Vec::new();
    for (name, item) in &spec.webhooks {
        let ctx = BuildContext::new(
            resolver,
            &graph,
            options,
            BuildScope::Operation,
            format!("#/webhooks/{}", escape_pointer_segment(name)),
        );
        webhooks.extend(build_path_item(name, item, document_security, &ctx)?);
    }
    log::debug!(
        "built {} operations and {} webhooks",
        operations.len(),
        webhooks.len()
    );

    let declared = |name: &str| {
        components
            .iter()
            .any(|c| c.name == name && matches!(c.kind, ComponentKind::SecurityScheme(_)))
    };
    for op in operations.iter().chain(&webhooks) {
        for name in undeclared_schemes(&op.security, declared) {
            log::warn!(
                "{} {} requires undeclared security scheme '{name}'",
                op.method,
                op.path
            );
        }
    }

    // Phase 4: Enum catalog over the finished components and operations
    let enums = extract_enums(&components, &operations, &webhooks, &schema_index);

    Ok(IrDocument {
        openapi: spec.openapi.clone(),
        info: IrInfo {
            title: spec.info.title.clone(),
            summary: spec.info.summary.clone(),
            description: spec.info.description.clone(),
            version: spec.info.version.clone(),
        },
        servers: spec.servers.iter().map(IrServer::from).collect(),
        components,
        operations,
        webhooks,
        graph,
        schema_index,
        enums,
        security: spec.security.clone().unwrap_or_default(),
        tags: spec
            .tags
            .iter()
            .map(|tag| IrTag {
                name: tag.name.clone(),
                description: tag.description.clone(),
            })
            .collect(),
        complexity_threshold: options.complexity_threshold,
    })
}

fn build_components(
    location: RefLocation,
    section: &Components,
    resolver: ComponentResolver<'_>,
    graph: &DependencyGraph,
    options: &BuildOptions,
    out: &mut Vec<IrComponent>,
) -> Result<(), BuildError> {
    let pointer = |kind: ComponentType, name: &str| component_pointer(&location, kind, name);
    let context = |path: &str, required: bool| {
        BuildContext::new(resolver, graph, options, BuildScope::Component, path)
            .with_required(required)
    };
    let mut push = |name: &str, pointer: String, kind: ComponentKind| {
        out.push(IrComponent {
            name: name.to_string(),
            pointer,
            location: location.clone(),
            kind,
        });
    };

    for (name, slot) in &section.schemas {
        let at = pointer(ComponentType::Schemas, name);
        let node = build_component_schema(&at, slot, resolver, graph, options)?;
        push(name, at, ComponentKind::Schema(node));
    }
    for (name, slot) in &section.parameters {
        let at = pointer(ComponentType::Parameters, name);
        let param = resolver.resolve_slot(slot)?;
        let built = build_parameter(param, &context(&at, true))?;
        push(name, at, ComponentKind::Parameter(built));
    }
    for (name, slot) in &section.responses {
        let at = pointer(ComponentType::Responses, name);
        let response = resolver.resolve_slot(slot)?;
        let built = build_response(response, &context(&at, true))?;
        push(name, at, ComponentKind::Response(built));
    }
    for (name, slot) in &section.request_bodies {
        let at = pointer(ComponentType::RequestBodies, name);
        let body = resolver.resolve_slot(slot)?;
        if let Some(built) = build_request_body(body, &context(&at, body.required))? {
            push(name, at, ComponentKind::RequestBody(built));
        }
    }
    for (name, slot) in &section.headers {
        let at = pointer(ComponentType::Headers, name);
        let header = resolver.resolve_slot(slot)?;
        let built = build_header(name, header, &context(&at, header.required))?;
        push(name, at, ComponentKind::Header(built));
    }
    for (name, scheme) in &section.security_schemes {
        let at = pointer(ComponentType::SecuritySchemes, name);
        push(name, at, ComponentKind::SecurityScheme(scheme.clone()));
    }
    for (name, link) in &section.links {
        push(name, pointer(ComponentType::Links, name), ComponentKind::Link(link.clone()));
    }
    for (name, callback) in &section.callbacks {
        let at = pointer(ComponentType::Callbacks, name);
        push(name, at, ComponentKind::Callback(callback.clone()));
    }
    for (name, item) in &section.path_items {
        let at = pointer(ComponentType::PathItems, name);
        push(name, at, ComponentKind::PathItem(item.clone()));
    }
    for (name, example) in &section.examples {
        let at = pointer(ComponentType::Examples, name);
        push(name, at, ComponentKind::Example(example.clone()));
    }
    Ok(())
}
