//! Operation Builder.
//!
//! One [`IrOperation`] per method of a path item: path-level parameters are
//! merged with the operation's own, the request body and responses are
//! built, and the default-status policy categorizes the responses.

use super::name_normalizer::{normalize_name, operation_name};
use super::parameters::build_parameter;
use super::request_body::build_request_body;
use super::responses::build_responses;
use super::schema_builder::BuildContext;
use crate::error::BuildError;
use crate::ir::{
    HttpMethod, IrOperation, IrParameter, IrSecurityRequirement, IrServer, ParameterGroups,
    PathItemMeta, SharedParameter,
};
use crate::parse::operation::{Operation, PathItem};
use crate::parse::ref_resolve::{ComponentSlot, Slot};
use crate::parse::security::SecurityRequirement;
use crate::parse::server::Server;

impl From<&Server> for IrServer {
    fn from(server: &Server) -> Self {
        IrServer {
            url: server.url.clone(),
            description: server.description.clone(),
            variables: server.variable_defaults(),
        }
    }
}

/// Build every operation of one path item. `ctx` points at the path item
/// (`#/paths/~1pets` or `#/webhooks/newPet`); `route` is the path template
/// or the webhook name.
pub fn build_path_item(
    route: &str,
    item: &PathItem,
    document_security: Option<&[SecurityRequirement]>,
    ctx: &BuildContext<'_>,
) -> Result<Vec<IrOperation>, BuildError> {
    let mut shared = Vec::with_capacity(item.parameters.len());
    let mut declared = Vec::with_capacity(item.parameters.len());
    for (index, slot) in item.parameters.iter().enumerate() {
        let reference = match slot.slot() {
            Slot::Ref(raw) => Some(raw.to_string()),
            Slot::Object(_) => None,
        };
        let param = ctx.resolver.resolve_slot(slot)?;
        let built = build_parameter(param, &ctx.child(&format!("parameters/{index}"), true))?;
        declared.push(SharedParameter {
            reference,
            parameter: built.clone(),
        });
        shared.push(built);
    }

    let path_item = PathItemMeta {
        summary: item.summary.clone(),
        description: item.description.clone(),
        servers: item.servers.iter().map(IrServer::from).collect(),
        parameters: declared,
    };

    let mut out = Vec::new();
    for (method, op) in item.operations() {
        let op_ctx = ctx.child(method.key(), true);
        let built = build_operation(
            method,
            route,
            op,
            &shared,
            &path_item,
            document_security,
            &op_ctx,
        )?;
        log::trace!("built operation {} {route} as {}", method, built.name);
        out.push(built);
    }
    Ok(out)
}

fn build_operation(
    method: HttpMethod,
    route: &str,
    op: &Operation,
    shared: &[IrParameter],
    path_item: &PathItemMeta,
    document_security: Option<&[SecurityRequirement]>,
    ctx: &BuildContext<'_>,
) -> Result<IrOperation, BuildError> {
    let options = ctx.options;
    let raw_name = operation_name(
        method,
        route,
        op.operation_id.as_deref(),
        options.naming_strategy,
        &options.aliases,
    );

    let mut own = Vec::with_capacity(op.parameters.len());
    for (index, slot) in op.parameters.iter().enumerate() {
        let param = ctx.resolver.resolve_slot(slot)?;
        own.push(build_parameter(param, &ctx.child(&format!("parameters/{index}"), true))?);
    }
    let parameters = merge_parameters(shared, own);
    let parameter_groups = group_parameters(&parameters);

    let request_body = match &op.request_body {
        Some(slot) => {
            let body = ctx.resolver.resolve_slot(slot)?;
            build_request_body(body, &ctx.child("requestBody", body.required))?
        }
        None => None,
    };

    let responses = build_responses(
        &op.responses,
        options.default_status_behavior,
        &ctx.child("responses", true),
    )?;

    Ok(IrOperation {
        name: normalize_name(&raw_name),
        operation_id: op.operation_id.clone(),
        method,
        path: route.to_string(),
        summary: op.summary.clone(),
        description: op.description.clone(),
        tags: op.tags.clone(),
        deprecated: op.is_deprecated(),
        parameters,
        parameter_groups,
        request_body,
        responses,
        security: effective_security(op.security.as_deref(), document_security),
        servers: op.servers.iter().map(IrServer::from).collect(),
        path_item: path_item.clone(),
    })
}

/// Path-level parameters first; an operation parameter with the same name
/// and location replaces the shared one in place.
pub fn merge_parameters(shared: &[IrParameter], own: Vec<IrParameter>) -> Vec<IrParameter> {
    let mut merged = shared.to_vec();
    for param in own {
        let existing = merged
            .iter()
            .position(|p| p.original_name == param.original_name && p.location == param.location);
        match existing {
            Some(index) => merged[index] = param,
            None => merged.push(param),
        }
    }
    merged
}

pub fn group_parameters(parameters: &[IrParameter]) -> ParameterGroups {
    let mut groups = ParameterGroups::default();
    for param in parameters {
        groups
            .get_mut(param.location)
            .insert(param.original_name.clone(), param.clone());
    }
    groups
}

/// The operation's own requirements win, including an explicit empty list.
pub fn effective_security(
    operation: Option<&[SecurityRequirement]>,
    document: Option<&[SecurityRequirement]>,
) -> Vec<IrSecurityRequirement> {
    operation.or(document).map(<[_]>::to_vec).unwrap_or_default()
}
