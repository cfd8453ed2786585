use indexmap::{IndexMap, IndexSet};

use super::components::Components;
use super::header::{Header, HeaderOrRef};
use super::parameter::{Parameter, ParameterOrRef};
use super::ref_path::{ComponentRef, ComponentType, RefLocation, component_pointer};
use super::request_body::{RequestBody, RequestBodyOrRef};
use super::response::{Response, ResponseOrRef};
use super::schema::{Schema, SchemaOrRef};
use super::spec::OpenApiSpec;
use crate::error::ResolveError;

/// Either side of a "reference or object" slot.
#[derive(Debug)]
pub enum Slot<'a, T> {
    Ref(&'a str),
    Object(&'a T),
}

/// A "reference or object" slot stored in a components section.
pub trait ComponentSlot: Sized + 'static {
    type Target: 'static;
    const KIND: ComponentType;

    fn section(components: &Components) -> &IndexMap<String, Self>;
    fn slot(&self) -> Slot<'_, Self::Target>;
}

macro_rules! component_slot {
    ($slot:ty, $target:ty, $kind:expr, $field:ident, $variant:ident) => {
        impl ComponentSlot for $slot {
            type Target = $target;
            const KIND: ComponentType = $kind;

            fn section(components: &Components) -> &IndexMap<String, Self> {
                &components.$field
            }

            fn slot(&self) -> Slot<'_, Self::Target> {
                match self {
                    Self::Ref { ref_path } => Slot::Ref(ref_path),
                    Self::$variant(inner) => Slot::Object(inner),
                }
            }
        }
    };
}

component_slot!(SchemaOrRef, Schema, ComponentType::Schemas, schemas, Schema);
component_slot!(
    ParameterOrRef,
    Parameter,
    ComponentType::Parameters,
    parameters,
    Parameter
);
component_slot!(
    ResponseOrRef,
    Response,
    ComponentType::Responses,
    responses,
    Response
);
component_slot!(
    RequestBodyOrRef,
    RequestBody,
    ComponentType::RequestBodies,
    request_bodies,
    RequestBody
);
component_slot!(HeaderOrRef, Header, ComponentType::Headers, headers, Header);

/// A component found by the resolver, with the pointer of the location it
/// was actually found at.
#[derive(Debug)]
pub struct Located<'a, T> {
    pub pointer: String,
    pub location: RefLocation,
    pub name: String,
    pub value: &'a T,
}

/// Resolves `$ref` strings against the components of a bundled document.
///
/// Lookups never mutate the document. Chains of references are followed with
/// a seen-set so a chain that never reaches a concrete object fails instead
/// of looping.
#[derive(Debug, Clone, Copy)]
pub struct ComponentResolver<'a> {
    spec: &'a OpenApiSpec,
}

impl<'a> ComponentResolver<'a> {
    pub fn new(spec: &'a OpenApiSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &'a OpenApiSpec {
        self.spec
    }

    /// Find the slot a reference points at, without following further refs.
    ///
    /// External references try their bundled file first and then fall back to
    /// the document's own components.
    pub fn locate<T: ComponentSlot>(&self, raw: &str) -> Result<Located<'a, T>, ResolveError> {
        let parsed = ComponentRef::parse(raw)?;
        parsed.expect_type(T::KIND)?;

        let mut attempted = Vec::new();
        let mut candidates = Vec::new();
        if let RefLocation::External { hash } = &parsed.location {
            attempted.push(parsed.canonical());
            candidates.push((
                parsed.location.clone(),
                self.spec
                    .x_ext
                    .get(hash)
                    .and_then(|doc| doc.components.as_ref()),
            ));
        }
        attempted.push(component_pointer(
            &RefLocation::Standard,
            T::KIND,
            &parsed.name,
        ));
        candidates.push((RefLocation::Standard, self.spec.components.as_ref()));

        for (location, components) in candidates {
            if let Some(value) = components.and_then(|c| T::section(c).get(&parsed.name)) {
                return Ok(Located {
                    pointer: component_pointer(&location, T::KIND, &parsed.name),
                    location,
                    name: parsed.name,
                    value,
                });
            }
        }

        Err(ResolveError::RefTargetNotFound {
            reference: raw.to_string(),
            attempted,
        })
    }

    /// Resolve a reference to its concrete object, following chains of
    /// component aliases.
    pub fn resolve<T: ComponentSlot>(&self, raw: &str) -> Result<&'a T::Target, ResolveError> {
        let mut seen = IndexSet::new();
        self.resolve_chain::<T>(raw, &mut seen)
    }

    /// Resolve an inline-or-reference slot to its concrete object.
    pub fn resolve_slot<T: ComponentSlot>(
        &self,
        slot: &'a T,
    ) -> Result<&'a T::Target, ResolveError> {
        match slot.slot() {
            Slot::Ref(raw) => self.resolve::<T>(raw),
            Slot::Object(object) => Ok(object),
        }
    }

    fn resolve_chain<T: ComponentSlot>(
        &self,
        raw: &str,
        seen: &mut IndexSet<String>,
    ) -> Result<&'a T::Target, ResolveError> {
        let located = self.locate::<T>(raw)?;
        if !seen.insert(located.pointer.clone()) {
            let mut chain: Vec<String> = seen.iter().cloned().collect();
            chain.push(located.pointer);
            return Err(ResolveError::CircularRef { chain });
        }

        match located.value.slot() {
            Slot::Ref(next) => self.resolve_chain::<T>(next, seen),
            Slot::Object(object) => Ok(object),
        }
    }

    /// Resolve a schema reference that must point directly at a concrete schema.
    ///
    /// Operation-level schema references are expected to be one hop away from
    /// their definition; a target that is itself a `$ref` is a contract
    /// violation by whatever bundled the document.
    pub fn resolve_schema(&self, raw: &str) -> Result<&'a Schema, ResolveError> {
        let located = self.locate::<SchemaOrRef>(raw)?;
        match located.value {
            SchemaOrRef::Schema(schema) => Ok(schema),
            SchemaOrRef::Ref { ref_path } => Err(ResolveError::NestedSchemaRef {
                reference: raw.to_string(),
                target: ref_path.clone(),
            }),
        }
    }

    /// The pointer of the location a schema reference resolves to.
    pub fn schema_pointer(&self, raw: &str) -> Result<String, ResolveError> {
        self.locate::<SchemaOrRef>(raw).map(|located| located.pointer)
    }

    pub fn resolve_parameter(&self, raw: &str) -> Result<&'a Parameter, ResolveError> {
        self.resolve::<ParameterOrRef>(raw)
    }

    pub fn resolve_request_body(&self, raw: &str) -> Result<&'a RequestBody, ResolveError> {
        self.resolve::<RequestBodyOrRef>(raw)
    }

    pub fn resolve_response(&self, raw: &str) -> Result<&'a Response, ResolveError> {
        self.resolve::<ResponseOrRef>(raw)
    }

    pub fn resolve_header(&self, raw: &str) -> Result<&'a Header, ResolveError> {
        self.resolve::<HeaderOrRef>(raw)
    }

    /// Every component schema in declaration order: the document's own
    /// components first, then each bundled file in `x-ext` order.
    pub fn component_schemas(&self) -> Vec<Located<'a, SchemaOrRef>> {
        let mut out = Vec::new();
        if let Some(components) = &self.spec.components {
            push_schemas(&mut out, RefLocation::Standard, components);
        }
        for (hash, doc) in &self.spec.x_ext {
            if let Some(components) = &doc.components {
                let location = RefLocation::External { hash: hash.clone() };
                push_schemas(&mut out, location, components);
            }
        }
        out
    }
}

fn push_schemas<'a>(
    out: &mut Vec<Located<'a, SchemaOrRef>>,
    location: RefLocation,
    components: &'a Components,
) {
    for (name, value) in &components.schemas {
        out.push(Located {
            pointer: component_pointer(&location, ComponentType::Schemas, name),
            location: location.clone(),
            name: name.clone(),
            value,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    const SPEC: &str = r##"
openapi: "3.1.0"
info:
  title: Resolver
  version: "1.0"
paths: {}
components:
  schemas:
    Pet:
      type: object
      properties:
        name:
          type: string
    PetAlias:
      $ref: "#/components/schemas/Pet"
    Ping:
      $ref: "#/components/schemas/Pong"
    Pong:
      $ref: "#/components/schemas/Ping"
  parameters:
    Limit:
      name: limit
      in: query
      schema:
        type: integer
    LimitAlias:
      $ref: "#/components/parameters/Limit"
x-ext:
  f00d:
    components:
      schemas:
        Owner:
          type: object
"##;

    fn spec() -> OpenApiSpec {
        parse::from_yaml(SPEC).unwrap()
    }

    #[test]
    fn test_resolve_schema_direct() {
        let spec = spec();
        let resolver = ComponentResolver::new(&spec);
        let pet = resolver.resolve_schema("#/components/schemas/Pet").unwrap();
        assert!(pet.properties.contains_key("name"));
    }

    #[test]
    fn test_resolve_schema_rejects_nested_ref() {
        let spec = spec();
        let resolver = ComponentResolver::new(&spec);
        let err = resolver
            .resolve_schema("#/components/schemas/PetAlias")
            .unwrap_err();
        assert!(matches!(err, ResolveError::NestedSchemaRef { .. }));
        assert!(err.to_string().contains("fully dereferenced"));
    }

    #[test]
    fn test_resolve_follows_alias_chain() {
        let spec = spec();
        let resolver = ComponentResolver::new(&spec);
        let pet = resolver
            .resolve::<SchemaOrRef>("#/components/schemas/PetAlias")
            .unwrap();
        assert!(pet.properties.contains_key("name"));

        let limit = resolver
            .resolve_parameter("#/components/parameters/LimitAlias")
            .unwrap();
        assert_eq!(limit.name, "limit");
    }

    #[test]
    fn test_resolve_detects_circular_component_refs() {
        let spec = spec();
        let resolver = ComponentResolver::new(&spec);
        let err = resolver
            .resolve::<SchemaOrRef>("#/components/schemas/Ping")
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::CircularRef {
                chain: vec![
                    "#/components/schemas/Ping".to_string(),
                    "#/components/schemas/Pong".to_string(),
                    "#/components/schemas/Ping".to_string(),
                ]
            }
        );
    }

    #[test]
    fn test_resolve_rejects_wrong_component_type() {
        let spec = spec();
        let resolver = ComponentResolver::new(&spec);
        let err = resolver
            .resolve_parameter("#/components/schemas/Pet")
            .unwrap_err();
        assert!(matches!(err, ResolveError::ComponentTypeMismatch { .. }));
    }

    #[test]
    fn test_missing_target_lists_attempted_locations() {
        let spec = spec();
        let resolver = ComponentResolver::new(&spec);
        let err = resolver
            .resolve_schema("#/x-ext/f00d/components/schemas/Missing")
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::RefTargetNotFound {
                reference: "#/x-ext/f00d/components/schemas/Missing".to_string(),
                attempted: vec![
                    "#/x-ext/f00d/components/schemas/Missing".to_string(),
                    "#/components/schemas/Missing".to_string(),
                ],
            }
        );
    }

    #[test]
    fn test_external_ref_falls_back_to_standard_location() {
        let spec = spec();
        let resolver = ComponentResolver::new(&spec);

        let owner = resolver
            .schema_pointer("#/x-ext/f00d/components/schemas/Owner")
            .unwrap();
        assert_eq!(owner, "#/x-ext/f00d/components/schemas/Owner");

        let pet = resolver
            .schema_pointer("#/x-ext/f00d/components/schemas/Pet")
            .unwrap();
        assert_eq!(pet, "#/components/schemas/Pet");
    }

    #[test]
    fn test_bare_name_resolves_as_schema() {
        let spec = spec();
        let resolver = ComponentResolver::new(&spec);
        assert!(resolver.resolve_schema("Pet").is_ok());
    }

    #[test]
    fn test_component_schemas_in_declaration_order() {
        let spec = spec();
        let resolver = ComponentResolver::new(&spec);
        let pointers: Vec<String> = resolver
            .component_schemas()
            .into_iter()
            .map(|l| l.pointer)
            .collect();
        assert_eq!(
            pointers,
            vec![
                "#/components/schemas/Pet",
                "#/components/schemas/PetAlias",
                "#/components/schemas/Ping",
                "#/components/schemas/Pong",
                "#/x-ext/f00d/components/schemas/Owner",
            ]
        );
    }
}
