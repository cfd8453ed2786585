pub mod chain;
pub mod complexity;
pub mod composition;
pub mod dependency_graph;
pub mod enum_extractor;
pub mod media_type;
pub mod name_normalizer;
pub mod operations;
pub mod parameters;
pub mod request_body;
pub mod responses;
pub mod schema_builder;
pub mod spec_to_ir;
pub mod status_policy;
pub mod to_openapi;
pub mod tool_schema;

pub use spec_to_ir::{BuildOptions, build_document, build_document_with_options};
