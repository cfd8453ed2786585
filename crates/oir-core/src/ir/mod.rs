pub mod components;
pub mod document;
pub mod metadata;
pub mod operations;
pub mod schema;
pub mod types;

pub use components::*;
pub use document::*;
pub use metadata::*;
pub use operations::*;
pub use schema::*;
pub use types::{IrInfo, IrSecurityRequirement, IrServer, IrTag, NormalizedName};
