//! Gateway configuration model.
//!
//! Reads the gateway's JSON configuration into an [`EntityCatalog`]: the
//! configured entities, their source objects and the relationships they
//! already declare. The catalog is read-only; relationship updates are
//! applied by the gateway CLI (see [`crate::emit`]).

mod catalog;
mod document;
mod error;

pub use catalog::{
    ConfiguredEntity, ConfiguredRelationship, EntityCatalog, FieldMapping, SourceType,
};
pub use document::DataSourceDocument;
pub use error::{ConfigError, ConfigResult};

use std::path::Path;

/// Load the configured entities from `path`.
pub fn load_entities(path: &Path) -> ConfigResult<EntityCatalog> {
    EntityCatalog::load(path)
}
