//! Relationship discovery.
//!
//! Reads foreign keys from a [`SchemaSource`] and turns them into
//! [`DiscoveredRelationship`] records:
//!
//! ```text
//!   query_foreign_keys ──▶ group by (source, target, constraint)
//!            │                    │
//!            │                    ▼
//!            │             discover_direct      (cardinality from primary keys)
//!            ▼
//!   junction candidates ──▶ discover_via_linking_tables   (two directions each)
//! ```
//!
//! Discovery never fails: a schema query error is logged and yields no
//! records, the same as a schema without foreign keys.

mod cardinality;
mod direct;
mod linking;
mod relationship;

pub use cardinality::{Cardinality, ConfigCardinality};
pub use relationship::DiscoveredRelationship;

use tracing::{info, warn};

use crate::metadata::SchemaSource;

/// Relationships carried directly by foreign keys.
pub async fn discover_direct<S>(source: &S) -> Vec<DiscoveredRelationship>
where
    S: SchemaSource + ?Sized,
{
    match direct::direct_relationships(source).await {
        Ok(found) => {
            info!(count = found.len(), "discovered direct relationships");
            found
        }
        Err(e) => {
            warn!(error = %e, "foreign key discovery failed; offering nothing");
            Vec::new()
        }
    }
}

/// Many-to-many relationships through junction tables.
pub async fn discover_via_linking_tables<S>(source: &S) -> Vec<DiscoveredRelationship>
where
    S: SchemaSource + ?Sized,
{
    match linking::linking_relationships(source).await {
        Ok(found) => {
            info!(count = found.len(), "discovered linking-table relationships");
            found
        }
        Err(e) => {
            warn!(error = %e, "linking table discovery failed; offering nothing");
            Vec::new()
        }
    }
}

/// Direct relationships followed by linking-table relationships.
pub async fn discover_all<S>(source: &S) -> Vec<DiscoveredRelationship>
where
    S: SchemaSource + ?Sized,
{
    let mut all = discover_direct(source).await;
    all.extend(discover_via_linking_tables(source).await);
    all
}
