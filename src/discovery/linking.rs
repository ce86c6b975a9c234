//! Many-to-many relationships through junction tables.

use tracing::debug;

use super::relationship::DiscoveredRelationship;
use crate::metadata::{SchemaResult, SchemaSource};

/// Two directional records per junction candidate.
pub(crate) async fn linking_relationships<S>(
    source: &S,
) -> SchemaResult<Vec<DiscoveredRelationship>>
where
    S: SchemaSource + ?Sized,
{
    let candidates = source.query_linking_candidates().await?;

    Ok(candidates
        .iter()
        .flat_map(|candidate| {
            debug!(
                linking_table = %candidate.linking_table,
                left = %candidate.left.target_table,
                right = %candidate.right.target_table,
                "junction table"
            );
            DiscoveredRelationship::from_candidate(candidate)
        })
        .collect())
}
