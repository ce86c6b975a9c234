//! Relationships carried directly by foreign keys.

use std::collections::HashMap;

use tracing::debug;

use super::cardinality::Cardinality;
use super::relationship::DiscoveredRelationship;
use crate::metadata::{ForeignKeyGroup, SchemaResult, SchemaSource};
use crate::naming::SchemaObjectName;

/// One relationship per foreign key group, self-references excluded.
pub(crate) async fn direct_relationships<S>(source: &S) -> SchemaResult<Vec<DiscoveredRelationship>>
where
    S: SchemaSource + ?Sized,
{
    let rows = source.query_foreign_keys().await?;
    let groups = ForeignKeyGroup::group(&rows);
    let mut keys = PrimaryKeyCache::default();
    let mut relationships = Vec::with_capacity(groups.len());

    for group in &groups {
        if group.is_self_reference() {
            debug!(table = %group.source_table, "skipping self-referencing foreign key");
            continue;
        }

        let source_key = keys.get(source, &group.source_table).await?;
        let target_key = keys.get(source, &group.target_table).await?;
        let cardinality = Cardinality::infer(
            &source_key,
            &target_key,
            &group.source_columns,
            &group.target_columns,
        );

        debug!(
            source = %group.source_table,
            target = %group.target_table,
            %cardinality,
            "direct relationship"
        );
        relationships.push(DiscoveredRelationship::from_group(group, cardinality));
    }

    Ok(relationships)
}

/// Primary keys fetched once per table.
#[derive(Default)]
struct PrimaryKeyCache {
    keys: HashMap<SchemaObjectName, Vec<String>>,
}

impl PrimaryKeyCache {
    async fn get<S>(&mut self, source: &S, table: &SchemaObjectName) -> SchemaResult<Vec<String>>
    where
        S: SchemaSource + ?Sized,
    {
        if let Some(columns) = self.keys.get(table) {
            return Ok(columns.clone());
        }
        let columns = source.query_primary_keys(table).await?;
        self.keys.insert(table.clone(), columns.clone());
        Ok(columns)
    }
}
