//! Offline schema source backed by a JSON snapshot.
//!
//! The snapshot has the same table shape the worker returns from
//! `metadata.get_table`:
//!
//! ```json
//! {
//!   "tables": [
//!     {
//!       "schema": "dbo",
//!       "name": "books_authors",
//!       "columns": [{"name": "author_id", "data_type": "int"}],
//!       "primary_key": {"columns": ["author_id", "book_id"]},
//!       "foreign_keys": [
//!         {"name": "FK_ba_author", "columns": ["author_id"],
//!          "referenced_schema": "dbo", "referenced_table": "authors",
//!          "referenced_columns": ["id"]}
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::source::{SchemaError, SchemaResult, SchemaSource};
use super::types::{ColumnRow, ForeignKeyRow};
use crate::naming::SchemaObjectName;
use crate::worker::protocol::{ColumnInfo, TableDetailInfo};

/// A schema snapshot file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    #[serde(default)]
    pub tables: Vec<TableDetailInfo>,
}

/// [`SchemaSource`] answering from an in-memory [`SchemaSnapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    snapshot: SchemaSnapshot,
    default_schema: String,
}

impl SnapshotSource {
    /// Wrap a snapshot; tables without a schema fall in `dbo`.
    pub fn new(snapshot: SchemaSnapshot) -> Self {
        Self::with_default_schema(snapshot, crate::naming::DEFAULT_SCHEMA)
    }

    pub fn with_default_schema(snapshot: SchemaSnapshot, default_schema: &str) -> Self {
        Self {
            snapshot,
            default_schema: default_schema.to_string(),
        }
    }

    /// Load a snapshot file.
    pub fn from_file(path: &Path, default_schema: &str) -> SchemaResult<Self> {
        if !path.exists() {
            return Err(SchemaError::SnapshotNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|source| SchemaError::SnapshotRead {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: SchemaSnapshot =
            serde_json::from_str(&content).map_err(|source| SchemaError::SnapshotParse {
                path: path.to_path_buf(),
                source,
            })?;

        debug!(path = %path.display(), tables = snapshot.tables.len(), "loaded schema snapshot");
        Ok(Self::with_default_schema(snapshot, default_schema))
    }

    fn table_name(&self, schema: &str, name: &str) -> SchemaObjectName {
        if schema.trim().is_empty() {
            SchemaObjectName::new(&self.default_schema, name)
        } else {
            SchemaObjectName::new(schema, name)
        }
    }

    fn find(&self, table: &SchemaObjectName) -> Option<&TableDetailInfo> {
        self.snapshot
            .tables
            .iter()
            .find(|t| &self.table_name(&t.schema, &t.name) == table)
    }
}

#[async_trait]
impl SchemaSource for SnapshotSource {
    async fn query_foreign_keys(&self) -> SchemaResult<Vec<ForeignKeyRow>> {
        Ok(self
            .snapshot
            .tables
            .iter()
            .flat_map(|table| {
                let source = self.table_name(&table.schema, &table.name);
                table
                    .foreign_keys
                    .iter()
                    .flat_map(move |fk| foreign_key_rows(&source, fk, &self.default_schema))
            })
            .collect())
    }

    async fn query_primary_keys(&self, table: &SchemaObjectName) -> SchemaResult<Vec<String>> {
        Ok(self
            .find(table)
            .and_then(|t| t.primary_key.as_ref())
            .map(|pk| pk.columns.clone())
            .unwrap_or_default())
    }

    async fn query_columns(&self, table: &SchemaObjectName) -> SchemaResult<Vec<ColumnRow>> {
        Ok(self
            .find(table)
            .map(|t| column_rows(&t.columns))
            .unwrap_or_default())
    }
}

/// Flatten one foreign key into per-column rows.
///
/// A key whose column lists differ in length yields no rows.
pub(crate) fn foreign_key_rows(
    source: &SchemaObjectName,
    fk: &crate::worker::protocol::ForeignKeyInfo,
    default_schema: &str,
) -> Vec<ForeignKeyRow> {
    let target_schema = if fk.referenced_schema.trim().is_empty() {
        default_schema
    } else {
        fk.referenced_schema.as_str()
    };
    let target = SchemaObjectName::new(target_schema, &fk.referenced_table);
    let constraint_name = (!fk.name.is_empty()).then(|| fk.name.clone());

    if fk.columns.len() != fk.referenced_columns.len() {
        warn!(
            table = %source,
            constraint = ?constraint_name,
            columns = fk.columns.len(),
            referenced_columns = fk.referenced_columns.len(),
            "skipping foreign key with mismatched column lists"
        );
        return Vec::new();
    }

    fk.columns
        .iter()
        .zip(&fk.referenced_columns)
        .map(|(source_column, target_column)| ForeignKeyRow {
            source_table: source.clone(),
            target_table: target.clone(),
            source_column: source_column.clone(),
            target_column: target_column.clone(),
            constraint_name: constraint_name.clone(),
        })
        .collect()
}

/// Columns in ordinal order; columns without a position keep file order.
pub(crate) fn column_rows(columns: &[ColumnInfo]) -> Vec<ColumnRow> {
    let mut sorted: Vec<&ColumnInfo> = columns.iter().collect();
    sorted.sort_by_key(|c| c.position);
    sorted
        .into_iter()
        .map(|c| ColumnRow {
            name: c.name.clone(),
            data_type: c.data_type.clone(),
            is_nullable: c.is_nullable,
        })
        .collect()
}
