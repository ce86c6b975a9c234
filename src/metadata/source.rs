//! SchemaSource trait definition.
//!
//! The discovery engine and the linking-table wizard only ever see schema
//! metadata through this trait. Implementations are read-only.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use super::types::{
    linking_candidates, tables_with_outward_keys, ColumnRow, ForeignKeyGroup, ForeignKeyRow,
    LinkingCandidate,
};
use crate::naming::SchemaObjectName;
use crate::worker::WorkerError;

/// Result type for schema queries.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while querying schema metadata.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema worker failed or could not connect.
    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error("schema snapshot not found: {0}")]
    SnapshotNotFound(PathBuf),

    #[error("failed to read schema snapshot {path}: {source}")]
    SnapshotRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse schema snapshot {path}: {source}")]
    SnapshotParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read-only access to relational schema metadata.
///
/// ```ignore
/// async fn example(source: &impl SchemaSource) -> SchemaResult<()> {
///     let keys = source.query_foreign_keys().await?;
///     let pk = source.query_primary_keys(&"dbo.authors".into()).await?;
///     let junctions = source.query_linking_candidates().await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Every foreign key column pair, in declaration order.
    async fn query_foreign_keys(&self) -> SchemaResult<Vec<ForeignKeyRow>>;

    /// Primary key columns of a table, in key order. Empty if none.
    async fn query_primary_keys(&self, table: &SchemaObjectName) -> SchemaResult<Vec<String>>;

    /// Columns of a table, in ordinal order.
    async fn query_columns(&self, table: &SchemaObjectName) -> SchemaResult<Vec<ColumnRow>>;

    /// Junction tables usable for automatic many-to-many discovery.
    ///
    /// The default derives them from [`query_foreign_keys`](Self::query_foreign_keys).
    async fn query_linking_candidates(&self) -> SchemaResult<Vec<LinkingCandidate>> {
        let rows = self.query_foreign_keys().await?;
        Ok(linking_candidates(&ForeignKeyGroup::group(&rows)))
    }

    /// Tables declaring at least two foreign keys, for the linking wizard.
    async fn query_wizard_linking_tables(&self) -> SchemaResult<Vec<SchemaObjectName>> {
        let rows = self.query_foreign_keys().await?;
        Ok(tables_with_outward_keys(&ForeignKeyGroup::group(&rows), 2))
    }
}
