//! WorkerSchemaSource implementation.
//!
//! Answers schema queries with RPC calls to the schema worker.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::snapshot::{column_rows, foreign_key_rows};
use super::source::{SchemaResult, SchemaSource};
use super::types::{ColumnRow, ForeignKeyRow};
use crate::naming::SchemaObjectName;
use crate::worker::protocol::ConnectionParams;
use crate::worker::WorkerClient;

/// [`SchemaSource`] backed by a [`WorkerClient`].
///
/// ```ignore
/// let client = WorkerClient::spawn("./dabrel-worker").await?;
/// let source = WorkerSchemaSource::new(Arc::new(client), connection.to_params(), "dbo");
/// let keys = source.query_foreign_keys().await?;
/// ```
pub struct WorkerSchemaSource {
    /// The worker client for RPC calls.
    client: Arc<WorkerClient>,
    /// Connection parameters sent with every request.
    connection: ConnectionParams,
    /// Schema for foreign keys whose referenced schema is not reported.
    default_schema: String,
}

impl WorkerSchemaSource {
    pub fn new(
        client: Arc<WorkerClient>,
        connection: ConnectionParams,
        default_schema: impl Into<String>,
    ) -> Self {
        Self {
            client,
            connection,
            default_schema: default_schema.into(),
        }
    }

    /// Get the driver name.
    pub fn driver(&self) -> &str {
        &self.connection.driver
    }
}

#[async_trait]
impl SchemaSource for WorkerSchemaSource {
    async fn query_foreign_keys(&self) -> SchemaResult<Vec<ForeignKeyRow>> {
        let response = self.client.get_foreign_keys(&self.connection).await?;

        let rows: Vec<ForeignKeyRow> = response
            .tables
            .iter()
            .flat_map(|table| {
                let schema = if table.schema.is_empty() {
                    self.default_schema.as_str()
                } else {
                    table.schema.as_str()
                };
                let source = SchemaObjectName::new(schema, &table.table);
                table
                    .foreign_keys
                    .iter()
                    .flat_map(move |fk| foreign_key_rows(&source, fk, &self.default_schema))
            })
            .collect();

        debug!(rows = rows.len(), "worker returned foreign keys");
        Ok(rows)
    }

    async fn query_primary_keys(&self, table: &SchemaObjectName) -> SchemaResult<Vec<String>> {
        let response = self
            .client
            .get_table(&self.connection, &table.schema, &table.name)
            .await?;

        Ok(response
            .table
            .primary_key
            .map(|pk| pk.columns)
            .unwrap_or_default())
    }

    async fn query_columns(&self, table: &SchemaObjectName) -> SchemaResult<Vec<ColumnRow>> {
        let response = self
            .client
            .get_table(&self.connection, &table.schema, &table.name)
            .await?;

        Ok(column_rows(&response.table.columns))
    }
}
