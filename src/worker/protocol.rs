//! Wire types for the schema worker.
//!
//! One JSON object per line in each direction. Requests carry a unique id
//! which the worker echoes back on the matching response.

use serde::{Deserialize, Serialize};

pub mod methods {
    pub const LIST_TABLES: &str = "metadata.list_tables";
    pub const GET_TABLE: &str = "metadata.get_table";
    pub const GET_FOREIGN_KEYS: &str = "metadata.get_foreign_keys";
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestEnvelope {
    pub id: String,
    /// One of [`methods`].
    pub method: String,
    pub params: serde_json::Value,
}

/// `result` is set on success, `error` otherwise.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseEnvelope {
    pub id: String,
    pub success: bool,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorInfo {
    /// `CONNECTION_FAILED`, `DRIVER_NOT_FOUND`, ...
    pub code: String,
    pub message: String,
}

/// Sent flattened into every request's params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// `mssql`, `postgresql`, `mysql`, ...
    pub driver: String,
    pub connection_string: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListTablesParams {
    #[serde(flatten)]
    pub connection: ConnectionParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetTableParams {
    #[serde(flatten)]
    pub connection: ConnectionParams,
    pub schema: String,
    pub table: String,
}

/// Without a table, every foreign key in the database is returned.
#[derive(Debug, Clone, Serialize)]
pub struct GetForeignKeysParams {
    #[serde(flatten)]
    pub connection: ConnectionParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub schema: String,
    pub name: String,
    /// `TABLE` or `VIEW`.
    #[serde(rename = "type", default = "default_table_type")]
    pub table_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListTablesResponse {
    pub tables: Vec<TableInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// 1-based; 0 when the source did not say.
    #[serde(default)]
    pub position: i32,
    /// As the database spells it, e.g. `nvarchar(100)`.
    pub data_type: String,
    #[serde(default)]
    pub is_nullable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryKeyInfo {
    #[serde(default)]
    pub name: String,
    /// In key order.
    pub columns: Vec<String>,
}

/// `columns[i]` references `referenced_columns[i]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyInfo {
    #[serde(default)]
    pub name: String,
    pub columns: Vec<String>,
    /// Empty means the declaring table's schema.
    #[serde(default)]
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetForeignKeysResponse {
    pub tables: Vec<TableForeignKeys>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableForeignKeys {
    pub schema: String,
    pub table: String,
    pub foreign_keys: Vec<ForeignKeyInfo>,
}

/// One table with its keys. Offline schema snapshots use the same shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDetailInfo {
    #[serde(default)]
    pub schema: String,
    pub name: String,
    #[serde(rename = "type", default = "default_table_type")]
    pub table_type: String,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub primary_key: Option<PrimaryKeyInfo>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetTableResponse {
    pub table: TableDetailInfo,
}

fn default_table_type() -> String {
    "TABLE".to_string()
}
