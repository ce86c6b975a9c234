//! Database connection resolution.
//!
//! The gateway configuration names the database in its `data-source`
//! section:
//!
//! ```json
//! "data-source": {
//!   "database-type": "mssql",
//!   "connection-string": "@env('my-connection-string')"
//! }
//! ```
//!
//! `@env('NAME')` references are resolved from the process environment
//! first and then from the `.env` file next to the configuration.

use std::collections::HashMap;
use std::env;
use std::sync::LazyLock;

use regex::Regex;

use crate::worker::protocol::ConnectionParams;

/// Pattern for `@env('NAME')` references inside configuration values.
static ENV_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"@env\(\s*['"]([^'"]+)['"]\s*\)"#).expect("valid regex"));

/// Error type for connection configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Missing environment variable referenced by the configuration: {0}")]
    MissingEnvVar(String),

    #[error("Unsupported database type: {0}. Supported: mssql, postgresql, mysql, dwsql")]
    UnsupportedDatabase(String),

    #[error("Configuration has no data-source connection string")]
    MissingConnectionString,
}

/// Relational database types the schema worker can introspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    /// Microsoft SQL Server / Azure SQL
    MsSql,
    /// PostgreSQL
    PostgreSql,
    /// MySQL
    MySql,
    /// Azure Synapse dedicated SQL pool
    DwSql,
}

impl DatabaseType {
    /// Parse the gateway's `database-type` value.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConnectionError> {
        match s.to_lowercase().as_str() {
            "mssql" | "sqlserver" | "sql_server" => Ok(DatabaseType::MsSql),
            "postgresql" | "postgres" => Ok(DatabaseType::PostgreSql),
            "mysql" => Ok(DatabaseType::MySql),
            "dwsql" => Ok(DatabaseType::DwSql),
            other => Err(ConnectionError::UnsupportedDatabase(other.to_string())),
        }
    }

    /// Get the driver name for the worker.
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseType::MsSql => "mssql",
            DatabaseType::PostgreSql => "postgresql",
            DatabaseType::MySql => "mysql",
            DatabaseType::DwSql => "dwsql",
        }
    }

    /// Schema assumed for unqualified object names.
    pub fn default_schema(&self) -> &'static str {
        match self {
            DatabaseType::MsSql | DatabaseType::DwSql => "dbo",
            DatabaseType::PostgreSql => "public",
            DatabaseType::MySql => "",
        }
    }
}

/// A resolved database connection.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub database_type: DatabaseType,
    /// Connection string with every `@env()` reference substituted.
    pub connection_string: String,
}

impl ConnectionConfig {
    /// Resolve a connection from raw `data-source` values.
    ///
    /// `env_file` holds variables loaded from a `.env` file; the process
    /// environment wins over it.
    pub fn resolve(
        database_type: &str,
        connection_string: Option<&str>,
        env_file: &HashMap<String, String>,
    ) -> Result<Self, ConnectionError> {
        let database_type = DatabaseType::from_str(database_type)?;
        let raw = connection_string
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConnectionError::MissingConnectionString)?;

        Ok(Self {
            database_type,
            connection_string: resolve_env_references(raw, env_file)?,
        })
    }

    /// Parameters for worker requests.
    pub fn to_params(&self) -> ConnectionParams {
        ConnectionParams {
            driver: self.database_type.as_str().to_string(),
            connection_string: self.connection_string.clone(),
        }
    }
}

/// Substitute every `@env('NAME')` reference in `value`.
pub fn resolve_env_references(
    value: &str,
    env_file: &HashMap<String, String>,
) -> Result<String, ConnectionError> {
    let mut result = String::with_capacity(value.len());
    let mut last = 0;

    for caps in ENV_REFERENCE.captures_iter(value) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let name = name.as_str();
        let resolved = env::var(name)
            .ok()
            .or_else(|| env_file.get(name).cloned())
            .ok_or_else(|| ConnectionError::MissingEnvVar(name.to_string()))?;

        result.push_str(&value[last..whole.start()]);
        result.push_str(&resolved);
        last = whole.end();
    }

    result.push_str(&value[last..]);
    Ok(result)
}
