//! Configuration module.
//!
//! Handles tool settings, environment variables and the database connection
//! named by the gateway configuration.

mod connection;
mod env_file;
mod settings;

pub use connection::{resolve_env_references, ConnectionConfig, ConnectionError, DatabaseType};
pub use env_file::{load_env_file, parse_env};
pub use settings::{
    expand_env_vars, parse_duration, ExecutorSettings, GatewaySettings, SchemaSettings, Settings,
    SettingsError, WorkerSettings,
};
