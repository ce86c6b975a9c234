//! TOML-based tool settings.
//!
//! Supports a settings file (`dabrel.toml`) with environment variable
//! expansion in paths.
//!
//! Example:
//! ```toml
//! [gateway]
//! config_file = "dab-config.json"
//! cli = "dab"
//!
//! [schema]
//! snapshot = "./schema.json"
//!
//! [worker]
//! path = "${HOME}/bin/dabrel-worker"
//! timeout = "30s"
//!
//! [executor]
//! idle_timeout = "5m"
//! dry_run = false
//! ```

use std::collections::HashMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// `${NAME}` or `$NAME`.
static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(?:\{([^}]*)\}|(\w+))").expect("valid regex"));

const SETTINGS_ENV: &str = "DABREL_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("no settings file at {0}")]
    FileNotFound(PathBuf),

    #[error("cannot read settings: {0}")]
    ReadError(#[from] io::Error),

    #[error("invalid settings: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("environment variable {0} is not set")]
    MissingEnvVar(String),

    #[error("'{0}' is not a duration; use e.g. 30s, 5m, 1h or 250ms")]
    InvalidDuration(String),
}

/// Contents of `dabrel.toml`; every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Gateway configuration and CLI.
    pub gateway: GatewaySettings,

    /// Schema source selection.
    pub schema: SchemaSettings,

    /// Schema worker process.
    pub worker: WorkerSettings,

    /// External CLI executor.
    pub executor: ExecutorSettings,
}

/// Gateway configuration settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Path to the gateway's JSON configuration file.
    pub config_file: String,

    /// Gateway CLI executable used to apply relationship updates.
    pub cli: String,

    /// Environment file consulted for `@env()` references.
    /// Defaults to `.env` beside the configuration file.
    pub env_file: Option<String>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            config_file: "dab-config.json".to_string(),
            cli: "dab".to_string(),
            env_file: None,
        }
    }
}

/// Schema source settings.
///
/// Unqualified table names take the default schema of the gateway
/// configuration's database type, never a setting of their own.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SchemaSettings {
    /// Offline JSON schema snapshot; used instead of the worker when set.
    pub snapshot: Option<String>,
}

/// How to start the schema worker.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Path to worker binary.
    pub path: Option<String>,

    /// Extra command-line arguments for the worker.
    pub args: Vec<String>,

    /// Request timeout (e.g., "30s", "1m").
    pub timeout: String,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            path: None,
            args: Vec::new(),
            timeout: "30s".to_string(),
        }
    }
}

impl WorkerSettings {
    /// Parsed request timeout.
    pub fn timeout(&self) -> Result<Duration, SettingsError> {
        parse_duration(&self.timeout)
    }
}

/// Settings for running the gateway CLI.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Reuse the executor while idle for less than this (e.g., "5m").
    pub idle_timeout: String,

    /// Print commands instead of running them.
    pub dry_run: bool,

    /// Extra environment variables for the CLI process.
    pub env: HashMap<String, String>,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            idle_timeout: "5m".to_string(),
            dry_run: false,
            env: HashMap::new(),
        }
    }
}

impl ExecutorSettings {
    /// Parsed idle timeout.
    pub fn idle_timeout(&self) -> Result<Duration, SettingsError> {
        parse_duration(&self.idle_timeout)
    }
}

impl Settings {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SettingsError::FileNotFound(path.to_path_buf()),
            _ => SettingsError::ReadError(e),
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// `$DABREL_CONFIG` if set (and then it must exist), otherwise the first
    /// of `./dabrel.toml` and `<config dir>/dabrel/config.toml` that exists,
    /// otherwise defaults.
    pub fn load() -> Result<Self, SettingsError> {
        if let Some(explicit) = env::var_os(SETTINGS_ENV) {
            return Self::from_file(PathBuf::from(explicit));
        }

        let user = dirs::config_dir().map(|dir| dir.join("dabrel").join("config.toml"));
        match std::iter::once(PathBuf::from("dabrel.toml"))
            .chain(user)
            .find(|candidate| candidate.is_file())
        {
            Some(found) => Self::from_file(found),
            None => Ok(Self::default()),
        }
    }

    /// Gateway configuration path with environment variables expanded.
    pub fn config_path(&self) -> Result<PathBuf, SettingsError> {
        Ok(PathBuf::from(expand_env_vars(&self.gateway.config_file)?))
    }

    /// Environment file for `@env()` references.
    pub fn env_file_path(&self) -> Result<PathBuf, SettingsError> {
        match &self.gateway.env_file {
            Some(path) => Ok(PathBuf::from(expand_env_vars(path)?)),
            None => {
                let config = self.config_path()?;
                let dir = config.parent().unwrap_or_else(|| Path::new(""));
                Ok(dir.join(".env"))
            }
        }
    }

    /// Schema snapshot path, if one is configured.
    pub fn snapshot_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.schema
            .snapshot
            .as_deref()
            .map(|p| expand_env_vars(p).map(PathBuf::from))
            .transpose()
    }

    /// The configured worker binary, else `dabrel-worker` in the working
    /// directory, `./worker/` or on `PATH`.
    pub fn worker_path(&self) -> Option<PathBuf> {
        if let Some(configured) = &self.worker.path {
            return expand_env_vars(configured).ok().map(PathBuf::from);
        }

        let local = ["dabrel-worker", "worker/dabrel-worker"]
            .into_iter()
            .map(PathBuf::from);
        let on_path = env::var_os("PATH")
            .map(|paths| env::split_paths(&paths).collect::<Vec<_>>())
            .unwrap_or_default()
            .into_iter()
            .map(|dir| dir.join("dabrel-worker"));

        local.chain(on_path).find(|candidate| candidate.is_file())
    }
}

/// Parse a duration such as `"30s"`, `"5m"`, `"1h"` or `"250ms"`.
///
/// A bare number is read as seconds.
pub fn parse_duration(s: &str) -> Result<Duration, SettingsError> {
    let s = s.trim();
    let invalid = || SettingsError::InvalidDuration(s.to_string());

    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let value: u64 = digits.parse().map_err(|_| invalid())?;

    match unit.trim() {
        "" | "s" => Ok(Duration::from_secs(value)),
        "ms" => Ok(Duration::from_millis(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 3600)),
        _ => Err(invalid()),
    }
}

/// Substitute `${NAME}` and `$NAME` from the process environment.
///
/// A `$` not followed by a name is kept as is.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut expanded = String::with_capacity(s.len());
    let mut copied = 0;

    for caps in ENV_VAR.captures_iter(s) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let name = variable_name(&caps);
        let value = env::var(name).map_err(|_| SettingsError::MissingEnvVar(name.to_string()))?;

        expanded.push_str(&s[copied..whole.start]);
        expanded.push_str(&value);
        copied = whole.end;
    }

    expanded.push_str(&s[copied..]);
    Ok(expanded)
}

fn variable_name<'a>(caps: &Captures<'a>) -> &'a str {
    caps.get(1)
        .or_else(|| caps.get(2))
        .map_or("", |m| m.as_str())
}
