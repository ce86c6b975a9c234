//! Applying accepted relationships through the gateway CLI.
//!
//! The crate never edits the gateway configuration itself. Each accepted
//! relationship becomes one [`UpdateRelationship`] command, run by a
//! [`CommandExecutor`] handed out by an [`ExecutorPool`].

mod command;
mod error;
mod executor;
mod name;
mod pool;

pub use command::{encode_relationship_fields, UpdateRelationship};
pub use error::{EmitError, EmitResult};
pub use executor::{CommandExecutor, CommandOutput, ProcessExecutor, RecordingExecutor};
pub use name::{pluralize, relationship_name};
pub use pool::{ExecutorPool, DEFAULT_IDLE_TIMEOUT};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

/// Runs relationship updates against one configuration file.
#[derive(Debug)]
pub struct RelationshipEmitter {
    pool: ExecutorPool,
    config_file: PathBuf,
    /// What the CLI receives as `--config`; relative to the executor's
    /// working directory.
    config_arg: PathBuf,
}

impl RelationshipEmitter {
    /// Executors from `pool` run where the configuration path resolves as given.
    pub fn new(pool: ExecutorPool, config_file: impl Into<PathBuf>) -> Self {
        let config_file = config_file.into();
        Self {
            pool,
            config_arg: config_file.clone(),
            config_file,
        }
    }

    /// Run `program` as a child process inside the configuration file's
    /// directory, passing the configuration by file name.
    pub fn process(
        program: impl Into<String>,
        env: HashMap<String, String>,
        config_file: impl Into<PathBuf>,
        idle_timeout: Duration,
    ) -> Self {
        let config_file = config_file.into();
        let program = program.into();
        let working_dir = config_file
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf);
        let config_arg = match (&working_dir, config_file.file_name()) {
            (Some(_), Some(name)) => PathBuf::from(name),
            _ => config_file.clone(),
        };

        let pool = ExecutorPool::new(
            move || {
                let mut executor = ProcessExecutor::new(program.clone()).with_env(env.clone());
                if let Some(dir) = &working_dir {
                    executor = executor.with_working_dir(dir.clone());
                }
                Arc::new(executor) as Arc<dyn CommandExecutor>
            },
            idle_timeout,
        );

        Self {
            pool,
            config_file,
            config_arg,
        }
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Apply one update. A non-zero exit is an error.
    pub async fn emit(&self, update: &UpdateRelationship) -> EmitResult<CommandOutput> {
        let executor = self.pool.acquire().await;
        let args = update.to_args(&self.config_arg);
        let output = executor.run(&args).await?;

        if !output.is_success() {
            return Err(EmitError::CommandFailed {
                command: format!("{} {}", executor.program(), args.join(" ")),
                status: output.status,
                stderr: output.stderr.trim().to_string(),
            });
        }

        info!(
            source = %update.source_alias,
            target = %update.target_alias,
            relationship = %update.relationship_name,
            "relationship added"
        );
        Ok(output)
    }
}
