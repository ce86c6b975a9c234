//! Running gateway CLI commands.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::error::{EmitError, EmitResult};

/// Output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` if the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success() -> Self {
        Self {
            status: Some(0),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs gateway CLI invocations.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run the gateway CLI with `args` (program name excluded).
    async fn run(&self, args: &[String]) -> EmitResult<CommandOutput>;

    /// Program name, for messages.
    fn program(&self) -> &str;
}

/// Runs the gateway CLI as a child process.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    program: String,
    env: HashMap<String, String>,
    working_dir: Option<PathBuf>,
}

impl ProcessExecutor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            env: HashMap::new(),
            working_dir: None,
        }
    }

    /// Extra environment variables for every invocation.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn run(&self, args: &[String]) -> EmitResult<CommandOutput> {
        debug!(program = %self.program, ?args, "running gateway CLI");

        let mut command = Command::new(&self.program);
        command
            .args(args)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let output = command.output().await.map_err(|source| EmitError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn program(&self) -> &str {
        &self.program
    }
}

/// Records commands instead of running them.
///
/// Used for dry runs and in tests. Every command succeeds unless the
/// executor was built with [`failing_on`](Self::failing_on).
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    program: String,
    commands: Mutex<Vec<Vec<String>>>,
    fail_when: Option<String>,
}

impl RecordingExecutor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            commands: Mutex::new(Vec::new()),
            fail_when: None,
        }
    }

    /// Fail every command whose arguments contain `arg`.
    pub fn failing_on(mut self, arg: impl Into<String>) -> Self {
        self.fail_when = Some(arg.into());
        self
    }

    /// Commands seen so far, in order.
    pub async fn commands(&self) -> Vec<Vec<String>> {
        self.commands.lock().await.clone()
    }
}

#[async_trait]
impl CommandExecutor for RecordingExecutor {
    async fn run(&self, args: &[String]) -> EmitResult<CommandOutput> {
        info!(command = %format!("{} {}", self.program, args.join(" ")), "dry run");
        self.commands.lock().await.push(args.to_vec());

        match &self.fail_when {
            Some(arg) if args.iter().any(|a| a == arg) => Ok(CommandOutput {
                status: Some(1),
                stdout: String::new(),
                stderr: format!("rejected {arg}"),
            }),
            _ => Ok(CommandOutput::success()),
        }
    }

    fn program(&self) -> &str {
        &self.program
    }
}
