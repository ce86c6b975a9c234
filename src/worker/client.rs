//! Async client for the schema worker process.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::error::{WorkerError, WorkerResult};
use super::protocol::{
    methods, ConnectionParams, ErrorInfo, GetForeignKeysParams, GetForeignKeysResponse,
    GetTableParams, GetTableResponse, ListTablesParams, ListTablesResponse, RequestEnvelope,
    ResponseEnvelope,
};
use crate::config::Settings;

/// Used when the settings carry no valid `worker.timeout`.
const FALLBACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Requests waiting for their response, by request id.
type Waiting = Arc<Mutex<HashMap<String, oneshot::Sender<ResponseEnvelope>>>>;

/// Client for the schema worker.
///
/// The worker runs as a child process; requests and responses are NDJSON
/// lines on its stdin and stdout, correlated by a per-request UUID. A
/// background task reads responses and hands each to its waiting request.
///
/// ```ignore
/// let client = WorkerClient::spawn_with_settings(&settings).await?;
/// let keys = client.get_foreign_keys(&connection.to_params()).await?;
/// ```
pub struct WorkerClient {
    stdin: Mutex<BufWriter<ChildStdin>>,
    waiting: Waiting,
    reader: JoinHandle<()>,
    timeout: Duration,
    /// Held so the worker is killed when the client is dropped.
    _child: Child,
}

impl WorkerClient {
    /// Spawn the worker at `worker_path` with the fallback timeout.
    pub async fn spawn<P: AsRef<Path>>(worker_path: P) -> WorkerResult<Self> {
        Self::spawn_command(worker_path.as_ref(), &[], FALLBACK_TIMEOUT).await
    }

    /// Spawn the worker named in `[worker]` settings.
    pub async fn spawn_with_settings(settings: &Settings) -> WorkerResult<Self> {
        let path = settings.worker_path().ok_or(WorkerError::NotConfigured)?;
        let timeout = settings.worker.timeout().unwrap_or_else(|e| {
            warn!(error = %e, "invalid worker.timeout; using 30s");
            FALLBACK_TIMEOUT
        });

        Self::spawn_command(&path, &settings.worker.args, timeout).await
    }

    async fn spawn_command(path: &Path, args: &[String], timeout: Duration) -> WorkerResult<Self> {
        debug!(path = %path.display(), ?args, "spawning schema worker");

        let mut child = Command::new(path)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(WorkerError::SpawnFailed)?;

        let stdin = child
            .stdin
            .take()
            .ok_or(WorkerError::PipeUnavailable("stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or(WorkerError::PipeUnavailable("stdout"))?;

        let waiting: Waiting = Arc::default();
        let reader = tokio::spawn(read_responses(stdout, waiting.clone()));

        Ok(Self {
            stdin: Mutex::new(BufWriter::new(stdin)),
            waiting,
            reader,
            timeout,
            _child: child,
        })
    }

    /// Send one request and wait for its response.
    ///
    /// # Errors
    ///
    /// Serialization and write failures, a timeout, an error response from
    /// the worker, or a result that does not deserialize into `R`.
    pub async fn request<P, R>(&self, method: &str, params: P) -> WorkerResult<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let id = uuid::Uuid::new_v4().to_string();
        let envelope = RequestEnvelope {
            id: id.clone(),
            method: method.to_string(),
            params: serde_json::to_value(params).map_err(WorkerError::SerializeFailed)?,
        };
        let mut line = serde_json::to_string(&envelope).map_err(WorkerError::SerializeFailed)?;
        line.push('\n');

        let (tx, rx) = oneshot::channel();
        self.waiting.lock().await.insert(id.clone(), tx);

        if let Err(e) = self.write_line(&line).await {
            self.waiting.lock().await.remove(&id);
            return Err(e);
        }
        trace!(%method, %id, "worker request sent");

        let response = match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(WorkerError::ChannelClosed),
            Err(_) => {
                self.waiting.lock().await.remove(&id);
                return Err(WorkerError::Timeout(self.timeout.as_secs()));
            }
        };

        if !response.success {
            return Err(match response.error {
                Some(error) => WorkerError::from_code(&error.code, &error.message),
                None => WorkerError::remote("UNKNOWN", "worker reported failure without details"),
            });
        }

        let result = response.result.unwrap_or(serde_json::Value::Null);
        serde_json::from_value(result).map_err(WorkerError::DeserializeFailed)
    }

    async fn write_line(&self, line: &str) -> WorkerResult<()> {
        let mut stdin = self.stdin.lock().await;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(WorkerError::WriteFailed)?;
        stdin.flush().await.map_err(WorkerError::WriteFailed)
    }

    /// Tables visible to the connection, optionally in one schema only.
    pub async fn list_tables(
        &self,
        connection: &ConnectionParams,
        schema: Option<&str>,
    ) -> WorkerResult<ListTablesResponse> {
        let params = ListTablesParams {
            connection: connection.clone(),
            schema: schema.map(str::to_string),
        };
        self.request(methods::LIST_TABLES, params).await
    }

    /// Columns, primary key and foreign keys of one table.
    pub async fn get_table(
        &self,
        connection: &ConnectionParams,
        schema: &str,
        table: &str,
    ) -> WorkerResult<GetTableResponse> {
        let params = GetTableParams {
            connection: connection.clone(),
            schema: schema.to_string(),
            table: table.to_string(),
        };
        self.request(methods::GET_TABLE, params).await
    }

    /// Every foreign key in the database, grouped by declaring table.
    pub async fn get_foreign_keys(
        &self,
        connection: &ConnectionParams,
    ) -> WorkerResult<GetForeignKeysResponse> {
        let params = GetForeignKeysParams {
            connection: connection.clone(),
            schema: None,
            table: None,
        };
        self.request(methods::GET_FOREIGN_KEYS, params).await
    }
}

impl Drop for WorkerClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Route response lines to their requests until the worker's stdout closes,
/// then fail whatever is still waiting.
async fn read_responses(stdout: ChildStdout, waiting: Waiting) {
    let mut lines = BufReader::new(stdout).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => match serde_json::from_str::<ResponseEnvelope>(&line) {
                Ok(response) => {
                    if let Some(tx) = waiting.lock().await.remove(&response.id) {
                        let _ = tx.send(response);
                    } else {
                        debug!(id = %response.id, "worker response for unknown request");
                    }
                }
                Err(e) => warn!(error = %e, "unparseable worker response"),
            },
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "reading from worker failed");
                break;
            }
        }
    }

    for (id, tx) in waiting.lock().await.drain() {
        let _ = tx.send(exited(id));
    }
}

fn exited(id: String) -> ResponseEnvelope {
    ResponseEnvelope {
        id,
        success: false,
        result: None,
        error: Some(ErrorInfo {
            code: "WORKER_EXITED".to_string(),
            message: "schema worker exited".to_string(),
        }),
    }
}
