//! Errors talking to the schema worker.

use std::io;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("schema worker not configured; set worker.path in dabrel.toml or pass --schema")]
    NotConfigured,

    #[error("could not start the schema worker: {0}")]
    SpawnFailed(#[source] io::Error),

    /// A standard stream of the child was not captured.
    #[error("worker {0} was not captured")]
    PipeUnavailable(&'static str),

    #[error("could not send request to the schema worker: {0}")]
    WriteFailed(#[source] io::Error),

    #[error("could not encode worker request: {0}")]
    SerializeFailed(#[source] serde_json::Error),

    /// The response arrived but its `result` has an unexpected shape.
    #[error("unexpected worker response: {0}")]
    DeserializeFailed(#[source] serde_json::Error),

    #[error("no response from the schema worker within {0}s")]
    Timeout(u64),

    #[error("schema worker exited")]
    WorkerExited,

    /// The reader task dropped the sender without answering.
    #[error("worker response was lost")]
    ChannelClosed,

    /// Any error code without a dedicated variant.
    #[error("schema worker failed with {code}: {message}")]
    Remote { code: String, message: String },

    #[error("no database driver for '{0}'")]
    DriverNotFound(String),

    #[error("cannot connect to the database: {0}")]
    ConnectionFailed(String),

    #[error("worker rejected the request: {0}")]
    InvalidRequest(String),

    #[error("worker does not support {0}")]
    MethodNotFound(String),
}

impl WorkerError {
    /// Map an error response's code to a variant.
    pub fn from_code(code: &str, message: &str) -> Self {
        match code {
            "DRIVER_NOT_FOUND" => Self::DriverNotFound(message.to_string()),
            "CONNECTION_FAILED" => Self::ConnectionFailed(message.to_string()),
            "INVALID_REQUEST" => Self::InvalidRequest(message.to_string()),
            "METHOD_NOT_FOUND" => Self::MethodNotFound(message.to_string()),
            "WORKER_EXITED" => Self::WorkerExited,
            _ => Self::remote(code, message),
        }
    }

    pub fn remote(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            code: code.into(),
            message: message.into(),
        }
    }
}
