//! Emission error types.

use std::io;

use thiserror::Error;

/// Result type for relationship emission.
pub type EmitResult<T> = Result<T, EmitError>;

/// Errors raised while building or applying a relationship update.
#[derive(Debug, Error)]
pub enum EmitError {
    /// Source and target field lists cannot be zipped.
    #[error("relationship has {source_count} source fields but {target_count} target fields")]
    FieldCountMismatch {
        source_count: usize,
        target_count: usize,
    },

    /// A relationship needs at least one field pair.
    #[error("relationship has no fields")]
    NoFields,

    /// The gateway CLI could not be started.
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The gateway CLI ran and reported failure.
    #[error("`{command}` failed ({}): {stderr}", describe_status(.status))]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}
