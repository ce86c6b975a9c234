//! Schema worker communication.
//!
//! The worker is a long-running child process that owns the database
//! drivers and answers metadata requests. This crate never links a database
//! driver itself; it only speaks to the worker.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │           WorkerClient (async)           │
//! │  - spawns the worker as a child process  │
//! │  - NDJSON over stdin/stdout              │
//! │  - request ids for correlation           │
//! └──────────────────────────────────────────┘
//!                     │
//!      stdin (NDJSON) │ stdout (NDJSON)
//!                     ▼
//! ┌──────────────────────────────────────────┐
//! │          schema worker process           │
//! └──────────────────────────────────────────┘
//! ```

mod client;
mod error;
pub mod protocol;

pub use client::WorkerClient;
pub use error::{WorkerError, WorkerResult};
