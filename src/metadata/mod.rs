//! Schema metadata access.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      SchemaSource                         │
//! │  - query_foreign_keys()        - query_linking_candidates │
//! │  - query_primary_keys(table)   - query_columns(table)     │
//! └───────────────────────────────────────────────────────────┘
//!            │                                  │
//!            ▼                                  ▼
//! ┌──────────────────────┐          ┌──────────────────────────┐
//! │   SnapshotSource     │          │   WorkerSchemaSource     │
//! │ (offline JSON file)  │          │ (NDJSON schema worker)   │
//! └──────────────────────┘          └──────────────────────────┘
//! ```

mod snapshot;
mod source;
mod types;
mod worker_source;

pub use snapshot::{SchemaSnapshot, SnapshotSource};
pub use source::{SchemaError, SchemaResult, SchemaSource};
pub use types::{
    columns_align, linking_candidates, tables_with_outward_keys, ColumnRow, ForeignKeyGroup,
    ForeignKeyRow, LinkingCandidate, TypeFamily,
};
pub use worker_source::WorkerSchemaSource;
