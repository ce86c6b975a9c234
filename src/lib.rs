//! # dabrel
//!
//! Relationship discovery and configuration reconciliation for a data-access
//! gateway's JSON configuration.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │          SchemaSource (snapshot file | worker)          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [discovery]
//! ┌─────────────────────────────────────────────────────────┐
//! │   DiscoveredRelationship (direct FKs + linking tables)  │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [reconcile]  ◀── EntityCatalog [gateway]
//! ┌─────────────────────────────────────────────────────────┐
//! │   ReconciledRelationship (both ends configured, new)    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [prompt]     ◀── LinkingTableWizard [wizard]
//! ┌─────────────────────────────────────────────────────────┐
//! │   UpdateRelationship ──▶ gateway CLI [emit]             │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! [`session`] runs the whole flow for one command.

pub mod config;
pub mod discovery;
pub mod emit;
pub mod gateway;
pub mod metadata;
pub mod naming;
pub mod prompt;
pub mod reconcile;
pub mod session;
pub mod wizard;
pub mod worker;

pub use discovery::{Cardinality, DiscoveredRelationship};
pub use gateway::{ConfigError, EntityCatalog};
pub use naming::SchemaObjectName;
pub use reconcile::{reconcile, ReconciledRelationship};
pub use session::{AddOptions, Outcome, Session, SessionError};
