//! # stele: PostgreSQL migration driver
//!
//! A driver that plugs into a migration-orchestration framework and
//! executes pre-authored migration scripts against a PostgreSQL database,
//! tracking which migrations have run. The orchestrator discovers and
//! orders migrations; this crate owns the execution and locking protocol:
//!
//! 1. `connect`: three sessions (lock, metadata, user); the lock session
//!    begins a transaction spanning the whole run.
//! 2. `ensure_migrations`: create the tracking tables, racing-safe.
//! 3. `lock_migrations`: blocking advisory acquire; at most one runner
//!    proceeds at a time across all processes.
//! 4. `get_migrations` / `run_migration`: the orchestrator decides what is
//!    pending and runs each migration in order.
//! 5. `unlock_migrations`, `disconnect`.
//!
//! Scripts can embed directives as comments (`-- @stele skip = true`,
//! `-- @stele audit = false`, `-- @stele comment = ...`) to alter how a
//! single migration is treated.

pub mod config;
pub mod directives;
pub mod driver;
pub mod error;
pub mod migration;

mod connection;
mod executor;
mod lock;
mod sql;
mod store;

pub use config::{ConnectionConfig, DriverConfig};
pub use directives::{DirectiveSet, SUPPORTED_DIRECTIVES};
pub use driver::Driver;
pub use error::{DriverError, DriverResult};
pub use migration::{is_auditable, AuditSource, MetadataRow, Migration, DEFAULT_NAMESPACE};
