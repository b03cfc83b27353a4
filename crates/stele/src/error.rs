//! Error types for the migration driver
//!
//! Every database failure is surfaced to the caller; execution and audit
//! failures are enriched with the offending migration before propagation.

use thiserror::Error;

use crate::migration::Migration;

/// Result type alias for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Error types for driver operations
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to connect: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("failed to disconnect: {0}")]
    Disconnection(#[source] sqlx::Error),

    #[error("failed to lock migrations: {0}")]
    Lock(#[source] sqlx::Error),

    #[error("failed to unlock migrations: {0}")]
    Unlock(#[source] sqlx::Error),

    #[error("failed to create migration tables: {0}")]
    TableCreation(#[source] sqlx::Error),

    #[error("failed to drop migration tables: {0}")]
    TableDrop(#[source] sqlx::Error),

    #[error("failed to retrieve migrations: {0}")]
    Retrieval(#[source] sqlx::Error),

    /// The migration script ran but its audit row could not be written. An
    /// unrecorded successful migration is never silently accepted.
    #[error("failed to audit migration {} ({}): {}", .migration.level, .migration.namespace(), .source)]
    Insert {
        migration: Box<Migration>,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to run migration {} ({}): {}", .migration.level, .migration.namespace(), .source)]
    Execution {
        migration: Box<Migration>,
        #[source]
        source: sqlx::Error,
    },

    #[error("not connected - call connect() first")]
    NotConnected,

    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl DriverError {
    /// The migration attached to an execution or audit failure, if any.
    pub fn migration(&self) -> Option<&Migration> {
        match self {
            DriverError::Insert { migration, .. } | DriverError::Execution { migration, .. } => {
                Some(migration)
            }
            _ => None,
        }
    }
}
