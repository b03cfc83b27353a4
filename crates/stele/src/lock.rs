//! Lock session
//!
//! One dedicated connection serializes migration runs across processes. Its
//! transaction is begun at construction and committed at disconnect, so it
//! spans the whole run; the advisory lock is acquired and released inside
//! it. If the session dies before `commit`, the server aborts the
//! transaction and releases the lock, so a crashed runner never strands its
//! peers. Acquisition blocks indefinitely; the database's lock wait
//! semantics apply.

use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, Executor, PgConnection};
use tracing::debug;

use crate::error::{DriverError, DriverResult};
use crate::sql::Statements;

/// The lock connection and its run-spanning transaction.
///
/// Dropping a `LockSession` closes the connection, which aborts the open
/// transaction and releases any advisory lock it holds.
pub(crate) struct LockSession {
    conn: PgConnection,
}

impl LockSession {
    /// Open the session and begin its transaction.
    pub async fn open(options: &PgConnectOptions) -> Result<Self, sqlx::Error> {
        let mut conn = PgConnection::connect_with(options).await?;
        conn.execute("BEGIN").await?;
        Ok(Self { conn })
    }

    /// Blocking acquire; suspends until the lock is obtainable.
    pub async fn acquire(&mut self, statements: &Statements) -> DriverResult<()> {
        debug!("locking migrations lock table");
        self.conn
            .execute(statements.acquire_lock.as_str())
            .await
            .map_err(DriverError::Lock)?;
        Ok(())
    }

    /// Logical release; the transaction stays open until `commit`.
    pub async fn release(&mut self, statements: &Statements) -> DriverResult<()> {
        debug!("unlocking migrations lock table");
        self.conn
            .execute(statements.release_lock.as_str())
            .await
            .map_err(DriverError::Unlock)?;
        Ok(())
    }

    /// Commit the run-spanning transaction and close the session.
    pub async fn commit(mut self) -> Result<(), sqlx::Error> {
        self.conn.execute("COMMIT").await?;
        self.conn.close().await
    }
}
