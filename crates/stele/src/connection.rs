//! Session management
//!
//! Three independent sessions against the same database, each with its own
//! role: the lock session holds the run-spanning transaction and the
//! advisory lock, the metadata session manages the tracking tables and
//! audit writes, and the user session executes migration scripts. They are
//! peers; none owns another, and the driver never uses two of them
//! concurrently.

use sqlx::{Connection, PgConnection};
use tracing::debug;

use crate::config::DriverConfig;
use crate::error::{DriverError, DriverResult};
use crate::lock::LockSession;

pub(crate) struct Sessions {
    pub lock: LockSession,
    pub metadata: PgConnection,
    pub user: PgConnection,
}

impl Sessions {
    /// Open the three sessions in order: lock (with its transaction),
    /// metadata, user. If a later step fails the earlier sessions are
    /// dropped, which closes them and aborts the lock transaction.
    pub async fn open(config: &DriverConfig) -> DriverResult<Self> {
        debug!("connecting to {}", config.connection.loggable_url());
        let options = config.connection.connect_options();
        let lock = LockSession::open(&options)
            .await
            .map_err(DriverError::Connection)?;
        let metadata = PgConnection::connect_with(&options)
            .await
            .map_err(DriverError::Connection)?;
        let user = PgConnection::connect_with(&options)
            .await
            .map_err(DriverError::Connection)?;
        Ok(Self { lock, metadata, user })
    }

    /// Commit the lock transaction, then close all three sessions in
    /// sequence. The first failure is reported; no partial cleanup beyond
    /// what has already been issued.
    pub async fn close(self, config: &DriverConfig) -> DriverResult<()> {
        debug!("disconnecting from {}", config.connection.loggable_url());
        self.lock.commit().await.map_err(DriverError::Disconnection)?;
        self.metadata
            .close()
            .await
            .map_err(DriverError::Disconnection)?;
        self.user.close().await.map_err(DriverError::Disconnection)?;
        Ok(())
    }
}
