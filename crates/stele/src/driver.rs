//! Driver facade
//!
//! The surface the orchestration framework calls. The expected sequence is
//! connect → ensure → lock → retrieve/run* → unlock → disconnect; the
//! driver issues its database operations one at a time and relies on the
//! advisory lock, not in-process synchronization, for correctness across
//! concurrent runners.

use crate::config::DriverConfig;
use crate::connection::Sessions;
use crate::error::{DriverError, DriverResult};
use crate::executor;
use crate::migration::{MetadataRow, Migration};
use crate::sql::Statements;
use crate::store;

/// Migration driver for one target database.
pub struct Driver {
    config: DriverConfig,
    statements: Statements,
    sessions: Option<Sessions>,
}

impl Driver {
    /// Build a driver from configuration. Fails if the configured table
    /// name is not a plain SQL identifier.
    pub fn new(config: DriverConfig) -> DriverResult<Self> {
        config.validate()?;
        let statements = Statements::new(&config.table);
        Ok(Self {
            config,
            statements,
            sessions: None,
        })
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    fn sessions(&mut self) -> DriverResult<&mut Sessions> {
        self.sessions.as_mut().ok_or(DriverError::NotConnected)
    }

    /// Open the lock, metadata, and user sessions. The lock session begins
    /// a transaction that stays open until `disconnect`.
    pub async fn connect(&mut self) -> DriverResult<()> {
        let sessions = Sessions::open(&self.config).await?;
        // Replacing an existing connection drops it, aborting its lock
        // transaction server-side.
        self.sessions = Some(sessions);
        Ok(())
    }

    /// Commit the lock transaction and close all three sessions.
    pub async fn disconnect(&mut self) -> DriverResult<()> {
        let sessions = self.sessions.take().ok_or(DriverError::NotConnected)?;
        sessions.close(&self.config).await
    }

    /// Idempotently create the tracking tables, serializing against a
    /// concurrent first run by taking and releasing the migration lock.
    pub async fn ensure_migrations(&mut self) -> DriverResult<()> {
        let statements = self.statements.clone();
        let sessions = self.sessions()?;
        store::ensure_tables(&mut sessions.metadata, &statements).await?;
        sessions.lock.acquire(&statements).await?;
        sessions.lock.release(&statements).await
    }

    /// Destructive reset: drop the tracking tables and all audit history.
    pub async fn drop_migrations(&mut self) -> DriverResult<()> {
        let statements = self.statements.clone();
        let sessions = self.sessions()?;
        store::drop_tables(&mut sessions.metadata, &statements).await
    }

    /// Blocking acquire of the migration lock. Suspends until no other
    /// runner holds it; no timeout.
    pub async fn lock_migrations(&mut self) -> DriverResult<()> {
        let statements = self.statements.clone();
        self.sessions()?.lock.acquire(&statements).await
    }

    /// Release the migration lock. The lock transaction stays open until
    /// `disconnect`.
    pub async fn unlock_migrations(&mut self) -> DriverResult<()> {
        let statements = self.statements.clone();
        self.sessions()?.lock.release(&statements).await
    }

    /// All applied metadata rows. No ordering promise; callers needing
    /// order must sort by level.
    pub async fn get_migrations(&mut self) -> DriverResult<Vec<MetadataRow>> {
        let statements = self.statements.clone();
        let sessions = self.sessions()?;
        store::retrieve_migrations(&mut sessions.metadata, &statements).await
    }

    /// Run one migration: parse directives, honor `skip`, execute the
    /// script, and record the audit row when auditable. Errors carry the
    /// offending migration.
    pub async fn run_migration(&mut self, migration: &Migration) -> DriverResult<()> {
        let statements = self.statements.clone();
        let config = self.config.clone();
        let sessions = self.sessions()?;
        executor::run_migration(
            &mut sessions.user,
            &mut sessions.metadata,
            &statements,
            &config,
            migration,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionConfig;
    use chrono::Utc;

    #[test]
    fn rejects_invalid_table_names() {
        let config = DriverConfig {
            table: "migrations; drop table users".to_string(),
            ..Default::default()
        };
        assert!(matches!(Driver::new(config), Err(DriverError::Config { .. })));
    }

    #[tokio::test]
    async fn operations_before_connect_fail_cleanly() {
        let mut driver = Driver::new(DriverConfig::default()).expect("valid config");
        assert!(matches!(
            driver.disconnect().await,
            Err(DriverError::NotConnected)
        ));
        assert!(matches!(
            driver.ensure_migrations().await,
            Err(DriverError::NotConnected)
        ));
        assert!(matches!(
            driver.get_migrations().await,
            Err(DriverError::NotConnected)
        ));

        let migration = Migration {
            level: 1,
            comment: "test migration".to_string(),
            script: "SELECT 1".to_string(),
            timestamp: Utc::now(),
            checksum: "401f1b790bf394cf6493425c1d7e33b0".to_string(),
            namespace: None,
            audit: None,
        };
        assert!(matches!(
            driver.run_migration(&migration).await,
            Err(DriverError::NotConnected)
        ));
    }

    #[test]
    fn config_is_observable() {
        let config = DriverConfig {
            table: "app_migrations".to_string(),
            quiet: true,
            connection: ConnectionConfig::default(),
        };
        let driver = Driver::new(config).expect("valid config");
        assert_eq!(driver.config().table, "app_migrations");
        assert!(driver.config().quiet);
    }
}
