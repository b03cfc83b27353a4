//! Metadata store
//!
//! Owns the migrations tracking table and its lock table: ensure/create,
//! retrieve, insert, and drop. Table creation tolerates the concurrent
//! first-run race: PostgreSQL can raise a duplicate-object error when two
//! processes issue `CREATE TABLE IF NOT EXISTS` at the same moment, so the
//! first such failure is treated as "already created by a peer" and retried
//! once after 100 ms.

use std::time::Duration;

use sqlx::{Executor, PgConnection, Row};
use tracing::debug;

use crate::error::{DriverError, DriverResult};
use crate::migration::MetadataRow;
use crate::sql::Statements;

/// SQLSTATE 23505 is unique_violation (raised by the catalog's own unique
/// index during a creation race), 42P07 is duplicate_table.
fn is_duplicate_object(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == "23505" || code == "42P07")
        .unwrap_or(false)
}

/// Idempotently create the migrations table and its lock table.
pub(crate) async fn ensure_tables(
    conn: &mut PgConnection,
    statements: &Statements,
) -> DriverResult<()> {
    debug!("ensuring migration tables");
    match conn.execute(statements.ensure_tables.as_str()).await {
        Ok(_) => Ok(()),
        Err(err) if is_duplicate_object(&err) => {
            debug!("possible race condition when creating migration tables, retrying");
            tokio::time::sleep(Duration::from_millis(100)).await;
            conn.execute(statements.ensure_tables.as_str())
                .await
                .map_err(DriverError::TableCreation)?;
            Ok(())
        }
        Err(err) => Err(DriverError::TableCreation(err)),
    }
}

/// All applied metadata rows, in whatever order the engine returns them.
pub(crate) async fn retrieve_migrations(
    conn: &mut PgConnection,
    statements: &Statements,
) -> DriverResult<Vec<MetadataRow>> {
    let rows = sqlx::query(&statements.retrieve_migrations)
        .fetch_all(conn)
        .await
        .map_err(DriverError::Retrieval)?;

    let mut migrations = Vec::with_capacity(rows.len());
    for row in rows {
        migrations.push(MetadataRow {
            level: row.try_get("level").map_err(DriverError::Retrieval)?,
            timestamp: row.try_get("timestamp").map_err(DriverError::Retrieval)?,
            comment: row.try_get("comment").map_err(DriverError::Retrieval)?,
            checksum: row.try_get("checksum").map_err(DriverError::Retrieval)?,
            namespace: row.try_get("namespace").map_err(DriverError::Retrieval)?,
        });
    }
    Ok(migrations)
}

/// Append one audit row. The caller decorates failures with the migration.
pub(crate) async fn insert_migration(
    conn: &mut PgConnection,
    statements: &Statements,
    row: &MetadataRow,
) -> Result<(), sqlx::Error> {
    sqlx::query(&statements.insert_migration)
        .bind(row.level)
        .bind(row.timestamp)
        .bind(&row.comment)
        .bind(&row.checksum)
        .bind(&row.namespace)
        .execute(conn)
        .await?;
    Ok(())
}

/// Destructive reset: drops both tables. No guard.
pub(crate) async fn drop_tables(
    conn: &mut PgConnection,
    statements: &Statements,
) -> DriverResult<()> {
    debug!("dropping migration tables");
    conn.execute(statements.drop_tables.as_str())
        .await
        .map_err(DriverError::TableDrop)?;
    Ok(())
}
