//! Migration executor
//!
//! Runs one migration through its state machine: parse directives, honor
//! `skip`, execute the script on the user session, then write the audit row
//! on the metadata session when the migration is auditable. An audit-write
//! failure is a migration failure even though the script succeeded, so an
//! unrecorded migration is never silently accepted.

use sqlx::{Executor, PgConnection};
use tracing::{debug, warn};

use crate::config::DriverConfig;
use crate::directives::{DirectiveSet, SUPPORTED_DIRECTIVES};
use crate::error::{DriverError, DriverResult};
use crate::migration::{is_auditable, MetadataRow, Migration};
use crate::sql::Statements;
use crate::store;

pub(crate) async fn run_migration(
    user: &mut PgConnection,
    metadata: &mut PgConnection,
    statements: &Statements,
    config: &DriverConfig,
    migration: &Migration,
) -> DriverResult<()> {
    let directives = DirectiveSet::parse(&migration.script);
    check_directives(&directives, config);

    if directives.skip {
        debug!(
            "skipping migration {}: {}\n{}",
            migration.level, migration.comment, migration.script
        );
        return Ok(());
    }

    debug!(
        "running migration {}: {}\n{}",
        migration.level, migration.comment, migration.script
    );
    user.execute(migration.script.as_str())
        .await
        .map_err(|source| DriverError::Execution {
            migration: Box::new(migration.clone()),
            source,
        })?;

    if is_auditable(migration, &directives, config.quiet) {
        let row = MetadataRow {
            level: migration.level,
            timestamp: migration.timestamp,
            comment: directives
                .comment
                .clone()
                .unwrap_or_else(|| migration.comment.clone()),
            checksum: migration.checksum.clone(),
            namespace: migration.namespace().to_string(),
        };
        store::insert_migration(metadata, statements, &row)
            .await
            .map_err(|source| DriverError::Insert {
                migration: Box::new(migration.clone()),
                source,
            })?;
    }

    Ok(())
}

fn check_directives(directives: &DirectiveSet, config: &DriverConfig) {
    if directives.unsupported.is_empty() || config.quiet {
        return;
    }
    warn!(
        "ignoring unsupported directives: {}. Supported directives are: {}",
        directives.unsupported.join(", "),
        SUPPORTED_DIRECTIVES.join(", ")
    );
}
