//! Statement catalog
//!
//! All SQL issued by the driver, templated with the configured table name.
//! Substitution happens once, when the driver is constructed; the rest of
//! the code only sees finished statement text. The advisory lock key is
//! derived server-side from the lock table name with `hashtext`, so every
//! process pointed at the same table coordinates on the same lock.

const ENSURE_TABLES: &str = r#"CREATE TABLE IF NOT EXISTS {table} (
    level BIGINT NOT NULL,
    "timestamp" TIMESTAMP WITH TIME ZONE NOT NULL,
    comment TEXT NOT NULL,
    checksum TEXT NOT NULL,
    namespace TEXT NOT NULL DEFAULT 'default',
    PRIMARY KEY (level, namespace)
);
CREATE TABLE IF NOT EXISTS {lock_table} (
    index INTEGER PRIMARY KEY
);"#;

const RETRIEVE_MIGRATIONS: &str =
    r#"SELECT level, "timestamp", comment, checksum, namespace FROM {table}"#;

const DROP_TABLES: &str = "DROP TABLE IF EXISTS {table};\nDROP TABLE IF EXISTS {lock_table};";

const ACQUIRE_LOCK: &str = "SELECT pg_advisory_lock(hashtext('{lock_table}'))";

const RELEASE_LOCK: &str = "SELECT pg_advisory_unlock(hashtext('{lock_table}'))";

const INSERT_MIGRATION: &str = r#"INSERT INTO {table} (level, "timestamp", comment, checksum, namespace) VALUES ($1, $2, $3, $4, $5)"#;

/// Finished SQL for one configured table name.
#[derive(Debug, Clone)]
pub(crate) struct Statements {
    pub ensure_tables: String,
    pub retrieve_migrations: String,
    pub drop_tables: String,
    pub acquire_lock: String,
    pub release_lock: String,
    pub insert_migration: String,
}

impl Statements {
    pub fn new(table: &str) -> Self {
        let lock_table = format!("{table}_lock");
        let render = |template: &str| {
            template
                .replace("{table}", table)
                .replace("{lock_table}", &lock_table)
        };
        Self {
            ensure_tables: render(ENSURE_TABLES),
            retrieve_migrations: render(RETRIEVE_MIGRATIONS),
            drop_tables: render(DROP_TABLES),
            acquire_lock: render(ACQUIRE_LOCK),
            release_lock: render(RELEASE_LOCK),
            insert_migration: render(INSERT_MIGRATION),
        }
    }
}
