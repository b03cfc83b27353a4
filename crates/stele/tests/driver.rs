//! Driver integration tests
//!
//! These exercise the full locking and audit protocol against a live
//! PostgreSQL instance, so they are ignored by default. Point them at a
//! database with STELE_TEST_HOST / STELE_TEST_PORT / STELE_TEST_DATABASE /
//! STELE_TEST_USER / STELE_TEST_PASSWORD and run with
//! `cargo test -- --ignored`.

use std::collections::HashSet;
use std::env;
use std::time::Duration;

use chrono::Utc;
use stele::{ConnectionConfig, Driver, DriverConfig, DriverError, Migration};

fn test_config(table: &str) -> DriverConfig {
    let connection = ConnectionConfig {
        host: env::var("STELE_TEST_HOST").unwrap_or_else(|_| "localhost".to_string()),
        port: env::var("STELE_TEST_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5432),
        database: env::var("STELE_TEST_DATABASE").unwrap_or_else(|_| "postgres".to_string()),
        user: env::var("STELE_TEST_USER").unwrap_or_else(|_| "postgres".to_string()),
        password: env::var("STELE_TEST_PASSWORD").unwrap_or_default(),
    };
    DriverConfig {
        table: table.to_string(),
        quiet: false,
        connection,
    }
}

/// Fresh driver with empty tracking tables for the given table name.
async fn fresh_driver(table: &str) -> Driver {
    let mut driver = Driver::new(test_config(table)).expect("valid config");
    driver.connect().await.expect("connect");
    driver.drop_migrations().await.expect("drop leftovers");
    driver.ensure_migrations().await.expect("ensure");
    driver
}

fn migration(level: i64, script: &str) -> Migration {
    Migration {
        level,
        comment: "test migration".to_string(),
        script: script.to_string(),
        timestamp: Utc::now(),
        checksum: "401f1b790bf394cf6493425c1d7e33b0".to_string(),
        namespace: None,
        audit: None,
    }
}

#[tokio::test]
#[ignore] // Needs a live PostgreSQL
async fn successful_migration_writes_one_audit_row() {
    let mut driver = fresh_driver("stele_test_audit_default").await;

    driver
        .run_migration(&migration(1, "SELECT 1"))
        .await
        .expect("run");

    let rows = driver.get_migrations().await.expect("retrieve");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].level, 1);
    assert_eq!(rows[0].comment, "test migration");
    assert_eq!(rows[0].checksum, "401f1b790bf394cf6493425c1d7e33b0");
    assert_eq!(rows[0].namespace, "default");

    driver.disconnect().await.expect("disconnect");
}

#[tokio::test]
#[ignore] // Needs a live PostgreSQL
async fn skip_directive_never_executes_the_script() {
    let mut driver = fresh_driver("stele_test_skip").await;

    // The script body is not even valid SQL; skip must win before execution.
    let skipped = migration(4, "-- @stele foo = bar\n-- @stele SKIP   = true\nINVALID");
    driver.run_migration(&skipped).await.expect("skipped run succeeds");

    let rows = driver.get_migrations().await.expect("retrieve");
    assert!(rows.is_empty(), "skipped migrations are not audited");

    driver.disconnect().await.expect("disconnect");
}

#[tokio::test]
#[ignore] // Needs a live PostgreSQL
async fn audit_false_executes_without_a_row() {
    let mut driver = fresh_driver("stele_test_audit_false").await;

    let unaudited = migration(
        3,
        "-- @stele AUDIT   = false\nCREATE TABLE stele_test_audit_false_proof (id INTEGER)",
    );
    driver.run_migration(&unaudited).await.expect("run");

    let rows = driver.get_migrations().await.expect("retrieve");
    assert!(rows.is_empty(), "audit = false suppresses the metadata row");

    // The script itself did run.
    let proof = migration(99, "DROP TABLE stele_test_audit_false_proof");
    driver.run_migration(&proof).await.expect("proof table exists");

    driver.drop_migrations().await.expect("cleanup");
    driver.disconnect().await.expect("disconnect");
}

#[tokio::test]
#[ignore] // Needs a live PostgreSQL
async fn comment_directive_overrides_the_audit_comment() {
    let mut driver = fresh_driver("stele_test_comment").await;

    let mut overridden = migration(2, "-- @stele foo = bar\n-- @stele COMMENT = override\nSELECT 1");
    overridden.comment = "do not use".to_string();
    driver.run_migration(&overridden).await.expect("run");

    let rows = driver.get_migrations().await.expect("retrieve");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].comment, "override");

    driver.disconnect().await.expect("disconnect");
}

#[tokio::test]
#[ignore] // Needs a live PostgreSQL
async fn namespace_is_recorded() {
    let mut driver = fresh_driver("stele_test_namespace").await;

    let mut namespaced = migration(1, "SELECT 1");
    namespaced.namespace = Some("so-special".to_string());
    driver.run_migration(&namespaced).await.expect("run");

    let rows = driver.get_migrations().await.expect("retrieve");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].namespace, "so-special");

    driver.disconnect().await.expect("disconnect");
}

#[tokio::test]
#[ignore] // Needs a live PostgreSQL
async fn concurrent_ensure_on_a_fresh_database_succeeds() {
    let table = "stele_test_ensure_race";

    // Start from nothing.
    let mut cleaner = Driver::new(test_config(table)).expect("valid config");
    cleaner.connect().await.expect("connect");
    cleaner.drop_migrations().await.expect("drop");
    cleaner.disconnect().await.expect("disconnect");

    let mut a = Driver::new(test_config(table)).expect("valid config");
    let mut b = Driver::new(test_config(table)).expect("valid config");
    a.connect().await.expect("connect a");
    b.connect().await.expect("connect b");

    let (ra, rb) = tokio::join!(a.ensure_migrations(), b.ensure_migrations());
    ra.expect("ensure a");
    rb.expect("ensure b");

    a.disconnect().await.expect("disconnect a");
    b.disconnect().await.expect("disconnect b");
}

#[tokio::test]
#[ignore] // Needs a live PostgreSQL
async fn lock_blocks_a_second_runner_until_released() {
    let table = "stele_test_lock_blocking";
    let mut a = fresh_driver(table).await;
    let mut b = Driver::new(test_config(table)).expect("valid config");
    b.connect().await.expect("connect b");

    a.lock_migrations().await.expect("lock a");

    let waiter = tokio::spawn(async move {
        b.lock_migrations().await.expect("lock b");
        b.unlock_migrations().await.expect("unlock b");
        b.disconnect().await.expect("disconnect b");
    });

    // B must still be waiting while A holds the lock.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!waiter.is_finished(), "second runner acquired a held lock");

    a.unlock_migrations().await.expect("unlock a");
    tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("second runner never acquired the released lock")
        .expect("waiter task");

    a.disconnect().await.expect("disconnect a");
}

#[tokio::test]
#[ignore] // Needs a live PostgreSQL
async fn failing_script_reports_the_migration_and_writes_nothing() {
    let mut driver = fresh_driver("stele_test_failure").await;

    let failing = migration(5, "INVALID");
    let err = driver
        .run_migration(&failing)
        .await
        .expect_err("invalid script must fail");

    match &err {
        DriverError::Execution { migration, .. } => {
            assert_eq!(migration.level, 5);
            assert_eq!(migration.checksum, "401f1b790bf394cf6493425c1d7e33b0");
        }
        other => panic!("expected Execution error, got {other:?}"),
    }
    assert_eq!(err.migration().map(|m| m.level), Some(5));

    let rows = driver.get_migrations().await.expect("retrieve");
    assert!(rows.is_empty(), "failed migrations are not audited");

    driver.disconnect().await.expect("disconnect");
}

#[tokio::test]
#[ignore] // Needs a live PostgreSQL
async fn retrieval_returns_all_rows_regardless_of_order() {
    let mut driver = fresh_driver("stele_test_retrieval").await;

    for level in [1, 3, 2] {
        driver
            .run_migration(&migration(level, "SELECT 1"))
            .await
            .expect("run");
    }

    let rows = driver.get_migrations().await.expect("retrieve");
    let levels: HashSet<i64> = rows.iter().map(|r| r.level).collect();
    assert_eq!(levels, HashSet::from([1, 2, 3]));

    driver.disconnect().await.expect("disconnect");
}

#[tokio::test]
#[ignore] // Needs a live PostgreSQL
async fn drop_then_ensure_yields_an_empty_set() {
    let mut driver = fresh_driver("stele_test_reset").await;

    driver
        .run_migration(&migration(1, "SELECT 1"))
        .await
        .expect("run");
    assert_eq!(driver.get_migrations().await.expect("retrieve").len(), 1);

    driver.drop_migrations().await.expect("drop");
    driver.ensure_migrations().await.expect("ensure");

    let rows = driver.get_migrations().await.expect("retrieve");
    assert!(rows.is_empty());

    driver.disconnect().await.expect("disconnect");
}
