//! Minimal orchestration loop: connect, ensure, lock, run whatever is
//! pending, unlock, disconnect. A real orchestrator would discover and
//! order migrations from source files; here they are inlined.

use chrono::Utc;
use stele::{Driver, DriverConfig, Migration};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut driver = Driver::new(DriverConfig::default())?;

    let migrations = vec![
        Migration {
            level: 1,
            comment: "create the widgets table".to_string(),
            script: "CREATE TABLE widgets (id BIGINT PRIMARY KEY, name TEXT NOT NULL)".to_string(),
            timestamp: Utc::now(),
            checksum: "5d41402abc4b2a76b9719d911017c592".to_string(),
            namespace: None,
            audit: None,
        },
        Migration {
            level: 2,
            comment: "seed reference data".to_string(),
            script: "-- @stele comment = seed widgets\nINSERT INTO widgets (id, name) VALUES (1, 'anvil')".to_string(),
            timestamp: Utc::now(),
            checksum: "7d793037a0760186574b0282f2f435e7".to_string(),
            namespace: None,
            audit: None,
        },
    ];

    driver.connect().await?;
    driver.ensure_migrations().await?;
    driver.lock_migrations().await?;

    let result = apply_pending(&mut driver, &migrations).await;

    driver.unlock_migrations().await?;
    driver.disconnect().await?;
    result
}

async fn apply_pending(
    driver: &mut Driver,
    migrations: &[Migration],
) -> Result<(), Box<dyn std::error::Error>> {
    let applied = driver.get_migrations().await?;
    for migration in migrations {
        let done = applied
            .iter()
            .any(|row| row.level == migration.level && row.namespace == migration.namespace());
        if done {
            continue;
        }
        println!("applying {}: {}", migration.level, migration.comment);
        driver.run_migration(migration).await?;
    }
    Ok(())
}
