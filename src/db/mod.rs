pub mod credentials;
pub mod dependencies;
pub mod events;
pub mod models;
pub mod tasks;
pub mod tokens;
pub mod users;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

/// Open the SQLite pool (WAL, foreign keys on) and bring the schema up to date.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

const MIGRATIONS: &[(&str, &str)] = &[("001_initial", include_str!("../../migrations/001_initial.sql"))];

/// Apply every migration in order. Statements use `IF NOT EXISTS`, so
/// re-running is harmless.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for (name, sql) in MIGRATIONS {
        let mut applied = 0usize;
        // A plain query only executes its first statement.
        for statement in sql.split(';').map(str::trim).filter(|s| has_sql(s)) {
            sqlx::query(statement).execute(pool).await?;
            applied += 1;
        }
        tracing::debug!(migration = *name, statements = applied, "migration applied");
    }
    Ok(())
}

/// Whether a split segment holds anything besides blank lines and `--` comments.
fn has_sql(segment: &str) -> bool {
    segment.lines().any(|line| {
        let l = line.trim();
        !l.is_empty() && !l.starts_with("--")
    })
}

/// Create an in-memory pool for testing.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test pool");

    // Enable foreign keys for in-memory DB
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .expect("Failed to enable foreign keys");

    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_pool_with_memory_url_succeeds() {
        // WAL is not available for :memory: and is silently skipped.
        let pool = init_pool("sqlite::memory:")
            .await
            .expect("init_pool should succeed");

        // Verify tables exist
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .expect("users table should exist");
        assert_eq!(row.0, 0);
    }

    #[tokio::test]
    async fn test_test_pool_enforces_foreign_keys() {
        let pool = test_pool().await;

        let result = sqlx::query(
            "INSERT INTO api_tokens (id, user_id, token_hash, name) VALUES ('t', 'nobody', 'h', 'n')",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err(), "token for a missing user should be rejected");
    }

    #[test]
    fn test_comment_only_segments_are_skipped() {
        assert!(!has_sql("  -- just a note\n\n"));
        assert!(has_sql("-- header\nCREATE TABLE x (id TEXT)"));
    }

    #[tokio::test]
    async fn test_test_pool_has_all_tables() {
        let pool = test_pool().await;

        for table in &[
            "users",
            "api_tokens",
            "calendar_events",
            "tasks",
            "task_dependencies",
        ] {
            let query = format!("SELECT COUNT(*) FROM {table}");
            let row: (i64,) = sqlx::query_as(&query)
                .fetch_one(&pool)
                .await
                .unwrap_or_else(|_| panic!("Table {table} should exist"));
            assert_eq!(row.0, 0, "Table {table} should be empty initially");
        }
    }

    #[tokio::test]
    async fn test_run_migrations_idempotent() {
        let pool = test_pool().await;

        // Running migrations a second time on existing tables should not fail
        // (CREATE TABLE IF NOT EXISTS)
        let result = run_migrations(&pool).await;
        assert!(result.is_ok(), "Re-running migrations should succeed");
    }
}
