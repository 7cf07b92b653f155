//! Database module - SQLite connection and schema

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// Create database connection pool
///
/// WAL lets the report and sync jobs read while the decoy keeps appending;
/// the busy timeout serializes concurrent writers instead of failing them.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
///
/// `ts` is fixed-width RFC 3339 UTC text, so string order is time order.
const SCHEMA_SQL: &str = r#"
-- Credential submissions to the login check
CREATE TABLE IF NOT EXISTS honeypot_creds (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user TEXT NOT NULL,
    password TEXT NOT NULL,
    ip TEXT NOT NULL,
    ts TEXT NOT NULL
);

-- Requests for paths the portal does not serve
CREATE TABLE IF NOT EXISTS symlink_exploits (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ip TEXT NOT NULL,
    path TEXT NOT NULL,
    ts TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_creds_ts ON honeypot_creds(ts);
CREATE INDEX IF NOT EXISTS idx_creds_ip ON honeypot_creds(ip, ts);
CREATE INDEX IF NOT EXISTS idx_exploits_ts ON symlink_exploits(ts);
"#;


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let (pool, _dir) = testing::temp_pool().await;
        run_migrations(&pool).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        let names: Vec<_> = tables.into_iter().map(|(n,)| n).collect();
        assert_eq!(names, vec!["honeypot_creds", "symlink_exploits"]);
    }
}
