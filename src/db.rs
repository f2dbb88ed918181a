//! SQLite connection pool and schema setup.

use crate::config::AppConfig;
use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Open the pool described by `config` and apply the embedded migrations.
///
/// An in-memory database lives as long as its connection, so it gets a
/// single connection that is never recycled.
///
/// # Errors
///
/// Returns `Error::Database` if the URL is invalid or the database cannot be
/// opened, `Error::Migration` if the schema cannot be applied.
pub async fn connect(config: &AppConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = if is_in_memory(&config.database_url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect_with(options)
            .await?
    };

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Connected to {} and applied migrations", config.database_url);
    Ok(pool)
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_in_memory() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://school?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite://school.db"));
    }

    #[tokio::test]
    async fn test_connect_applies_schema() {
        let pool = connect(&AppConfig::for_tests()).await.unwrap();
        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('professeur', 'eleve', 'classe')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(tables, 3);
    }
}
