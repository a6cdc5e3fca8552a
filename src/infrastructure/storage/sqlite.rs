//! SQLite connection pooling

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::domain::DomainError;

/// SQLite storage configuration
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database URL, e.g. `sqlite://data/apikeys.db` or `sqlite::memory:`
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://apikeys.db".to_string(),
            max_connections: 5,
            connect_timeout_secs: 30,
        }
    }
}

impl SqliteConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    fn is_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

/// Open a connection pool, creating the database file if missing
pub async fn connect(config: &SqliteConfig) -> Result<SqlitePool, DomainError> {
    let mut options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| DomainError::configuration(format!("Invalid database URL: {}", e)))?
        .create_if_missing(true);

    // Every in-memory connection is its own database, so the pool is pinned to one
    let max_connections = if config.is_memory() {
        1
    } else {
        options = options.journal_mode(SqliteJournalMode::Wal);
        config.max_connections
    };

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect_with(options)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to connect to SQLite: {}", e)))
}

/// Check that the pool can serve a query
pub async fn health_check(pool: &SqlitePool) -> Result<(), DomainError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(|e| DomainError::storage(format!("Health check failed: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = SqliteConfig::new("sqlite://keys.db")
            .with_max_connections(8)
            .with_connect_timeout(5);

        assert_eq!(config.url, "sqlite://keys.db");
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.connect_timeout_secs, 5);
        assert!(!config.is_memory());
        assert!(SqliteConfig::new("sqlite::memory:").is_memory());
    }

    #[tokio::test]
    async fn test_connect_memory() {
        let pool = connect(&SqliteConfig::new("sqlite::memory:")).await.unwrap();
        health_check(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apikeys.db");
        let url = format!("sqlite://{}", path.display());

        let pool = connect(&SqliteConfig::new(url)).await.unwrap();
        health_check(&pool).await.unwrap();
        assert!(path.exists());
    }
}
