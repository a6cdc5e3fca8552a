//! SQLite-backed credential store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use crate::domain::api_key::{ApiKey, ApiKeyRepository, ApiKeyValue};
use crate::domain::DomainError;

const SELECT_COLUMNS: &str = "SELECT id, key, deadline, details, created_at, updated_at FROM api_keys";

/// ApiKeyRepository over the `api_keys` table
#[derive(Debug, Clone)]
pub struct SqliteApiKeyRepository {
    pool: SqlitePool,
}

impl SqliteApiKeyRepository {
    /// Create a repository over a migrated pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_row(row: &SqliteRow) -> Result<ApiKey, DomainError> {
        let id: i64 = row.try_get("id").map_err(column_error)?;
        let key: String = row.try_get("key").map_err(column_error)?;
        let deadline: DateTime<Utc> = row.try_get("deadline").map_err(column_error)?;
        let details: String = row.try_get("details").map_err(column_error)?;
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(column_error)?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(column_error)?;

        let key = ApiKeyValue::new(key)
            .map_err(|e| DomainError::storage(format!("Stored API key {} is invalid: {}", id, e)))?;

        Ok(ApiKey::from_parts(
            id, key, deadline, details, created_at, updated_at,
        ))
    }
}

fn column_error(e: sqlx::Error) -> DomainError {
    DomainError::storage(format!("Failed to read API key row: {}", e))
}

fn query_error(action: &str, e: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return DomainError::conflict("API key already exists");
        }
    }
    DomainError::storage(format!("Failed to {} API key: {}", action, e))
}

#[async_trait]
impl ApiKeyRepository for SqliteApiKeyRepository {
    async fn find_by_key(&self, key: &ApiKeyValue) -> Result<Option<ApiKey>, DomainError> {
        let row = sqlx::query(&format!("{} WHERE key = ?", SELECT_COLUMNS))
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_error("fetch", e))?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn create(&self, api_key: ApiKey) -> Result<ApiKey, DomainError> {
        let result = sqlx::query(
            "INSERT INTO api_keys (key, deadline, details, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(api_key.key().as_str())
        .bind(api_key.deadline())
        .bind(api_key.details())
        .bind(api_key.created_at())
        .bind(api_key.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| query_error("create", e))?;

        Ok(api_key.with_id(result.last_insert_rowid()))
    }

    async fn update(&self, api_key: &ApiKey) -> Result<ApiKey, DomainError> {
        let result = sqlx::query(
            "UPDATE api_keys SET deadline = ?, details = ?, updated_at = ? WHERE key = ?",
        )
        .bind(api_key.deadline())
        .bind(api_key.details())
        .bind(api_key.updated_at())
        .bind(api_key.key().as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| query_error("update", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "API key '{}' not found",
                api_key.key().prefix()
            )));
        }

        Ok(api_key.clone())
    }

    async fn delete_by_key(&self, key: &ApiKeyValue) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM api_keys WHERE key = ?")
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| query_error("delete", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<ApiKey>, DomainError> {
        let rows = sqlx::query(&format!("{} ORDER BY id", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| query_error("list", e))?;

        rows.iter().map(Self::map_row).collect()
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM api_keys")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| query_error("count", e))?;

        Ok(count as usize)
    }
}
