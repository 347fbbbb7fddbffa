//! SQLite implementation for OAuth client storage

use super::{column, encode_string_list, encode_timestamp, string_list, timestamp};
use crate::errors::StorageError;
use crate::oauth::types::*;
use crate::storage::map_write_error;
use crate::storage::traits::{OAuthClientStore, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqliteRow};

/// SQLite implementation of OAuth client storage
pub struct SqliteOAuthClientStore {
    pool: SqlitePool,
}

impl SqliteOAuthClientStore {
    /// Create a new SQLite OAuth client store
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Convert SQLite row to OAuthClient
    fn row_to_oauth_client(row: &SqliteRow) -> Result<OAuthClient> {
        Ok(OAuthClient {
            client_id: column(row, "client_id")?,
            client_secret: column(row, "client_secret")?,
            client_name: column(row, "client_name")?,
            redirect_uris: string_list(row, "redirect_uris")?,
            scopes: string_list(row, "scopes")?,
            created_at: timestamp(row, "created_at")?,
            updated_at: timestamp(row, "updated_at")?,
        })
    }
}

#[async_trait]
impl OAuthClientStore for SqliteOAuthClientStore {
    async fn store_client(&self, client: &OAuthClient) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO oauth_clients (
                client_id, client_secret, client_name, redirect_uris, scopes, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&client.client_id)
        .bind(&client.client_secret)
        .bind(&client.client_name)
        .bind(encode_string_list(&client.redirect_uris)?)
        .bind(encode_string_list(&client.scopes)?)
        .bind(encode_timestamp(&client.created_at))
        .bind(encode_timestamp(&client.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &format!("client {}", client.client_id)))?;

        Ok(())
    }

    async fn get_client(&self, client_id: &str) -> Result<Option<OAuthClient>> {
        let row = sqlx::query("SELECT * FROM oauth_clients WHERE client_id = ?")
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        row.as_ref().map(Self::row_to_oauth_client).transpose()
    }

    async fn delete_client(&self, client_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM oauth_clients WHERE client_id = ?")
            .bind(client_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_clients(&self, limit: Option<usize>) -> Result<Vec<OAuthClient>> {
        // SQLite treats a negative LIMIT as unbounded
        let limit = limit.map(|limit| limit as i64).unwrap_or(-1);
        let rows = sqlx::query("SELECT * FROM oauth_clients ORDER BY created_at LIMIT ?")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        rows.iter().map(Self::row_to_oauth_client).collect()
    }
}
