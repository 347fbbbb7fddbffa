//! PostgreSQL implementation for OAuth client storage

use super::{column, string_list};
use crate::errors::StorageError;
use crate::oauth::types::*;
use crate::storage::map_write_error;
use crate::storage::traits::{OAuthClientStore, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};

/// PostgreSQL implementation of OAuth client storage
pub struct PostgresOAuthClientStore {
    pool: PgPool,
}

impl PostgresOAuthClientStore {
    /// Create a new PostgreSQL OAuth client store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Convert PostgreSQL row to OAuthClient
    fn row_to_oauth_client(row: &PgRow) -> Result<OAuthClient> {
        Ok(OAuthClient {
            client_id: column(row, "client_id")?,
            client_secret: column(row, "client_secret")?,
            client_name: column(row, "client_name")?,
            redirect_uris: string_list(row, "redirect_uris")?,
            scopes: string_list(row, "scopes")?,
            created_at: column(row, "created_at")?,
            updated_at: column(row, "updated_at")?,
        })
    }
}

#[async_trait]
impl OAuthClientStore for PostgresOAuthClientStore {
    async fn store_client(&self, client: &OAuthClient) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO oauth_clients (
                client_id, client_secret, client_name, redirect_uris, scopes, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&client.client_id)
        .bind(&client.client_secret)
        .bind(&client.client_name)
        .bind(serde_json::json!(client.redirect_uris))
        .bind(serde_json::json!(client.scopes))
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &format!("client {}", client.client_id)))?;

        Ok(())
    }

    async fn get_client(&self, client_id: &str) -> Result<Option<OAuthClient>> {
        let row = sqlx::query("SELECT * FROM oauth_clients WHERE client_id = $1")
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        row.as_ref().map(Self::row_to_oauth_client).transpose()
    }

    async fn delete_client(&self, client_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM oauth_clients WHERE client_id = $1")
            .bind(client_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_clients(&self, limit: Option<usize>) -> Result<Vec<OAuthClient>> {
        let rows = match limit {
            Some(limit) => {
                sqlx::query("SELECT * FROM oauth_clients ORDER BY created_at LIMIT $1")
                    .bind(limit as i64)
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                sqlx::query("SELECT * FROM oauth_clients ORDER BY created_at")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        rows.iter().map(Self::row_to_oauth_client).collect()
    }
}
