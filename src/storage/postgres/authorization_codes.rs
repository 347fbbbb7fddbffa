//! PostgreSQL implementation for authorization code storage

use super::{column, string_list};
use crate::errors::StorageError;
use crate::oauth::types::*;
use crate::storage::traits::{AuthorizationCodeStore, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};

/// PostgreSQL implementation of authorization code storage
pub struct PostgresAuthorizationCodeStore {
    pool: PgPool,
}

impl PostgresAuthorizationCodeStore {
    /// Create a new PostgreSQL authorization code store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Convert PostgreSQL row to AuthorizationCode
    fn row_to_authorization_code(row: &PgRow) -> Result<AuthorizationCode> {
        Ok(AuthorizationCode {
            code: column(row, "code")?,
            client_id: column(row, "client_id")?,
            user_id: column(row, "user_id")?,
            redirect_uri: column(row, "redirect_uri")?,
            scopes: string_list(row, "scopes")?,
            code_challenge: column(row, "code_challenge")?,
            code_challenge_method: column(row, "code_challenge_method")?,
            nonce: column(row, "nonce")?,
            state: column(row, "state")?,
            created_at: column(row, "created_at")?,
            expires_at: column(row, "expires_at")?,
        })
    }
}

#[async_trait]
impl AuthorizationCodeStore for PostgresAuthorizationCodeStore {
    async fn store_code(&self, code: &AuthorizationCode) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO authorization_codes (
                code, client_id, user_id, redirect_uri, scopes, code_challenge,
                code_challenge_method, nonce, state, created_at, expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&code.code)
        .bind(&code.client_id)
        .bind(&code.user_id)
        .bind(&code.redirect_uri)
        .bind(serde_json::json!(code.scopes))
        .bind(&code.code_challenge)
        .bind(&code.code_challenge_method)
        .bind(&code.nonce)
        .bind(&code.state)
        .bind(code.created_at)
        .bind(code.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn get_code(&self, code_value: &str) -> Result<Option<AuthorizationCode>> {
        let row = sqlx::query("SELECT * FROM authorization_codes WHERE code = $1")
            .bind(code_value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let authorization_code = Self::row_to_authorization_code(&row)?;

        if authorization_code.is_expired(Utc::now()) {
            self.delete_code(code_value).await?;
            return Ok(None);
        }

        Ok(Some(authorization_code))
    }

    async fn consume_code(&self, code_value: &str) -> Result<Option<AuthorizationCode>> {
        // Row-level lock on DELETE: concurrent redeemers see zero rows once the first commits.
        let row = sqlx::query("DELETE FROM authorization_codes WHERE code = $1 RETURNING *")
            .bind(code_value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let authorization_code = Self::row_to_authorization_code(&row)?;

        if authorization_code.is_expired(Utc::now()) {
            return Ok(None);
        }

        Ok(Some(authorization_code))
    }

    async fn delete_code(&self, code_value: &str) -> Result<()> {
        sqlx::query("DELETE FROM authorization_codes WHERE code = $1")
            .bind(code_value)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn cleanup_expired_codes(&self, now: DateTime<Utc>) -> Result<usize> {
        let result = sqlx::query("DELETE FROM authorization_codes WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() as usize)
    }
}
