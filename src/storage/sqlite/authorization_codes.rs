//! SQLite implementation for authorization code storage

use super::{column, encode_string_list, encode_timestamp, string_list, timestamp};
use crate::errors::StorageError;
use crate::oauth::types::*;
use crate::storage::traits::{AuthorizationCodeStore, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};

/// SQLite implementation of authorization code storage
pub struct SqliteAuthorizationCodeStore {
    pool: SqlitePool,
}

impl SqliteAuthorizationCodeStore {
    /// Create a new SQLite authorization code store
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Convert SQLite row to AuthorizationCode
    fn row_to_authorization_code(row: &SqliteRow) -> Result<AuthorizationCode> {
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
            created_at: timestamp(row, "created_at")?,
            expires_at: timestamp(row, "expires_at")?,
        })
    }
}

#[async_trait]
impl AuthorizationCodeStore for SqliteAuthorizationCodeStore {
    async fn store_code(&self, code: &AuthorizationCode) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO authorization_codes (
                code, client_id, user_id, redirect_uri, scopes, code_challenge,
                code_challenge_method, nonce, state, created_at, expires_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&code.code)
        .bind(&code.client_id)
        .bind(&code.user_id)
        .bind(&code.redirect_uri)
        .bind(encode_string_list(&code.scopes)?)
        .bind(&code.code_challenge)
        .bind(&code.code_challenge_method)
        .bind(&code.nonce)
        .bind(&code.state)
        .bind(encode_timestamp(&code.created_at))
        .bind(encode_timestamp(&code.expires_at))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn get_code(&self, code_value: &str) -> Result<Option<AuthorizationCode>> {
        let row = sqlx::query("SELECT * FROM authorization_codes WHERE code = ?")
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
        // A single statement takes the write lock, so only one redeemer gets the row.
        let row = sqlx::query("DELETE FROM authorization_codes WHERE code = ? RETURNING *")
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
        sqlx::query("DELETE FROM authorization_codes WHERE code = ?")
            .bind(code_value)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn cleanup_expired_codes(&self, now: DateTime<Utc>) -> Result<usize> {
        let result = sqlx::query("DELETE FROM authorization_codes WHERE expires_at < ?")
            .bind(encode_timestamp(&now))
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() as usize)
    }
}
