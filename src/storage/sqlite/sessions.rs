//! SQLite implementation for login session storage

use super::{column, encode_timestamp, timestamp};
use crate::errors::StorageError;
use crate::oauth::types::*;
use crate::storage::traits::{Result, SessionStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};

/// SQLite implementation of session storage
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Create a new SQLite session store
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_session(row: &SqliteRow) -> Result<Session> {
        Ok(Session {
            session_id: column(row, "session_id")?,
            user_id: column(row, "user_id")?,
            created_at: timestamp(row, "created_at")?,
            expires_at: timestamp(row, "expires_at")?,
        })
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn store_session(&self, session: &Session) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (session_id, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.session_id)
        .bind(&session.user_id)
        .bind(encode_timestamp(&session.created_at))
        .bind(encode_timestamp(&session.expires_at))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let row = sqlx::query("SELECT * FROM sessions WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let session = Self::row_to_session(&row)?;

        if session.is_expired(Utc::now()) {
            self.delete_session(session_id).await?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn cleanup_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(encode_timestamp(&now))
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() as usize)
    }
}
