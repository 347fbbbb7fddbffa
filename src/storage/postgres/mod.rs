//! PostgreSQL storage implementations
//!
//! This module provides PostgreSQL-based implementations of all storage traits.
//! PostgreSQL is the default backend and is safe to share between several server processes.

mod access_tokens;
mod authorization_codes;
mod oauth_clients;
mod sessions;
mod users;

use crate::errors::StorageError;
use crate::oauth::types::{AccessToken, AuthorizationCode, OAuthClient, Session, User};
use crate::storage::traits::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::{PgPool, PgRow};
use std::sync::Arc;

pub use access_tokens::PostgresAccessTokenStore;
pub use authorization_codes::PostgresAuthorizationCodeStore;
pub use oauth_clients::PostgresOAuthClientStore;
pub use sessions::PostgresSessionStore;
pub use users::PostgresUserStore;

/// Comprehensive PostgreSQL OAuth storage implementation
pub struct PostgresOAuthStorage {
    pool: PgPool,
    client_store: Arc<PostgresOAuthClientStore>,
    user_store: Arc<PostgresUserStore>,
    session_store: Arc<PostgresSessionStore>,
    authorization_code_store: Arc<PostgresAuthorizationCodeStore>,
    access_token_store: Arc<PostgresAccessTokenStore>,
}

impl PostgresOAuthStorage {
    /// Create a new PostgreSQL OAuth storage instance
    pub fn new(pool: PgPool) -> Self {
        Self {
            client_store: Arc::new(PostgresOAuthClientStore::new(pool.clone())),
            user_store: Arc::new(PostgresUserStore::new(pool.clone())),
            session_store: Arc::new(PostgresSessionStore::new(pool.clone())),
            authorization_code_store: Arc::new(PostgresAuthorizationCodeStore::new(pool.clone())),
            access_token_store: Arc::new(PostgresAccessTokenStore::new(pool.clone())),
            pool,
        }
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations/postgres")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(format!("Migration failed: {}", e)))?;
        Ok(())
    }
}

/// Read a column, naming it in the error.
pub(super) fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| StorageError::DatabaseError(format!("Failed to get {}: {}", name, e)))
}

/// Read a JSONB array of strings.
pub(super) fn string_list(row: &PgRow, name: &str) -> Result<Vec<String>> {
    let value: serde_json::Value = column(row, name)?;
    serde_json::from_value(value)
        .map_err(|e| StorageError::InvalidData(format!("Invalid {}: {}", name, e)))
}

#[async_trait]
impl OAuthClientStore for PostgresOAuthStorage {
    async fn store_client(&self, client: &OAuthClient) -> Result<()> {
        self.client_store.store_client(client).await
    }

    async fn get_client(&self, client_id: &str) -> Result<Option<OAuthClient>> {
        self.client_store.get_client(client_id).await
    }

    async fn delete_client(&self, client_id: &str) -> Result<bool> {
        self.client_store.delete_client(client_id).await
    }

    async fn list_clients(&self, limit: Option<usize>) -> Result<Vec<OAuthClient>> {
        self.client_store.list_clients(limit).await
    }
}

#[async_trait]
impl UserStore for PostgresOAuthStorage {
    async fn store_user(&self, user: &User) -> Result<()> {
        self.user_store.store_user(user).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_store.get_user_by_username(username).await
    }
}

#[async_trait]
impl SessionStore for PostgresOAuthStorage {
    async fn store_session(&self, session: &Session) -> Result<()> {
        self.session_store.store_session(session).await
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        self.session_store.get_session(session_id).await
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.session_store.delete_session(session_id).await
    }

    async fn cleanup_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        self.session_store.cleanup_expired_sessions(now).await
    }
}

#[async_trait]
impl AuthorizationCodeStore for PostgresOAuthStorage {
    async fn store_code(&self, code: &AuthorizationCode) -> Result<()> {
        self.authorization_code_store.store_code(code).await
    }

    async fn get_code(&self, code: &str) -> Result<Option<AuthorizationCode>> {
        self.authorization_code_store.get_code(code).await
    }

    async fn consume_code(&self, code: &str) -> Result<Option<AuthorizationCode>> {
        self.authorization_code_store.consume_code(code).await
    }

    async fn delete_code(&self, code: &str) -> Result<()> {
        self.authorization_code_store.delete_code(code).await
    }

    async fn cleanup_expired_codes(&self, now: DateTime<Utc>) -> Result<usize> {
        self.authorization_code_store.cleanup_expired_codes(now).await
    }
}

#[async_trait]
impl AccessTokenStore for PostgresOAuthStorage {
    async fn store_token(&self, token: &AccessToken) -> Result<()> {
        self.access_token_store.store_token(token).await
    }

    async fn get_token(&self, token: &str) -> Result<Option<AccessToken>> {
        self.access_token_store.get_token(token).await
    }

    async fn revoke_token(&self, token: &str) -> Result<()> {
        self.access_token_store.revoke_token(token).await
    }

    async fn cleanup_expired_tokens(&self, now: DateTime<Utc>) -> Result<usize> {
        self.access_token_store.cleanup_expired_tokens(now).await
    }
}

impl OAuthStorage for PostgresOAuthStorage {}
