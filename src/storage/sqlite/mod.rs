//! SQLite storage implementations
//!
//! This module provides SQLite-based implementations of all storage traits.
//! SQLite is suitable for single-instance deployments. Timestamps are stored as
//! fixed-width RFC 3339 UTC strings so that range comparisons order correctly.

mod access_tokens;
mod authorization_codes;
mod oauth_clients;
mod sessions;
mod users;

use crate::errors::StorageError;
use crate::oauth::types::{AccessToken, AuthorizationCode, OAuthClient, Session, User};
use crate::storage::traits::*;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use std::sync::Arc;

pub use access_tokens::SqliteAccessTokenStore;
pub use authorization_codes::SqliteAuthorizationCodeStore;
pub use oauth_clients::SqliteOAuthClientStore;
pub use sessions::SqliteSessionStore;
pub use users::SqliteUserStore;

/// Comprehensive SQLite OAuth storage implementation
pub struct SqliteOAuthStorage {
    pool: SqlitePool,
    client_store: Arc<SqliteOAuthClientStore>,
    user_store: Arc<SqliteUserStore>,
    session_store: Arc<SqliteSessionStore>,
    authorization_code_store: Arc<SqliteAuthorizationCodeStore>,
    access_token_store: Arc<SqliteAccessTokenStore>,
}

impl SqliteOAuthStorage {
    /// Create a new SQLite OAuth storage instance
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            client_store: Arc::new(SqliteOAuthClientStore::new(pool.clone())),
            user_store: Arc::new(SqliteUserStore::new(pool.clone())),
            session_store: Arc::new(SqliteSessionStore::new(pool.clone())),
            authorization_code_store: Arc::new(SqliteAuthorizationCodeStore::new(pool.clone())),
            access_token_store: Arc::new(SqliteAccessTokenStore::new(pool.clone())),
            pool,
        }
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations/sqlite")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(format!("Migration failed: {}", e)))?;
        Ok(())
    }
}

/// Read a column, naming it in the error.
pub(super) fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| StorageError::DatabaseError(format!("Failed to get {}: {}", name, e)))
}

/// Read a timestamp column.
pub(super) fn timestamp(row: &SqliteRow, name: &str) -> Result<DateTime<Utc>> {
    let value: String = column(row, name)?;
    DateTime::parse_from_rfc3339(&value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|e| StorageError::InvalidData(format!("Invalid {} timestamp: {}", name, e)))
}

/// Encode a timestamp so that string order matches time order.
pub(super) fn encode_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Read a JSON array of strings stored as TEXT.
pub(super) fn string_list(row: &SqliteRow, name: &str) -> Result<Vec<String>> {
    let value: String = column(row, name)?;
    serde_json::from_str(&value)
        .map_err(|e| StorageError::InvalidData(format!("Invalid {}: {}", name, e)))
}

/// Encode a string list as JSON TEXT.
pub(super) fn encode_string_list(values: &[String]) -> Result<String> {
    serde_json::to_string(values).map_err(|e| StorageError::SerializationFailed(e.to_string()))
}

#[async_trait]
impl OAuthClientStore for SqliteOAuthStorage {
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
impl UserStore for SqliteOAuthStorage {
    async fn store_user(&self, user: &User) -> Result<()> {
        self.user_store.store_user(user).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_store.get_user_by_username(username).await
    }
}

#[async_trait]
impl SessionStore for SqliteOAuthStorage {
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
impl AuthorizationCodeStore for SqliteOAuthStorage {
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
impl AccessTokenStore for SqliteOAuthStorage {
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

impl OAuthStorage for SqliteOAuthStorage {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn storage() -> SqliteOAuthStorage {
        // One connection, since every in-memory connection is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let storage = SqliteOAuthStorage::new(pool);
        storage.migrate().await.unwrap();
        storage
    }

    fn client() -> OAuthClient {
        OAuthClient {
            client_id: "c1".to_string(),
            client_secret: "s".to_string(),
            client_name: Some("App".to_string()),
            redirect_uris: vec!["https://app.example/cb".to_string()],
            scopes: vec!["read".to_string(), "write".to_string()],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn code(value: &str, expires_at: DateTime<Utc>) -> AuthorizationCode {
        AuthorizationCode {
            code: value.to_string(),
            client_id: "c1".to_string(),
            user_id: "u1".to_string(),
            redirect_uri: "https://app.example/cb".to_string(),
            scopes: vec!["read".to_string()],
            code_challenge: Some("challenge".to_string()),
            code_challenge_method: Some("S256".to_string()),
            nonce: None,
            state: Some("st".to_string()),
            created_at: Utc::now(),
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_client_round_trip() {
        let storage = storage().await;
        storage.store_client(&client()).await.unwrap();

        let loaded = storage.get_client("c1").await.unwrap().unwrap();
        assert_eq!(loaded.redirect_uris, vec!["https://app.example/cb".to_string()]);
        assert_eq!(loaded.scopes.len(), 2);
        assert!(storage.get_client("missing").await.unwrap().is_none());

        let duplicate = storage.store_client(&client()).await;
        assert!(matches!(duplicate, Err(StorageError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_consume_code_once() {
        let storage = storage().await;
        storage.store_client(&client()).await.unwrap();
        storage
            .store_code(&code("abc", Utc::now() + Duration::minutes(10)))
            .await
            .unwrap();

        let first = storage.consume_code("abc").await.unwrap().unwrap();
        assert_eq!(first.code_challenge_method.as_deref(), Some("S256"));
        assert_eq!(first.state.as_deref(), Some("st"));
        assert!(storage.consume_code("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_code_and_cleanup() {
        let storage = storage().await;
        storage.store_client(&client()).await.unwrap();
        let now = Utc::now();
        storage
            .store_code(&code("stale", now - Duration::minutes(1)))
            .await
            .unwrap();
        storage
            .store_code(&code("live", now + Duration::minutes(10)))
            .await
            .unwrap();

        assert!(storage.get_code("stale").await.unwrap().is_none());
        assert_eq!(storage.cleanup_expired_codes(now).await.unwrap(), 0);
        assert!(storage.get_code("live").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_session_expiry() {
        let storage = storage().await;
        let now = Utc::now();
        let user = User {
            user_id: "u1".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            created_at: now,
            updated_at: now,
        };
        storage.store_user(&user).await.unwrap();

        for (id, expires_at) in [
            ("live", now + Duration::hours(1)),
            ("stale", now - Duration::hours(1)),
        ] {
            storage
                .store_session(&Session {
                    session_id: id.to_string(),
                    user_id: "u1".to_string(),
                    created_at: now,
                    expires_at,
                })
                .await
                .unwrap();
        }

        assert_eq!(storage.cleanup_expired_sessions(now).await.unwrap(), 1);
        assert!(storage.get_session("live").await.unwrap().is_some());
        assert!(storage.get_session("stale").await.unwrap().is_none());
    }
}
