//! Storage trait definitions for OAuth data.
//!
//! Defines async storage interfaces for clients, users, sessions, authorization codes,
//! and access tokens that can be implemented by various backend providers.
//! "Not found" is always `Ok(None)`, distinct from backend failures.

use crate::errors::StorageError;
use crate::oauth::types::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub type Result<T> = std::result::Result<T, StorageError>;

/// Trait for storing and retrieving OAuth clients
#[async_trait]
pub trait OAuthClientStore {
    /// Store a new OAuth client
    async fn store_client(&self, client: &OAuthClient) -> Result<()>;

    /// Retrieve a client by ID
    async fn get_client(&self, client_id: &str) -> Result<Option<OAuthClient>>;

    /// Delete a client, returning whether it existed
    async fn delete_client(&self, client_id: &str) -> Result<bool>;

    /// List all clients (for admin purposes)
    async fn list_clients(&self, limit: Option<usize>) -> Result<Vec<OAuthClient>>;
}

/// Trait for storing and retrieving resource owner accounts
#[async_trait]
pub trait UserStore {
    /// Store a new user; `StorageError::AlreadyExists` when the username or email is taken
    async fn store_user(&self, user: &User) -> Result<()>;

    /// Retrieve a user by username
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
}

/// Trait for storing and retrieving login sessions
#[async_trait]
pub trait SessionStore {
    /// Store a new session
    async fn store_session(&self, session: &Session) -> Result<()>;

    /// Retrieve a live session; an expired session is deleted and reported as absent
    async fn get_session(&self, session_id: &str) -> Result<Option<Session>>;

    /// Delete a session
    async fn delete_session(&self, session_id: &str) -> Result<()>;

    /// Delete sessions that expired before `now`
    async fn cleanup_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize>;
}

/// Trait for storing and redeeming authorization codes
#[async_trait]
pub trait AuthorizationCodeStore {
    /// Store a new authorization code
    async fn store_code(&self, code: &AuthorizationCode) -> Result<()>;

    /// Look at a live code without consuming it; an expired code is deleted and reported as absent
    async fn get_code(&self, code: &str) -> Result<Option<AuthorizationCode>>;

    /// Atomically fetch and delete a code.
    ///
    /// At most one caller ever receives a given code. An expired code is still
    /// removed but reported as absent.
    async fn consume_code(&self, code: &str) -> Result<Option<AuthorizationCode>>;

    /// Delete a code
    async fn delete_code(&self, code: &str) -> Result<()>;

    /// Delete codes that expired before `now`
    async fn cleanup_expired_codes(&self, now: DateTime<Utc>) -> Result<usize>;
}

/// Trait for storing and retrieving access tokens
#[async_trait]
pub trait AccessTokenStore {
    /// Store a new access token
    async fn store_token(&self, token: &AccessToken) -> Result<()>;

    /// Retrieve a live access token; expired tokens are reported as absent
    async fn get_token(&self, token: &str) -> Result<Option<AccessToken>>;

    /// Revoke a token
    async fn revoke_token(&self, token: &str) -> Result<()>;

    /// Delete tokens that expired before `now`
    async fn cleanup_expired_tokens(&self, now: DateTime<Utc>) -> Result<usize>;
}

// ===== Combined Storage Trait =====

/// Combined OAuth storage trait
pub trait OAuthStorage:
    OAuthClientStore
    + UserStore
    + SessionStore
    + AuthorizationCodeStore
    + AccessTokenStore
    + Send
    + Sync
{
}
