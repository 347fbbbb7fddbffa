//! In-memory OAuth storage implementation
//!
//! Each collection sits behind its own mutex. Every operation takes the lock once,
//! so `consume_code` removes a code in the same critical section that reads it.

use crate::errors::StorageError;
use crate::oauth::types::*;
use crate::storage::traits::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// In-memory implementation for OAuth storage
#[derive(Default)]
pub struct MemoryOAuthStorage {
    clients: Mutex<HashMap<String, OAuthClient>>,
    users: Mutex<HashMap<String, User>>,
    sessions: Mutex<HashMap<String, Session>>,
    auth_codes: Mutex<HashMap<String, AuthorizationCode>>,
    access_tokens: Mutex<HashMap<String, AccessToken>>,
}

impl MemoryOAuthStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| StorageError::SerializationFailed(format!("Lock error: {}", e)))
}

#[async_trait]
impl OAuthClientStore for MemoryOAuthStorage {
    async fn store_client(&self, client: &OAuthClient) -> Result<()> {
        let mut clients = lock(&self.clients)?;
        clients.insert(client.client_id.clone(), client.clone());
        Ok(())
    }

    async fn get_client(&self, client_id: &str) -> Result<Option<OAuthClient>> {
        let clients = lock(&self.clients)?;
        Ok(clients.get(client_id).cloned())
    }

    async fn delete_client(&self, client_id: &str) -> Result<bool> {
        let mut clients = lock(&self.clients)?;
        Ok(clients.remove(client_id).is_some())
    }

    async fn list_clients(&self, limit: Option<usize>) -> Result<Vec<OAuthClient>> {
        let clients = lock(&self.clients)?;
        let mut result: Vec<_> = clients.values().cloned().collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        if let Some(limit) = limit {
            result.truncate(limit);
        }
        Ok(result)
    }
}

#[async_trait]
impl UserStore for MemoryOAuthStorage {
    async fn store_user(&self, user: &User) -> Result<()> {
        let mut users = lock(&self.users)?;
        if users.contains_key(&user.username) {
            return Err(StorageError::AlreadyExists("users.username".to_string()));
        }
        if users.values().any(|existing| existing.email == user.email) {
            return Err(StorageError::AlreadyExists("users.email".to_string()));
        }
        users.insert(user.username.clone(), user.clone());
        Ok(())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = lock(&self.users)?;
        Ok(users.get(username).cloned())
    }
}

#[async_trait]
impl SessionStore for MemoryOAuthStorage {
    async fn store_session(&self, session: &Session) -> Result<()> {
        let mut sessions = lock(&self.sessions)?;
        sessions.insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let mut sessions = lock(&self.sessions)?;
        match sessions.get(session_id) {
            Some(session) if session.is_expired(Utc::now()) => {
                sessions.remove(session_id);
                Ok(None)
            }
            Some(session) => Ok(Some(session.clone())),
            None => Ok(None),
        }
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let mut sessions = lock(&self.sessions)?;
        sessions.remove(session_id);
        Ok(())
    }

    async fn cleanup_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut sessions = lock(&self.sessions)?;
        let before = sessions.len();
        sessions.retain(|_, session| session.expires_at >= now);
        Ok(before - sessions.len())
    }
}

#[async_trait]
impl AuthorizationCodeStore for MemoryOAuthStorage {
    async fn store_code(&self, code: &AuthorizationCode) -> Result<()> {
        let mut codes = lock(&self.auth_codes)?;
        codes.insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn get_code(&self, code: &str) -> Result<Option<AuthorizationCode>> {
        let mut codes = lock(&self.auth_codes)?;
        match codes.get(code) {
            Some(auth_code) if auth_code.is_expired(Utc::now()) => {
                codes.remove(code);
                Ok(None)
            }
            Some(auth_code) => Ok(Some(auth_code.clone())),
            None => Ok(None),
        }
    }

    async fn consume_code(&self, code: &str) -> Result<Option<AuthorizationCode>> {
        let mut codes = lock(&self.auth_codes)?;
        Ok(codes
            .remove(code)
            .filter(|auth_code| !auth_code.is_expired(Utc::now())))
    }

    async fn delete_code(&self, code: &str) -> Result<()> {
        let mut codes = lock(&self.auth_codes)?;
        codes.remove(code);
        Ok(())
    }

    async fn cleanup_expired_codes(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut codes = lock(&self.auth_codes)?;
        let before = codes.len();
        codes.retain(|_, code| code.expires_at >= now);
        Ok(before - codes.len())
    }
}

#[async_trait]
impl AccessTokenStore for MemoryOAuthStorage {
    async fn store_token(&self, token: &AccessToken) -> Result<()> {
        let mut tokens = lock(&self.access_tokens)?;
        tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn get_token(&self, token: &str) -> Result<Option<AccessToken>> {
        let tokens = lock(&self.access_tokens)?;
        Ok(tokens
            .get(token)
            .filter(|access_token| !access_token.is_expired(Utc::now()))
            .cloned())
    }

    async fn revoke_token(&self, token: &str) -> Result<()> {
        let mut tokens = lock(&self.access_tokens)?;
        tokens.remove(token);
        Ok(())
    }

    async fn cleanup_expired_tokens(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut tokens = lock(&self.access_tokens)?;
        let before = tokens.len();
        tokens.retain(|_, token| token.expires_at >= now);
        Ok(before - tokens.len())
    }
}

impl OAuthStorage for MemoryOAuthStorage {}
