//! Application state shared by the HTTP handlers.

use axum_template::engine::Engine;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::Config;
use crate::oauth::{
    AccountService, AuthorizationServer,
    credentials::{Argon2CredentialVerifier, CredentialVerifier},
};
use crate::storage::traits::OAuthStorage;

/// Template engine for the account pages.
pub type AppEngine = Engine<minijinja::Environment<'static>>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Template engine for rendering HTML responses.
    pub template_env: AppEngine,
    /// OAuth storage for clients, users, sessions, codes, and tokens
    pub oauth_storage: Arc<dyn OAuthStorage>,
    pub auth_server: Arc<AuthorizationServer>,
    pub accounts: Arc<AccountService>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Wire the engines to `oauth_storage` using the lifetimes and timeouts in `config`.
    pub fn new(config: Config, oauth_storage: Arc<dyn OAuthStorage>, template_env: AppEngine) -> Self {
        let credentials: Arc<dyn CredentialVerifier> = Arc::new(Argon2CredentialVerifier);

        let auth_server = AuthorizationServer::new(oauth_storage.clone(), credentials.clone())
            .with_lifetimes(
                *config.authorization_code_lifetime.as_ref(),
                *config.access_token_lifetime.as_ref(),
            )
            .with_timeouts(
                *config.authorize_timeout.as_ref(),
                *config.token_timeout.as_ref(),
            );

        let accounts = AccountService::new(oauth_storage.clone(), credentials)
            .with_session_lifetime(*config.session_lifetime.as_ref());

        Self {
            config: Arc::new(config),
            template_env,
            oauth_storage,
            auth_server: Arc::new(auth_server),
            accounts: Arc::new(accounts),
            started_at: Utc::now(),
        }
    }
}
