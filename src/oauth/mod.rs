//! OAuth 2.0 authorization code engine with PKCE, local accounts, and expiry sweeping.

pub mod accounts;
pub mod auth_server;
pub mod credentials;
pub mod pkce;
pub mod reaper;
pub mod types;

// Re-export frequently used items from each module
pub use crate::storage::traits::{
    AccessTokenStore, AuthorizationCodeStore, OAuthClientStore, OAuthStorage, SessionStore,
    UserStore,
};
pub use accounts::{AccountService, SignupForm};
pub use auth_server::{AuthorizationServer, extract_client_auth};
pub use credentials::{Argon2CredentialVerifier, CredentialVerifier};
pub use reaper::{ExpiryReaper, SweepReport};
pub use types::{
    AccessToken, AuthorizationCode, AuthorizationRequest, AuthorizeResponse, GrantType,
    OAuthClient, Session, TokenForm, TokenRequest, TokenResponse, TokenType, User, parse_scope,
};
