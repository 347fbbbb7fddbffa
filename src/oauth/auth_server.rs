//! Core OAuth 2.0 authorization server handling authorization, token, and PKCE flows.

use crate::errors::{OAuthError, StorageError};
use crate::oauth::credentials::CredentialVerifier;
use crate::oauth::{pkce, types::*};
use crate::storage::traits::OAuthStorage;
use axum::http::HeaderMap;
use base64::prelude::*;
use chrono::{Duration, Utc};
use std::future::Future;
use std::sync::Arc;
use url::Url;

/// OAuth 2.0 Authorization Server
pub struct AuthorizationServer {
    pub storage: Arc<dyn OAuthStorage>,
    credentials: Arc<dyn CredentialVerifier>,
    /// Authorization code lifetime
    auth_code_lifetime: Duration,
    /// Access token lifetime, reported as `expires_in`
    access_token_lifetime: Duration,
    authorize_timeout: std::time::Duration,
    token_timeout: std::time::Duration,
}

impl AuthorizationServer {
    /// Create a new authorization server
    pub fn new(storage: Arc<dyn OAuthStorage>, credentials: Arc<dyn CredentialVerifier>) -> Self {
        Self {
            storage,
            credentials,
            auth_code_lifetime: Duration::minutes(10),
            access_token_lifetime: Duration::hours(1),
            authorize_timeout: std::time::Duration::from_secs(10),
            token_timeout: std::time::Duration::from_secs(15),
        }
    }

    /// Override code and token lifetimes
    pub fn with_lifetimes(mut self, auth_code: Duration, access_token: Duration) -> Self {
        self.auth_code_lifetime = auth_code;
        self.access_token_lifetime = access_token;
        self
    }

    /// Override the per-request time bounds
    pub fn with_timeouts(
        mut self,
        authorize: std::time::Duration,
        token: std::time::Duration,
    ) -> Self {
        self.authorize_timeout = authorize;
        self.token_timeout = token;
        self
    }

    /// Handle authorization requests (RFC 6749 Section 4.1.1)
    ///
    /// Returns `OAuthError::AuthenticationRequired` when `session_id` does not name a live
    /// session; the caller sends the user to log in and then replays the same request.
    pub async fn authorize(
        &self,
        request: AuthorizationRequest,
        session_id: Option<&str>,
    ) -> Result<AuthorizeResponse, OAuthError> {
        bounded(
            self.authorize_timeout,
            "authorize",
            self.authorize_inner(request, session_id),
        )
        .await
    }

    async fn authorize_inner(
        &self,
        request: AuthorizationRequest,
        session_id: Option<&str>,
    ) -> Result<AuthorizeResponse, OAuthError> {
        if request.client_id.is_empty() {
            return Err(OAuthError::MissingClientId);
        }
        if request.redirect_uri.is_empty() {
            return Err(OAuthError::MissingRedirectUri);
        }
        if request.response_type != "code" {
            tracing::warn!(client_id = %request.client_id, response_type = %request.response_type, "unsupported response type");
            return Err(OAuthError::UnsupportedResponseType(
                request.response_type.clone(),
            ));
        }

        // Validate client
        let client = self
            .storage
            .get_client(&request.client_id)
            .await
            .map_err(|e| storage_failure("get_client", e))?
            .ok_or_else(|| {
                tracing::warn!(client_id = %request.client_id, "unknown client");
                OAuthError::InvalidClient("Client not found".to_string())
            })?;

        // Exact string match, no normalization
        if !client.redirect_uris.contains(&request.redirect_uri) {
            tracing::warn!(client_id = %client.client_id, redirect_uri = %request.redirect_uri, "redirect uri not registered");
            return Err(OAuthError::InvalidRedirectUri(request.redirect_uri.clone()));
        }

        let scopes = parse_scope(request.scope.as_deref().unwrap_or_default());
        if !client.scopes.is_empty() {
            if let Some(denied) = scopes.iter().find(|scope| !client.scopes.contains(*scope)) {
                return Err(OAuthError::InvalidScope(format!(
                    "scope {} is not allowed for this client",
                    denied
                )));
            }
        }

        let code_challenge = request.code_challenge.filter(|value| !value.is_empty());
        let code_challenge_method = match &code_challenge {
            Some(_) => {
                let method = request
                    .code_challenge_method
                    .filter(|value| !value.is_empty());
                if pkce::parse_method(method.as_deref()).is_none() {
                    return Err(OAuthError::InvalidRequest(
                        "Unsupported code_challenge_method".to_string(),
                    ));
                }
                method
            }
            None => None,
        };

        let session = match session_id.filter(|value| !value.is_empty()) {
            Some(session_id) => self
                .storage
                .get_session(session_id)
                .await
                .map_err(|e| storage_failure("get_session", e))?,
            None => None,
        };
        let Some(session) = session else {
            tracing::debug!(client_id = %client.client_id, "no live session, login required");
            return Err(OAuthError::AuthenticationRequired);
        };

        // Generate authorization code
        let code = generate_token();
        let now = Utc::now();

        let auth_code = AuthorizationCode {
            code: code.clone(),
            client_id: client.client_id.clone(),
            user_id: session.user_id.clone(),
            redirect_uri: request.redirect_uri.clone(),
            scopes,
            code_challenge,
            code_challenge_method,
            nonce: request.nonce.filter(|value| !value.is_empty()),
            state: request.state.clone().filter(|value| !value.is_empty()),
            created_at: now,
            expires_at: now + self.auth_code_lifetime,
        };

        let redirect_url =
            build_redirect_url(&auth_code.redirect_uri, &code, auth_code.state.as_deref())?;

        self.storage
            .store_code(&auth_code)
            .await
            .map_err(|e| storage_failure("store_code", e))?;

        tracing::info!(client_id = %auth_code.client_id, user_id = %auth_code.user_id, "authorization code issued");

        Ok(AuthorizeResponse { code, redirect_url })
    }

    /// Handle token requests (RFC 6749 Section 4.1.3)
    pub async fn token(
        &self,
        request: TokenRequest,
        client_auth: Option<ClientAuthentication>,
    ) -> Result<TokenResponse, OAuthError> {
        bounded(
            self.token_timeout,
            "token",
            self.token_inner(request, client_auth),
        )
        .await
    }

    async fn token_inner(
        &self,
        request: TokenRequest,
        client_auth: Option<ClientAuthentication>,
    ) -> Result<TokenResponse, OAuthError> {
        match request.grant_type {
            GrantType::AuthorizationCode => {
                self.handle_authorization_code_grant(request, client_auth)
                    .await
            }
        }
    }

    async fn handle_authorization_code_grant(
        &self,
        request: TokenRequest,
        client_auth: Option<ClientAuthentication>,
    ) -> Result<TokenResponse, OAuthError> {
        let client = self.authenticate_client(client_auth).await?;

        let code_value = request
            .code
            .as_deref()
            .ok_or_else(|| OAuthError::InvalidRequest("code is required".to_string()))?;

        // Missing, expired, and replayed codes are indistinguishable here
        let auth_code = self
            .storage
            .consume_code(code_value)
            .await
            .map_err(|e| storage_failure("consume_code", e))?
            .ok_or_else(|| {
                tracing::warn!(client_id = %client.client_id, "authorization code not found or expired");
                OAuthError::InvalidGrant("Invalid or expired authorization code".to_string())
            })?;

        if auth_code.client_id != client.client_id {
            tracing::warn!(client_id = %client.client_id, "authorization code issued to another client");
            return Err(OAuthError::InvalidGrant("Client mismatch".to_string()));
        }

        if request.redirect_uri.as_deref() != Some(auth_code.redirect_uri.as_str()) {
            tracing::warn!(client_id = %client.client_id, "redirect uri does not match authorization request");
            return Err(OAuthError::InvalidGrant("Redirect URI mismatch".to_string()));
        }

        if let Some(challenge) = &auth_code.code_challenge {
            let verifier = request.code_verifier.as_deref().ok_or_else(|| {
                OAuthError::InvalidGrant("code_verifier is required".to_string())
            })?;
            let method = auth_code.code_challenge_method.as_deref().unwrap_or_default();
            if !pkce::verify(method, verifier, challenge) {
                tracing::warn!(client_id = %client.client_id, "PKCE verification failed");
                return Err(OAuthError::InvalidGrant(
                    "PKCE verification failed".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let access_token = AccessToken {
            token: generate_token(),
            client_id: client.client_id.clone(),
            user_id: Some(auth_code.user_id.clone()),
            scopes: auth_code.scopes.clone(),
            created_at: now,
            expires_at: now + self.access_token_lifetime,
        };

        self.storage
            .store_token(&access_token)
            .await
            .map_err(|e| storage_failure("store_token", e))?;

        tracing::info!(client_id = %access_token.client_id, user_id = %auth_code.user_id, "access token issued");

        Ok(TokenResponse {
            access_token: access_token.token,
            token_type: TokenType::Bearer,
            expires_in: self.access_token_lifetime.num_seconds().max(0) as u64,
            refresh_token: generate_token(),
            scope: (!access_token.scopes.is_empty()).then(|| join_scopes(&access_token.scopes)),
        })
    }

    /// Resolve and authenticate the client presenting credentials at the token endpoint.
    async fn authenticate_client(
        &self,
        client_auth: Option<ClientAuthentication>,
    ) -> Result<OAuthClient, OAuthError> {
        let (client_id, client_secret) = match client_auth {
            Some(ClientAuthentication {
                client_id,
                client_secret: Some(client_secret),
            }) if !client_id.is_empty() && !client_secret.is_empty() => (client_id, client_secret),
            _ => {
                return Err(OAuthError::InvalidRequest(
                    "client_id and client_secret are required".to_string(),
                ));
            }
        };

        let client = self
            .storage
            .get_client(&client_id)
            .await
            .map_err(|e| storage_failure("get_client", e))?
            .ok_or_else(|| {
                tracing::warn!(client_id = %client_id, "unknown client at token endpoint");
                OAuthError::InvalidClient("Invalid client credentials".to_string())
            })?;

        // Argon2 verification is CPU bound
        let credentials = self.credentials.clone();
        let candidate = client.clone();
        let verified = tokio::task::spawn_blocking(move || {
            credentials.verify_client_secret(&candidate, &client_secret)
        })
        .await
        .map_err(|e| OAuthError::ServerError(format!("Credential check failed: {}", e)))?;

        if !verified {
            tracing::warn!(client_id = %client_id, "client secret rejected");
            return Err(OAuthError::InvalidClient(
                "Invalid client credentials".to_string(),
            ));
        }

        Ok(client)
    }
}

/// Run one request-scoped operation under a time bound.
async fn bounded<T, F>(
    limit: std::time::Duration,
    operation: &str,
    future: F,
) -> Result<T, OAuthError>
where
    F: Future<Output = Result<T, OAuthError>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(operation, timeout = ?limit, "operation timed out");
            Err(OAuthError::TemporarilyUnavailable(format!(
                "{} did not complete in time",
                operation
            )))
        }
    }
}

fn storage_failure(operation: &str, error: StorageError) -> OAuthError {
    tracing::error!(operation, error = ?error, "storage operation failed");
    OAuthError::ServerError(format!("Storage failure during {}", operation))
}

/// Append `code` and, when present, `state` to the client's redirect URI.
fn build_redirect_url(
    redirect_uri: &str,
    code: &str,
    state: Option<&str>,
) -> Result<String, OAuthError> {
    let mut url = Url::parse(redirect_uri)
        .map_err(|e| OAuthError::InvalidRedirectUri(format!("{}: {}", redirect_uri, e)))?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("code", code);
        if let Some(state) = state {
            pairs.append_pair("state", state);
        }
    }
    Ok(url.to_string())
}

/// Extract client authentication from the `Authorization: Basic` header or form fields.
///
/// The header takes precedence when it is well formed. Basic credentials are
/// form-urlencoded before base64 encoding, so both halves are decoded here.
pub fn extract_client_auth(headers: &HeaderMap, form: &TokenForm) -> Option<ClientAuthentication> {
    // Try Authorization header (HTTP Basic)
    if let Some(auth_header) = headers.get(axum::http::header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(encoded) = auth_str.strip_prefix("Basic ") {
                if let Ok(decoded) = BASE64_STANDARD.decode(encoded.trim()) {
                    if let Ok(credentials) = String::from_utf8(decoded) {
                        if let Some((client_id, client_secret)) = credentials.split_once(':') {
                            if let (Some(client_id), Some(client_secret)) =
                                (form_decode(client_id), form_decode(client_secret))
                            {
                                return Some(ClientAuthentication {
                                    client_id,
                                    client_secret: Some(client_secret),
                                });
                            }
                        }
                    }
                }
            }
        }
    }

    // Fall back to form parameters
    form.client_id.as_ref().map(|client_id| ClientAuthentication {
        client_id: client_id.clone(),
        client_secret: form.client_secret.clone(),
    })
}

fn form_decode(value: &str) -> Option<String> {
    urlencoding::decode(&value.replace('+', " "))
        .ok()
        .map(|decoded| decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::credentials::Argon2CredentialVerifier;
    use crate::storage::inmemory::MemoryOAuthStorage;
    use crate::storage::traits::{
        AccessTokenStore, AuthorizationCodeStore, OAuthClientStore, SessionStore,
    };

    const REDIRECT: &str = "https://app.example/cb";
    const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    async fn create_test_server() -> (AuthorizationServer, Arc<MemoryOAuthStorage>) {
        let storage = Arc::new(MemoryOAuthStorage::new());
        let now = Utc::now();
        storage
            .store_client(&OAuthClient {
                client_id: "c1".to_string(),
                client_secret: "secret".to_string(),
                client_name: Some("Test App".to_string()),
                redirect_uris: vec![REDIRECT.to_string()],
                scopes: vec![],
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        storage
            .store_client(&OAuthClient {
                client_id: "scoped".to_string(),
                client_secret: "secret".to_string(),
                client_name: None,
                redirect_uris: vec![REDIRECT.to_string()],
                scopes: vec!["read".to_string(), "write".to_string()],
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        storage
            .store_session(&Session {
                session_id: "sess-1".to_string(),
                user_id: "u1".to_string(),
                created_at: now,
                expires_at: now + Duration::hours(24),
            })
            .await
            .unwrap();
        storage
            .store_session(&Session {
                session_id: "sess-expired".to_string(),
                user_id: "u1".to_string(),
                created_at: now - Duration::hours(25),
                expires_at: now - Duration::hours(1),
            })
            .await
            .unwrap();

        let server = AuthorizationServer::new(storage.clone(), Arc::new(Argon2CredentialVerifier));
        (server, storage)
    }

    fn authorize_request(client_id: &str) -> AuthorizationRequest {
        AuthorizationRequest {
            client_id: client_id.to_string(),
            redirect_uri: REDIRECT.to_string(),
            response_type: "code".to_string(),
            ..Default::default()
        }
    }

    fn token_request(code: &str, verifier: Option<&str>) -> TokenRequest {
        TokenRequest {
            grant_type: GrantType::AuthorizationCode,
            code: Some(code.to_string()),
            redirect_uri: Some(REDIRECT.to_string()),
            code_verifier: verifier.map(str::to_string),
        }
    }

    fn client_auth(client_id: &str, secret: &str) -> Option<ClientAuthentication> {
        Some(ClientAuthentication {
            client_id: client_id.to_string(),
            client_secret: Some(secret.to_string()),
        })
    }

    #[tokio::test]
    async fn test_authorization_code_flow() {
        let (server, storage) = create_test_server().await;

        let mut request = authorize_request("c1");
        request.state = Some("xyz".to_string());
        request.scope = Some("read write read".to_string());

        let response = server.authorize(request, Some("sess-1")).await.unwrap();
        assert!(response.redirect_url.starts_with("https://app.example/cb?code="));
        assert!(response.redirect_url.ends_with("&state=xyz"));

        let stored = storage.get_code(&response.code).await.unwrap().unwrap();
        assert_eq!(stored.user_id, "u1");
        assert_eq!(stored.scopes, vec!["read".to_string(), "write".to_string()]);

        let token = server
            .token(token_request(&response.code, None), client_auth("c1", "secret"))
            .await
            .unwrap();
        assert_eq!(token.token_type, TokenType::Bearer);
        assert_eq!(token.expires_in, 3600);
        assert_eq!(token.scope.as_deref(), Some("read write"));
        assert!(!token.refresh_token.is_empty());

        let issued = storage.get_token(&token.access_token).await.unwrap().unwrap();
        assert_eq!(issued.client_id, "c1");
        assert_eq!(issued.user_id.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_replayed_code_is_invalid_grant() {
        let (server, _) = create_test_server().await;
        let response = server
            .authorize(authorize_request("c1"), Some("sess-1"))
            .await
            .unwrap();

        let first = server
            .token(token_request(&response.code, None), client_auth("c1", "secret"))
            .await;
        assert!(first.is_ok());
        assert!(first.unwrap().scope.is_none());

        let second = server
            .token(token_request(&response.code, None), client_auth("c1", "secret"))
            .await;
        assert!(matches!(second, Err(OAuthError::InvalidGrant(_))));
    }

    #[tokio::test]
    async fn test_concurrent_redemption_single_success() {
        let (server, _) = create_test_server().await;
        let server = Arc::new(server);
        let response = server
            .authorize(authorize_request("c1"), Some("sess-1"))
            .await
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let server = server.clone();
                let code = response.code.clone();
                tokio::spawn(async move {
                    server
                        .token(token_request(&code, None), client_auth("c1", "secret"))
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        let mut invalid_grants = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(OAuthError::InvalidGrant(_)) => invalid_grants += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(invalid_grants, 7);
    }

    #[tokio::test]
    async fn test_authorize_validation_order() {
        let (server, _) = create_test_server().await;

        let mut request = authorize_request("");
        request.redirect_uri = String::new();
        assert!(matches!(
            server.authorize(request, Some("sess-1")).await,
            Err(OAuthError::MissingClientId)
        ));

        let mut request = authorize_request("c1");
        request.redirect_uri = String::new();
        assert!(matches!(
            server.authorize(request, Some("sess-1")).await,
            Err(OAuthError::MissingRedirectUri)
        ));

        let mut request = authorize_request("c1");
        request.response_type = "token".to_string();
        assert!(matches!(
            server.authorize(request, Some("sess-1")).await,
            Err(OAuthError::UnsupportedResponseType(_))
        ));

        assert!(matches!(
            server.authorize(authorize_request("nobody"), Some("sess-1")).await,
            Err(OAuthError::InvalidClient(_))
        ));

        // Trailing slash is a different URI
        let mut request = authorize_request("c1");
        request.redirect_uri = format!("{}/", REDIRECT);
        assert!(matches!(
            server.authorize(request, Some("sess-1")).await,
            Err(OAuthError::InvalidRedirectUri(_))
        ));

        // Client checks come before the session check
        assert!(matches!(
            server.authorize(authorize_request("nobody"), None).await,
            Err(OAuthError::InvalidClient(_))
        ));
    }

    #[tokio::test]
    async fn test_authorize_requires_live_session() {
        let (server, storage) = create_test_server().await;

        assert!(matches!(
            server.authorize(authorize_request("c1"), None).await,
            Err(OAuthError::AuthenticationRequired)
        ));
        assert!(matches!(
            server.authorize(authorize_request("c1"), Some("unknown")).await,
            Err(OAuthError::AuthenticationRequired)
        ));
        assert!(matches!(
            server
                .authorize(authorize_request("c1"), Some("sess-expired"))
                .await,
            Err(OAuthError::AuthenticationRequired)
        ));
        // Expired session was evicted on lookup
        assert_eq!(
            storage
                .cleanup_expired_sessions(Utc::now())
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_scope_restrictions() {
        let (server, _) = create_test_server().await;

        let mut request = authorize_request("scoped");
        request.scope = Some("read admin".to_string());
        assert!(matches!(
            server.authorize(request, Some("sess-1")).await,
            Err(OAuthError::InvalidScope(_))
        ));

        let mut request = authorize_request("scoped");
        request.scope = Some("write".to_string());
        assert!(server.authorize(request, Some("sess-1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_pkce_s256() {
        let (server, _) = create_test_server().await;

        let mut request = authorize_request("c1");
        request.code_challenge = Some(CHALLENGE.to_string());
        request.code_challenge_method = Some("S256".to_string());
        let response = server.authorize(request.clone(), Some("sess-1")).await.unwrap();
        let token = server
            .token(
                token_request(&response.code, Some(VERIFIER)),
                client_auth("c1", "secret"),
            )
            .await;
        assert!(token.is_ok());

        let response = server.authorize(request.clone(), Some("sess-1")).await.unwrap();
        let wrong = server
            .token(
                token_request(&response.code, Some("not-the-verifier")),
                client_auth("c1", "secret"),
            )
            .await;
        assert!(matches!(wrong, Err(OAuthError::InvalidGrant(_))));

        let response = server.authorize(request, Some("sess-1")).await.unwrap();
        let missing = server
            .token(token_request(&response.code, None), client_auth("c1", "secret"))
            .await;
        assert!(matches!(missing, Err(OAuthError::InvalidGrant(_))));
    }

    #[tokio::test]
    async fn test_pkce_plain_default_method() {
        let (server, _) = create_test_server().await;

        let mut request = authorize_request("c1");
        request.code_challenge = Some("plain-verifier-value".to_string());
        let response = server.authorize(request, Some("sess-1")).await.unwrap();

        let token = server
            .token(
                token_request(&response.code, Some("plain-verifier-value")),
                client_auth("c1", "secret"),
            )
            .await;
        assert!(token.is_ok());

        let mut request = authorize_request("c1");
        request.code_challenge = Some(CHALLENGE.to_string());
        request.code_challenge_method = Some("S512".to_string());
        assert!(matches!(
            server.authorize(request, Some("sess-1")).await,
            Err(OAuthError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_binding_mismatches() {
        let (server, storage) = create_test_server().await;
        let now = Utc::now();
        storage
            .store_client(&OAuthClient {
                client_id: "c2".to_string(),
                client_secret: "other".to_string(),
                client_name: None,
                redirect_uris: vec![REDIRECT.to_string()],
                scopes: vec![],
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let response = server
            .authorize(authorize_request("c1"), Some("sess-1"))
            .await
            .unwrap();
        let other_client = server
            .token(token_request(&response.code, None), client_auth("c2", "other"))
            .await;
        assert!(matches!(other_client, Err(OAuthError::InvalidGrant(_))));

        let response = server
            .authorize(authorize_request("c1"), Some("sess-1"))
            .await
            .unwrap();
        let mut request = token_request(&response.code, None);
        request.redirect_uri = Some("https://app.example/other".to_string());
        let other_redirect = server.token(request, client_auth("c1", "secret")).await;
        assert!(matches!(other_redirect, Err(OAuthError::InvalidGrant(_))));
    }

    #[tokio::test]
    async fn test_expired_code_is_invalid_grant() {
        let (server, storage) = create_test_server().await;
        let now = Utc::now();
        storage
            .store_code(&AuthorizationCode {
                code: "expired".to_string(),
                client_id: "c1".to_string(),
                user_id: "u1".to_string(),
                redirect_uri: REDIRECT.to_string(),
                scopes: vec![],
                code_challenge: None,
                code_challenge_method: None,
                nonce: None,
                state: None,
                created_at: now - Duration::minutes(11),
                expires_at: now - Duration::minutes(1),
            })
            .await
            .unwrap();

        let result = server
            .token(token_request("expired", None), client_auth("c1", "secret"))
            .await;
        assert!(matches!(result, Err(OAuthError::InvalidGrant(_))));
        assert!(storage.get_code("expired").await.unwrap().is_none());
        assert_eq!(storage.cleanup_expired_codes(Utc::now()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_client_authentication_failures() {
        let (server, _) = create_test_server().await;
        let response = server
            .authorize(authorize_request("c1"), Some("sess-1"))
            .await
            .unwrap();

        let missing = server.token(token_request(&response.code, None), None).await;
        assert!(matches!(missing, Err(OAuthError::InvalidRequest(_))));

        let no_secret = server
            .token(
                token_request(&response.code, None),
                Some(ClientAuthentication {
                    client_id: "c1".to_string(),
                    client_secret: None,
                }),
            )
            .await;
        assert!(matches!(no_secret, Err(OAuthError::InvalidRequest(_))));

        let wrong = server
            .token(token_request(&response.code, None), client_auth("c1", "nope"))
            .await;
        assert!(matches!(wrong, Err(OAuthError::InvalidClient(_))));

        let unknown = server
            .token(token_request(&response.code, None), client_auth("ghost", "secret"))
            .await;
        assert!(matches!(unknown, Err(OAuthError::InvalidClient(_))));

        // Failed client authentication does not burn the code
        let ok = server
            .token(token_request(&response.code, None), client_auth("c1", "secret"))
            .await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result: Result<(), OAuthError> = bounded(
            std::time::Duration::from_millis(10),
            "slow",
            async {
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                Ok(())
            },
        )
        .await;
        let err = result.unwrap_err();
        assert!(matches!(err, OAuthError::TemporarilyUnavailable(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_extract_client_auth() {
        let mut headers = HeaderMap::new();
        let form = TokenForm {
            client_id: Some("form-client".to_string()),
            client_secret: Some("form-secret".to_string()),
            ..Default::default()
        };

        let auth = extract_client_auth(&headers, &form).unwrap();
        assert_eq!(auth.client_id, "form-client");
        assert_eq!(auth.client_secret.as_deref(), Some("form-secret"));

        let encoded = BASE64_STANDARD.encode("basic-client:basic%3Asecret");
        headers.insert(
            axum::http::header::AUTHORIZATION,
            format!("Basic {}", encoded).parse().unwrap(),
        );
        let auth = extract_client_auth(&headers, &form).unwrap();
        assert_eq!(auth.client_id, "basic-client");
        assert_eq!(auth.client_secret.as_deref(), Some("basic:secret"));

        assert!(extract_client_auth(&HeaderMap::new(), &TokenForm::default()).is_none());
    }

    #[test]
    fn test_extract_client_auth_decodes_basic_credentials() {
        let mut headers = HeaderMap::new();
        let encoded = BASE64_STANDARD.encode("my%20client:p%25ss+word%2Bx%3Ay");
        headers.insert(
            axum::http::header::AUTHORIZATION,
            format!("Basic {}", encoded).parse().unwrap(),
        );

        let auth = extract_client_auth(&headers, &TokenForm::default()).unwrap();
        assert_eq!(auth.client_id, "my client");
        assert_eq!(auth.client_secret.as_deref(), Some("p%ss word+x:y"));

        // Invalid UTF-8 after decoding falls back to the form fields
        let encoded = BASE64_STANDARD.encode("client:%FF");
        headers.insert(
            axum::http::header::AUTHORIZATION,
            format!("Basic {}", encoded).parse().unwrap(),
        );
        assert!(extract_client_auth(&headers, &TokenForm::default()).is_none());
    }

    #[test]
    fn test_build_redirect_url_preserves_query() {
        let url = build_redirect_url("https://app.example/cb?x=1", "abc", Some("s t")).unwrap();
        assert_eq!(url, "https://app.example/cb?x=1&code=abc&state=s+t");
    }
}
