//! Standardized error types following the `error-oauth2-<domain>-<number>` format.

use http::StatusCode;
use thiserror::Error;

/// Configuration errors that occur during application startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error when PORT cannot be parsed
    #[error("error-oauth2-config-1 Parsing PORT into u16 failed: {0:?}")]
    PortParsingFailed(std::num::ParseIntError),

    /// Error when version information is not available
    #[error("error-oauth2-config-2 One of GIT_HASH or CARGO_PKG_VERSION must be set")]
    VersionNotSet,

    /// Error when duration string cannot be parsed
    #[error("error-oauth2-config-3 Failed to parse duration '{0}': {1}")]
    DurationParsingFailed(String, String),

    /// Error when boolean string cannot be parsed
    #[error(
        "error-oauth2-config-4 Failed to parse boolean '{0}': expected true/false/1/0/yes/no/on/off"
    )]
    BoolParsingFailed(String),

    /// Error when an integer setting cannot be parsed
    #[error("error-oauth2-config-5 Failed to parse {0}: {1}")]
    NumberParsingFailed(String, std::num::ParseIntError),

    /// Error when the storage backend name is not recognized
    #[error("error-oauth2-config-6 Unknown storage backend: {0}")]
    UnknownStorageBackend(String),

    /// Error when a timeout or interval is zero
    #[error("error-oauth2-config-7 Duration '{0}' must be greater than zero")]
    ZeroDuration(String),
}

/// OAuth protocol errors raised by the authorization and token engines
#[derive(Debug, Error)]
pub enum OAuthError {
    /// The authorization request has no client_id
    #[error("error-oauth2-oauth-1 client_id is required")]
    MissingClientId,

    /// The authorization request has no redirect_uri
    #[error("error-oauth2-oauth-2 redirect_uri is required")]
    MissingRedirectUri,

    /// Unsupported response type
    #[error("error-oauth2-oauth-3 Unsupported response type: {0}")]
    UnsupportedResponseType(String),

    /// Unknown client or failed client authentication
    #[error("error-oauth2-oauth-4 Invalid client: {0}")]
    InvalidClient(String),

    /// Redirect URI is not registered for the client
    #[error("error-oauth2-oauth-5 Invalid redirect URI: {0}")]
    InvalidRedirectUri(String),

    /// No valid session; the caller must log in and resume
    #[error("error-oauth2-oauth-6 Authentication required")]
    AuthenticationRequired,

    /// Invalid request
    #[error("error-oauth2-oauth-7 Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid, expired, replayed, or mismatched authorization code, or failed PKCE
    #[error("error-oauth2-oauth-8 Invalid grant: {0}")]
    InvalidGrant(String),

    /// Unsupported grant type
    #[error("error-oauth2-oauth-9 Unsupported grant type: {0}")]
    UnsupportedGrantType(String),

    /// Invalid scope
    #[error("error-oauth2-oauth-10 Invalid scope: {0}")]
    InvalidScope(String),

    /// Server error
    #[error("error-oauth2-oauth-11 Server error: {0}")]
    ServerError(String),

    /// The operation did not complete within its time bound
    #[error("error-oauth2-oauth-12 Temporarily unavailable: {0}")]
    TemporarilyUnavailable(String),
}

impl OAuthError {
    /// Wire-level error code reported in JSON error bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            OAuthError::MissingClientId => "missing_client_id",
            OAuthError::MissingRedirectUri => "missing_redirect_uri",
            OAuthError::UnsupportedResponseType(_) => "unsupported_response_type",
            OAuthError::InvalidClient(_) => "invalid_client",
            OAuthError::InvalidRedirectUri(_) => "invalid_redirect_uri",
            OAuthError::AuthenticationRequired => "authentication_required",
            OAuthError::InvalidRequest(_) => "invalid_request",
            OAuthError::InvalidGrant(_) => "invalid_grant",
            OAuthError::UnsupportedGrantType(_) => "unsupported_grant_type",
            OAuthError::InvalidScope(_) => "invalid_scope",
            OAuthError::ServerError(_) => "server_error",
            OAuthError::TemporarilyUnavailable(_) => "temporarily_unavailable",
        }
    }

    /// HTTP status for this error at the token endpoint.
    pub fn status_code(&self) -> StatusCode {
        match self {
            OAuthError::InvalidClient(_) => StatusCode::UNAUTHORIZED,
            OAuthError::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OAuthError::TemporarilyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            // Handlers redirect to login instead of rendering this one.
            OAuthError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Account errors raised by login and signup
#[derive(Debug, Error)]
pub enum AccountError {
    /// Submitted form data failed validation
    #[error("error-oauth2-account-1 Invalid input: {0}")]
    InvalidInput(String),

    /// Username is already registered
    #[error("error-oauth2-account-2 Username already taken")]
    UsernameTaken,

    /// Email is already registered
    #[error("error-oauth2-account-3 Email already registered")]
    EmailTaken,

    /// Username or password is wrong
    #[error("error-oauth2-account-4 Invalid username or password")]
    InvalidCredentials,

    /// Backing store failed
    #[error("error-oauth2-account-5 Storage failure: {0}")]
    Storage(#[from] StorageError),

    /// Password hashing failed
    #[error("error-oauth2-account-6 Password hashing failed: {0}")]
    HashingFailed(String),
}

impl AccountError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AccountError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AccountError::UsernameTaken | AccountError::EmailTaken => StatusCode::CONFLICT,
            AccountError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AccountError::Storage(_) | AccountError::HashingFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Database/storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Error when database connection fails
    #[error("error-oauth2-storage-1 Database connection failed: {0}")]
    ConnectionFailed(String),

    /// Error when query execution fails
    #[error("error-oauth2-storage-2 Query execution failed: {0}")]
    QueryFailed(String),

    /// Error when data serialization fails
    #[error("error-oauth2-storage-3 Data serialization failed: {0}")]
    SerializationFailed(String),

    /// Error when database operation fails
    #[error("error-oauth2-storage-4 Database error: {0}")]
    DatabaseError(String),

    /// Error when data validation fails
    #[error("error-oauth2-storage-5 Invalid data: {0}")]
    InvalidData(String),

    /// Error when requested resource is not found
    #[error("error-oauth2-storage-6 Not found: {0}")]
    NotFound(String),

    /// Error when a unique key is already present
    #[error("error-oauth2-storage-7 Already exists: {0}")]
    AlreadyExists(String),
}
