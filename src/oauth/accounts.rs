//! Local user accounts: signup, password login, and browser sessions.

use crate::errors::{AccountError, StorageError};
use crate::oauth::credentials::{CredentialVerifier, hash_secret};
use crate::oauth::types::{Session, User, generate_token};
use crate::storage::traits::OAuthStorage;
use chrono::{Duration, Utc};
use std::sync::{Arc, LazyLock};

static USERNAME_REGEX: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^[a-zA-Z0-9_]+$").expect("Invalid username regex"));

static EMAIL_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("Invalid email regex")
});

/// Verified against when the username is unknown so both paths pay the hash cost
static DUMMY_PASSWORD_HASH: LazyLock<String> =
    LazyLock::new(|| hash_secret("unknown-user-placeholder").unwrap_or_default());

const USERNAME_LENGTH: std::ops::RangeInclusive<usize> = 3..=50;
const PASSWORD_LENGTH: std::ops::RangeInclusive<usize> = 8..=128;

/// Signup form after trimming
#[derive(Debug, Clone)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Check a signup form, returning the first problem found.
pub fn validate_signup(form: &SignupForm) -> Result<(), AccountError> {
    if form.username.is_empty()
        || form.email.is_empty()
        || form.password.is_empty()
        || form.confirm_password.is_empty()
    {
        return Err(AccountError::InvalidInput(
            "All fields are required".to_string(),
        ));
    }

    if !USERNAME_LENGTH.contains(&form.username.chars().count()) {
        return Err(AccountError::InvalidInput(
            "Username must be between 3 and 50 characters".to_string(),
        ));
    }

    if !USERNAME_REGEX.is_match(&form.username) {
        return Err(AccountError::InvalidInput(
            "Username may only contain letters, numbers, and underscores".to_string(),
        ));
    }

    if !EMAIL_REGEX.is_match(&form.email) {
        return Err(AccountError::InvalidInput(
            "Invalid email address".to_string(),
        ));
    }

    if !PASSWORD_LENGTH.contains(&form.password.chars().count()) {
        return Err(AccountError::InvalidInput(
            "Password must be between 8 and 128 characters".to_string(),
        ));
    }

    if form.password != form.confirm_password {
        return Err(AccountError::InvalidInput(
            "Passwords do not match".to_string(),
        ));
    }

    Ok(())
}

/// Creates users and issues sessions for them.
pub struct AccountService {
    storage: Arc<dyn OAuthStorage>,
    credentials: Arc<dyn CredentialVerifier>,
    session_lifetime: Duration,
}

impl AccountService {
    pub fn new(storage: Arc<dyn OAuthStorage>, credentials: Arc<dyn CredentialVerifier>) -> Self {
        Self {
            storage,
            credentials,
            session_lifetime: Duration::hours(24),
        }
    }

    pub fn with_session_lifetime(mut self, session_lifetime: Duration) -> Self {
        self.session_lifetime = session_lifetime;
        self
    }

    pub fn session_lifetime(&self) -> Duration {
        self.session_lifetime
    }

    /// Verify a username and password and open a session.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AccountError> {
        if username.is_empty() || password.is_empty() {
            return Err(AccountError::InvalidInput(
                "Username and password are required".to_string(),
            ));
        }

        let user = self.storage.get_user_by_username(username).await?;

        let credentials = self.credentials.clone();
        let presented = password.to_string();
        let verify_user = user.clone().unwrap_or_else(|| {
            let now = Utc::now();
            User {
                user_id: String::new(),
                username: username.to_string(),
                email: String::new(),
                password_hash: DUMMY_PASSWORD_HASH.clone(),
                created_at: now,
                updated_at: now,
            }
        });
        let valid = tokio::task::spawn_blocking(move || {
            credentials.verify_password(&verify_user, &presented)
        })
        .await
        .map_err(|e| AccountError::HashingFailed(e.to_string()))?;

        match user {
            Some(user) if valid => self.open_session(&user.user_id).await,
            _ => {
                tracing::debug!(username = %username, "login rejected");
                Err(AccountError::InvalidCredentials)
            }
        }
    }

    /// Register a new user and log them in.
    pub async fn signup(&self, form: SignupForm) -> Result<Session, AccountError> {
        let user = self.register(form).await?;
        self.open_session(&user.user_id).await
    }

    /// Validate and store a new user without opening a session.
    pub async fn register(&self, form: SignupForm) -> Result<User, AccountError> {
        let form = SignupForm {
            username: form.username.trim().to_string(),
            email: form.email.trim().to_string(),
            ..form
        };
        validate_signup(&form)?;

        if self
            .storage
            .get_user_by_username(&form.username)
            .await?
            .is_some()
        {
            return Err(AccountError::UsernameTaken);
        }

        let credentials = self.credentials.clone();
        let password = form.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || credentials.hash(&password))
            .await
            .map_err(|e| AccountError::HashingFailed(e.to_string()))?
            .map_err(|e| AccountError::HashingFailed(e.to_string()))?;

        let now = Utc::now();
        let user = User {
            user_id: uuid::Uuid::new_v4().to_string(),
            username: form.username,
            email: form.email,
            password_hash,
            created_at: now,
            updated_at: now,
        };

        match self.storage.store_user(&user).await {
            Ok(()) => {}
            Err(StorageError::AlreadyExists(detail)) if detail.contains("email") => {
                return Err(AccountError::EmailTaken);
            }
            Err(StorageError::AlreadyExists(_)) => return Err(AccountError::UsernameTaken),
            Err(e) => return Err(e.into()),
        }

        tracing::info!(user_id = %user.user_id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Remove a session. Unknown sessions are ignored.
    pub async fn logout(&self, session_id: &str) -> Result<(), AccountError> {
        self.storage.delete_session(session_id).await?;
        Ok(())
    }

    async fn open_session(&self, user_id: &str) -> Result<Session, AccountError> {
        let now = Utc::now();
        let session = Session {
            session_id: generate_token(),
            user_id: user_id.to_string(),
            created_at: now,
            expires_at: now + self.session_lifetime,
        };
        self.storage.store_session(&session).await?;
        Ok(session)
    }
}
