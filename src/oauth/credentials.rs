//! Client secret and password verification.
//!
//! Stored client secrets are either plaintext or an Argon2 PHC string. Plaintext
//! secrets compare in constant time; PHC strings verify through Argon2.
//! User passwords are always stored as Argon2 PHC strings.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use subtle::ConstantTimeEq;

use super::types::{OAuthClient, User};

const PHC_PREFIX: &str = "$argon2";

/// Verifies credentials presented by clients and users.
pub trait CredentialVerifier: Send + Sync {
    /// Check a presented client secret against the client's stored secret.
    fn verify_client_secret(&self, client: &OAuthClient, secret: &str) -> bool;

    /// Check a presented password against the user's stored hash.
    fn verify_password(&self, user: &User, password: &str) -> bool;

    /// Produce a storable hash of a password or secret.
    fn hash(&self, value: &str) -> Result<String, argon2::password_hash::Error>;
}

/// Default verifier backed by Argon2id.
#[derive(Clone, Default)]
pub struct Argon2CredentialVerifier;

impl CredentialVerifier for Argon2CredentialVerifier {
    fn verify_client_secret(&self, client: &OAuthClient, secret: &str) -> bool {
        if client.client_secret.starts_with(PHC_PREFIX) {
            verify_hash(secret, &client.client_secret)
        } else {
            constant_time_eq(secret, &client.client_secret)
        }
    }

    fn verify_password(&self, user: &User, password: &str) -> bool {
        verify_hash(password, &user.password_hash)
    }

    fn hash(&self, value: &str) -> Result<String, argon2::password_hash::Error> {
        hash_secret(value)
    }
}

/// Hash a secret for storage using Argon2id with a random salt.
pub fn hash_secret(secret: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(secret.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_hash(secret: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = ?e, "stored credential hash is malformed");
            false
        }
    }
}

fn constant_time_eq(presented: &str, stored: &str) -> bool {
    presented.as_bytes().ct_eq(stored.as_bytes()).into()
}
