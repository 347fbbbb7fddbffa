//! PKCE (RFC 7636) challenge verification.

use base64::prelude::*;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::types::PkceMethod;

/// Parse a stored or requested challenge method.
///
/// An empty or absent method means `plain`. Unknown methods yield `None`.
pub fn parse_method(method: Option<&str>) -> Option<PkceMethod> {
    match method.unwrap_or_default() {
        "" | "plain" => Some(PkceMethod::Plain),
        "S256" => Some(PkceMethod::S256),
        _ => None,
    }
}

/// Compute the S256 challenge for a verifier.
pub fn s256_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    BASE64_URL_SAFE_NO_PAD.encode(hash)
}

/// Check a submitted verifier against the stored challenge under the stored method.
pub fn verify(method: &str, verifier: &str, challenge: &str) -> bool {
    let expected = match parse_method(Some(method)) {
        Some(PkceMethod::S256) => s256_challenge(verifier),
        Some(PkceMethod::Plain) => verifier.to_string(),
        None => return false,
    };
    expected.as_bytes().ct_eq(challenge.as_bytes()).into()
}
