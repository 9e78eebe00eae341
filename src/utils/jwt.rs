// src/utils/jwt.rs

use std::collections::HashSet;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;

/// The subset of claims the client cares about.
#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    /// Expiration time as Unix timestamp (seconds).
    exp: Option<i64>,
}

/// Reads the `exp` claim of a bearer token without verifying its signature.
///
/// The client never holds the signing secret; the server remains the authority
/// on validity. Returns `None` for opaque (non-JWT) tokens or tokens without `exp`.
pub fn token_expiry(token: &str) -> Option<i64> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    decode::<ExpiryClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .and_then(|data| data.claims.exp)
}

/// Whether the token carries an `exp` claim that lies in the past.
pub fn is_expired(token: &str, now_millis: i64) -> bool {
    match token_expiry(token) {
        Some(exp) => exp.saturating_mul(1000) <= now_millis,
        None => false,
    }
}
