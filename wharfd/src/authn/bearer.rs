//! Bearer token issuance and verification.
//!
//! Wire format is `"<hex-id>.<hex-secret>"`. Only an argon2id hash of the
//! secret half is ever stored; the plaintext is returned to the caller
//! exactly once at issuance.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use secrecy::SecretString;
use tracing::info;

use crate::errors::ControlError;
use crate::models::credentials::BearerTokenRecord;
use crate::registry::Registry;
use crate::utils::random_hex;

const ID_BYTES: usize = 8;
const SECRET_BYTES: usize = 32;

/// Collision probability is negligible but checked, not assumed
const MAX_ID_ATTEMPTS: usize = 8;

/// Split a `"Bearer <id>.<secret>"` authorization header
pub fn parse_bearer(header: &str) -> Option<(&str, &str)> {
    header.strip_prefix("Bearer ")?.trim().split_once('.')
}

/// Hash a secret with a slow, salted one-way function
pub fn hash_secret(secret: &str) -> Result<String, ControlError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| ControlError::TokenError(format!("hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

/// Constant-time verification of a secret against its stored hash
pub fn verify_secret(secret: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok()
}

/// Issue a new bearer token, retrying identifier generation until an
/// unused identifier is found. Returns the plaintext `"<id>.<secret>"`;
/// it is never stored or retrievable again.
pub async fn create_bearer_token(
    registry: &dyn Registry,
    full_permissions: bool,
) -> Result<SecretString, ControlError> {
    for _ in 0..MAX_ID_ATTEMPTS {
        let id = random_hex(ID_BYTES);
        if registry.get_bearer_token(&id).await?.is_some() {
            continue;
        }

        let secret = random_hex(SECRET_BYTES);
        let record = BearerTokenRecord {
            id: id.clone(),
            token_hash: hash_secret(&secret)?,
            full_permissions,
        };
        registry.save_bearer_token(&record).await?;

        info!("Issued bearer token {} (full={})", id, full_permissions);
        return Ok(SecretString::from(format!("{}.{}", id, secret)));
    }

    Err(ControlError::Conflict(
        "could not find an unused token identifier".to_string(),
    ))
}
