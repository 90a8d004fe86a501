//! Argon2id hashing shared by passwords and API tokens.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::{AppError, AppResult};

/// Hash a password or token with argon2id and a random salt.
pub fn hash_secret(secret: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// Check `secret` against a stored PHC hash string. A malformed stored hash is
/// an error; a mismatch is `Ok(false)`.
pub fn verify_secret(secret: &str, stored: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid stored hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_secret("hunter2").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_secret("hunter2", &hash).unwrap());
        assert!(!verify_secret("hunter3", &hash).unwrap());
    }

    #[test]
    fn test_same_secret_hashes_differently() {
        assert_ne!(hash_secret("x").unwrap(), hash_secret("x").unwrap());
    }

    #[test]
    fn test_malformed_hash_is_error() {
        assert!(verify_secret("x", "not-a-hash").is_err());
    }
}
