//! Password hashing and verification.
//!
//! Argon2id with a random per-password salt, stored as a PHC string.
//! Both operations are deliberately slow, so they run on the blocking pool.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),
    #[error("Invalid password hash format")]
    InvalidHashFormat,
    #[error("Hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Hash a plaintext password into a PHC string.
pub async fn hash_password(password: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password_blocking(&password)).await?
}

/// Compare a plaintext password against a stored PHC hash.
/// Returns `Ok(false)` on mismatch; errors are reserved for unreadable hashes.
pub async fn verify_password(password: String, hash: String) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_password_blocking(&password, &hash)).await?
}

fn hash_password_blocking(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
}

fn verify_password_blocking(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::HashingFailed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_never_equals_plaintext() {
        let hash = hash_password("pw1".to_string()).await.unwrap();
        assert_ne!(hash, "pw1");
        assert!(hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_verify_correct_and_wrong() {
        let hash = hash_password("correct horse".to_string()).await.unwrap();
        assert!(
            verify_password("correct horse".to_string(), hash.clone())
                .await
                .unwrap()
        );
        assert!(
            !verify_password("correct horse ".to_string(), hash.clone())
                .await
                .unwrap()
        );
        assert!(!verify_password(String::new(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_same_password_different_salts() {
        let a = hash_password("pw".to_string()).await.unwrap();
        let b = hash_password("pw".to_string()).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_garbage_hash_is_error() {
        let result = verify_password("pw".to_string(), "not-a-hash".to_string()).await;
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));
    }
}
