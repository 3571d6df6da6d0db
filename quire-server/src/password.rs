//! Password hashing with argon2 PHC strings
//!
//! Request handlers use the async [`hash`] and [`verify`], which keep the
//! CPU-bound argon2 work off the runtime threads.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordError(String);

/// Hash `password` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
        .map_err(|e| PasswordError(e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check `password` against a stored PHC string. A malformed hash never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is malformed");
            false
        }
    }
}

/// [`hash_password`] on the blocking pool.
pub async fn hash(password: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| PasswordError(format!("hashing task failed: {e}")))?
}

/// [`verify_password`] on the blocking pool. A failed task never matches.
pub async fn verify(password: String, hash: String) -> bool {
    match tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await {
        Ok(matched) => matched,
        Err(e) => {
            tracing::error!(error = %e, "password verification task failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blocking_pool_round_trip() {
        let hash = hash("hunter2".into()).await.unwrap();
        assert!(verify("hunter2".into(), hash.clone()).await);
        assert!(!verify("hunter3".into(), hash).await);
    }

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn salts_differ() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn garbage_hash_never_matches() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
