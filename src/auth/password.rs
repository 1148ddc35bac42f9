//! Admin password hashing.
//!
//! New hashes are Argon2id PHC strings (`$argon2id$v=19$...`). Accounts
//! carried over from the old local data files hold PBKDF2 hashes in the form
//! `pbkdf2$<iterations>$<salt>$<digest>$<hex>`; those still verify and are
//! reported by [`needs_rehash`] so login can upgrade them.
//!
//! Both algorithms are CPU-bound. Request handlers use the `*_async`
//! variants, which run on tokio's blocking pool.

use anyhow::{bail, Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use pbkdf2::pbkdf2_hmac;
use sha2::{Sha256, Sha512};

const ARGON2ID_PREFIX: &str = "$argon2id$";
const LEGACY_PREFIX: &str = "pbkdf2$";

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {}", e))?;

    Ok(password_hash.to_string())
}

/// Check a password against a stored hash.
///
/// A wrong password is `Ok(false)`; a hash in neither supported format is
/// an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    if hash.starts_with(LEGACY_PREFIX) {
        return verify_legacy(password, hash);
    }

    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Unrecognized admin password hash: {}", e))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Password verification failed: {}", e)),
    }
}

/// True for any stored hash that is not Argon2id.
pub fn needs_rehash(hash: &str) -> bool {
    !hash.starts_with(ARGON2ID_PREFIX)
}

pub async fn hash_password_async(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .context("Password hashing task failed")?
}

pub async fn verify_password_async(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .context("Password verification task failed")?
}

/// The salt is used as its literal text, not hex-decoded.
fn verify_legacy(password: &str, hash: &str) -> Result<bool> {
    let parts: Vec<&str> = hash.split('$').collect();
    let [_, iterations, salt, digest, expected] = parts[..] else {
        bail!("Malformed pbkdf2 hash");
    };

    let iterations: u32 = iterations.parse().context("Invalid pbkdf2 iteration count")?;
    if iterations == 0 || expected.is_empty() || expected.len() % 2 != 0 {
        bail!("Malformed pbkdf2 hash");
    }

    let mut derived = vec![0u8; expected.len() / 2];
    match digest {
        "sha256" => pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut derived),
        "sha512" => pbkdf2_hmac::<Sha512>(password.as_bytes(), salt.as_bytes(), iterations, &mut derived),
        other => bail!("Unsupported pbkdf2 digest: {}", other),
    }

    let actual: String = derived.iter().map(|b| format!("{:02x}", b)).collect();
    Ok(constant_time_eq(
        actual.as_bytes(),
        expected.to_ascii_lowercase().as_bytes(),
    ))
}

/// Byte comparison whose running time does not depend on where the inputs
/// first differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    // pbkdf2-hmac-sha256("legacy-pass", "0a1b2c3d4e5f", 1000 rounds, 32 bytes)
    const LEGACY_HASH: &str =
        "pbkdf2$1000$0a1b2c3d4e5f$sha256$7b958770a2877dde78c77a556a3acbe1b3319b055b69a76759d4cc6261c74b75";

    #[test]
    fn test_hash_is_salted_argon2id() {
        let first = hash_password("admin-secret").unwrap();
        let second = hash_password("admin-secret").unwrap();

        assert!(first.starts_with(ARGON2ID_PREFIX));
        assert!(!first.contains("admin-secret"));
        assert_ne!(first, second);
        assert!(!needs_rehash(&first));
    }

    #[test]
    fn test_verify_argon2_password() {
        let hash = hash_password("密码测试").unwrap();

        assert!(verify_password("密码测试", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_verify_legacy_pbkdf2_hash() {
        assert!(verify_password("legacy-pass", LEGACY_HASH).unwrap());
        assert!(!verify_password("legacy-pas", LEGACY_HASH).unwrap());
        assert!(needs_rehash(LEGACY_HASH));

        let upper = LEGACY_HASH.replace("7b958770a2", "7B958770A2");
        assert!(verify_password("legacy-pass", &upper).unwrap());
    }

    #[test]
    fn test_unusable_hashes_are_errors() {
        // Plaintext left over from old dev data is not a hash at all.
        assert!(verify_password("admin123", "admin123").is_err());
        assert!(verify_password("x", "pbkdf2$1000$salt$md5$abcd").is_err());
        assert!(verify_password("x", "pbkdf2$0$salt$sha256$abcd").is_err());
        assert!(verify_password("x", "pbkdf2$1000$salt$sha256").is_err());
        assert!(needs_rehash("admin123"));
    }

    #[tokio::test]
    async fn test_async_variants() {
        let hash = hash_password_async("from-handler".to_string()).await.unwrap();
        assert!(verify_password_async("from-handler".to_string(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password_async("other".to_string(), hash).await.unwrap());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"admin", b"admin"));
        assert!(!constant_time_eq(b"admin", b"admix"));
        assert!(!constant_time_eq(b"admin", b"admin1"));
        assert!(constant_time_eq(b"", b""));
    }
}
