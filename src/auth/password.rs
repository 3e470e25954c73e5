//! Password hashing
//!
//! Stored format: `pbkdf2-sha256$<rounds>$<salt>$<hash>` with unpadded
//! URL-safe base64 for salt and hash. Rounds are stored per hash so the
//! configured cost can change without invalidating existing accounts.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::Sha256;

use crate::error::AppError;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// Hash `password` with a fresh random salt
pub fn hash_password(password: &str, rounds: u32) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);

    let hash = derive(password, &salt, rounds);
    format!(
        "{}${}${}${}",
        SCHEME,
        rounds,
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(hash)
    )
}

/// Check `password` against a stored hash
///
/// # Errors
/// Returns `AppError::Internal` if the stored hash is malformed
pub fn verify_password(password: &str, stored: &str) -> Result<bool, AppError> {
    let malformed = || AppError::Internal(anyhow::anyhow!("malformed password hash"));

    let mut parts = stored.split('$');
    let (Some(scheme), Some(rounds), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(malformed());
    };

    if scheme != SCHEME {
        return Err(malformed());
    }
    let rounds: u32 = rounds.parse().map_err(|_| malformed())?;
    let salt = URL_SAFE_NO_PAD.decode(salt).map_err(|_| malformed())?;
    let expected = URL_SAFE_NO_PAD.decode(hash).map_err(|_| malformed())?;

    let actual = derive(password, &salt, rounds);
    Ok(constant_time_eq(&actual, &expected))
}

fn derive(password: &str, salt: &[u8], rounds: u32) -> [u8; HASH_LEN] {
    let mut out = [0u8; HASH_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, rounds, &mut out);
    out
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right.iter())
        .fold(0u8, |acc, (l, r)| acc | (l ^ r))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_password_verifies() {
        let stored = hash_password("hunter22", 1_000);
        assert!(stored.starts_with("pbkdf2-sha256$1000$"));
        assert!(verify_password("hunter22", &stored).unwrap());
    }

    #[test]
    fn wrong_password_fails() {
        let stored = hash_password("hunter22", 1_000);
        assert!(!verify_password("hunter23", &stored).unwrap());
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(hash_password("same", 10), hash_password("same", 10));
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("x", "plain-text").is_err());
        assert!(verify_password("x", "bcrypt$10$abc$def").is_err());
        assert!(verify_password("x", "pbkdf2-sha256$many$abc$def").is_err());
    }
}
