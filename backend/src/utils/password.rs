//! Password hashing with Argon2id.
//!
//! Digests are PHC strings (`$argon2id$v=19$...`) that embed the algorithm,
//! parameters and salt, so verification needs nothing but the digest itself.

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;

    Ok(password_hash.to_string())
}

/// Checks `password` against a stored digest.
///
/// Returns `false` for a mismatch and for any digest that cannot be parsed;
/// the comparison itself is constant-time inside `argon2`.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!(error = %err, "Stored password digest is malformed");
            return false;
        }
    };

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => true,
        Err(argon2::password_hash::Error::Password) => false,
        Err(err) => {
            tracing::warn!(error = %err, "Password verification failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = hash_password("correct").expect("hash should succeed");
        assert!(verify_password("correct", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn digest_is_self_describing_and_salted() {
        let first = hash_password("same-input").expect("hash");
        let second = hash_password("same-input").expect("hash");
        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_digest_verifies_false() {
        assert!(!verify_password("anything", "not-a-digest"));
        assert!(!verify_password("anything", ""));
        assert!(!verify_password("anything", "$argon2id$v=19$garbage"));
    }

    #[test]
    fn long_passwords_are_accepted() {
        let long = "x".repeat(4096);
        let hash = hash_password(&long).expect("hash");
        assert!(verify_password(&long, &hash));
        assert!(!verify_password(&long[..4095], &hash));
    }
}
