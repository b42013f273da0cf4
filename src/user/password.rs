// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the authcore project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Password hashing primitive
//!
//! The core only consumes the [`PasswordHasher`] interface; the default
//! implementation uses Argon2id through the `password-hash` API. Hashes are
//! stored in PHC string format (`$argon2id$...`), so parameters and salt
//! travel with the hash.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString};
use argon2::Argon2;

use crate::error::AuthError;

/// Interface for the password hashing primitive
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password for storage
    fn hash(&self, plaintext: &str) -> Result<String, AuthError>;

    /// Verify a plaintext password against a stored hash
    ///
    /// Any failure (unparseable hash, mismatch) reports `false`; the caller
    /// treats that uniformly as bad credentials.
    fn verify(&self, plaintext: &str, hash: &str) -> bool;
}

/// Argon2id implementation with the crate's default parameters
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2PasswordHasher;

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))
    }

    fn verify(&self, plaintext: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hasher = Argon2PasswordHasher;
        let hash = hasher.hash("Secret123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("Secret123", &hash));
        assert!(!hasher.verify("secret123", &hash));
    }

    #[test]
    fn same_password_hashes_differently_per_salt() {
        let hasher = Argon2PasswordHasher;
        let a = hasher.hash("Secret123").unwrap();
        let b = hasher.hash("Secret123").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn unparseable_hash_verifies_false() {
        let hasher = Argon2PasswordHasher;
        assert!(!hasher.verify("whatever", "not-a-phc-string"));
    }
}
