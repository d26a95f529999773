// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password hashing.

/// Lowest cost bcrypt accepts.
pub const MIN_BCRYPT_COST: u32 = 4;
/// Highest cost bcrypt accepts.
pub const MAX_BCRYPT_COST: u32 = 31;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
}

/// One-way password hash and verify.
///
/// Implementations are CPU bound; callers run them on the blocking pool.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, PasswordError>;

    /// `Ok(false)` for a wrong password, `Err` only for an unusable hash.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError>;
}

/// bcrypt with a configurable cost.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(MIN_BCRYPT_COST, MAX_BCRYPT_COST),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, PasswordError> {
        bcrypt::hash(password, self.cost).map_err(|e| PasswordError::Hash(e.to_string()))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        bcrypt::verify(password, hash).map_err(|e| PasswordError::MalformedHash(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hasher = BcryptHasher::new(MIN_BCRYPT_COST);
        let hash = hasher.hash("correct horse").unwrap();
        assert_ne!(hash, "correct horse");
        assert!(hasher.verify("correct horse", &hash).unwrap());
        assert!(!hasher.verify("battery staple", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        let hasher = BcryptHasher::new(MIN_BCRYPT_COST);
        assert!(matches!(
            hasher.verify("pw", "not-a-bcrypt-hash"),
            Err(PasswordError::MalformedHash(_))
        ));
    }

    #[test]
    fn cost_is_clamped() {
        assert_eq!(BcryptHasher::new(1).cost(), MIN_BCRYPT_COST);
        assert_eq!(BcryptHasher::new(99).cost(), MAX_BCRYPT_COST);
        assert_eq!(BcryptHasher::new(12).cost(), 12);
    }
}
