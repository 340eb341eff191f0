//! Salted password hashes.

use std::fmt;

use bcrypt::{hash, verify};

use crate::{EngineError, ResultEngine};

/// A salted and hashed password, as stored in `users.password`.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct PasswordHash(String);

impl PasswordHash {
    pub(crate) const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

    /// Hashes `raw_password` with the given bcrypt `cost`.
    pub(crate) fn new(raw_password: &str, cost: u32) -> ResultEngine<Self> {
        if raw_password.is_empty() {
            return Err(EngineError::InvalidName(
                "password must not be empty".to_string(),
            ));
        }
        hash(raw_password, cost)
            .map(Self)
            .map_err(|err| EngineError::Hashing(err.to_string()))
    }

    pub(crate) fn from_stored(raw_hash: String) -> Self {
        Self(raw_hash)
    }

    /// Checks `raw_password` against the hash.
    ///
    /// A malformed stored hash never matches.
    pub(crate) fn verify(&self, raw_password: &str) -> bool {
        verify(raw_password, &self.0).unwrap_or(false)
    }

    pub(crate) fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(********)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_only_the_original_password() {
        let hash = PasswordHash::new("hunter2", 4).unwrap();
        assert!(hash.verify("hunter2"));
        assert!(!hash.verify("hunter3"));
    }

    #[test]
    fn empty_password_is_rejected() {
        assert!(matches!(
            PasswordHash::new("", 4),
            Err(EngineError::InvalidName(_))
        ));
    }

    #[test]
    fn malformed_hash_never_matches() {
        let hash = PasswordHash::from_stored("not a bcrypt hash".to_string());
        assert!(!hash.verify("anything"));
    }

    #[test]
    fn debug_hides_the_hash() {
        let hash = PasswordHash::new("hunter2", 4).unwrap();
        assert_eq!(format!("{hash:?}"), "PasswordHash(********)");
    }
}
