//! Secret comparison.
//!
//! A [`SecretMatcher`] is handed the stored value and the presented one and
//! answers yes or no. Plain seed secrets use [`ConstantTimeMatcher`]; BCrypt
//! hashes (`$2a$`, `$2b$`, `$2y$`) use [`BcryptMatcher`].

use subtle::ConstantTimeEq;

pub trait SecretMatcher: Send + Sync {
    fn matches(&self, stored: &str, presented: &str) -> bool;
}

/// Compares plain stored secrets without an early exit on the first
/// differing byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantTimeMatcher;

impl SecretMatcher for ConstantTimeMatcher {
    fn matches(&self, stored: &str, presented: &str) -> bool {
        let (a, b) = (stored.as_bytes(), presented.as_bytes());
        if a.len() != b.len() {
            return false;
        }
        a.ct_eq(b).into()
    }
}

/// Checks the presented secret against a stored BCrypt hash.
///
/// A stored value that is not a valid hash never matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct BcryptMatcher;

impl SecretMatcher for BcryptMatcher {
    fn matches(&self, stored: &str, presented: &str) -> bool {
        match bcrypt::verify(presented, stored) {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!(error = %e, "stored secret is not a bcrypt hash");
                false
            }
        }
    }
}
