//! Token engine: stateless signer/verifier for access and refresh tokens.
//!
//! Tokens are compact HS256 JWS strings carrying a [`ClaimSet`]. Validity is
//! decided purely by signature and expiry; nothing is stored server-side.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use crate::{ClaimSet, Identity, TokenKind};

const ALGORITHM: Algorithm = Algorithm::HS256;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Signing key and lifetimes for the two token kinds.
#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

impl TokenConfig {
    /// One hour access, two hours refresh.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_ttl_secs: 3600,
            refresh_ttl_secs: 7200,
        }
    }

    pub fn with_ttls(mut self, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        self.access_ttl_secs = access_ttl_secs;
        self.refresh_ttl_secs = refresh_ttl_secs;
        self
    }
}

impl core::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"[REDACTED]")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

/// Misconfiguration detected while building the engine. Fatal at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenConfigError {
    #[error("signing key is empty")]
    EmptyKey,

    #[error("{0} lifetime must be a positive number of seconds")]
    InvalidTtl(TokenKind),

    #[error("access token lifetime must be shorter than refresh token lifetime")]
    AccessNotShorter,
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Why a presented token was refused.
///
/// The two kinds are deliberately distinct: an expired token can prompt a
/// refresh, a malformed one forces a new login.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Unparseable structure or signature mismatch.
    #[error("malformed token")]
    Malformed,

    /// Well signed, but `expires_at <= now`.
    #[error("token expired")]
    Expired,
}

/// Failure to mint a token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IssueError {
    #[error("expiry timestamp out of range")]
    ExpiryOutOfRange,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Verifier seam
// ─────────────────────────────────────────────────────────────────────────────

/// Capability used by the Token Stage to turn a presented string into claims.
pub trait TokenVerifier: Send + Sync {
    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<ClaimSet, TokenError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// Access + refresh tokens issued from the same instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// HS256 token signer/verifier. Cheap to clone; keys are shared.
#[derive(Clone)]
pub struct TokenEngine {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
    access_ttl: TimeDelta,
    refresh_ttl: TimeDelta,
}

impl TokenEngine {
    pub fn new(config: TokenConfig) -> Result<Self, TokenConfigError> {
        if config.secret.is_empty() {
            return Err(TokenConfigError::EmptyKey);
        }
        if config.secret.len() < 32 {
            tracing::warn!("signing key is shorter than recommended (32 bytes)");
        }

        let access_ttl = positive_ttl(config.access_ttl_secs, TokenKind::Access)?;
        let refresh_ttl = positive_ttl(config.refresh_ttl_secs, TokenKind::Refresh)?;
        if access_ttl >= refresh_ttl {
            return Err(TokenConfigError::AccessNotShorter);
        }

        // Expiry is checked by hand against the caller's clock, without leeway.
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string(), "sub".to_string()]);

        Ok(Self {
            encoding_key: Arc::new(EncodingKey::from_secret(config.secret.as_bytes())),
            decoding_key: Arc::new(DecodingKey::from_secret(config.secret.as_bytes())),
            validation: Arc::new(validation),
            access_ttl,
            refresh_ttl,
        })
    }

    pub fn ttl(&self, kind: TokenKind) -> TimeDelta {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    pub fn issue(&self, identity: &Identity, kind: TokenKind) -> Result<String, IssueError> {
        self.issue_at(identity, kind, Utc::now())
    }

    /// Signs a token for `identity` as if the current time were `now`.
    pub fn issue_at(
        &self,
        identity: &Identity,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<String, IssueError> {
        let claims = self.claims_for(identity, kind, now)?;
        encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| IssueError::Signing(e.to_string()))
    }

    pub fn issue_pair(&self, identity: &Identity) -> Result<TokenPair, IssueError> {
        self.issue_pair_at(identity, Utc::now())
    }

    pub fn issue_pair_at(&self, identity: &Identity, now: DateTime<Utc>) -> Result<TokenPair, IssueError> {
        Ok(TokenPair {
            access_token: self.issue_at(identity, TokenKind::Access, now)?,
            refresh_token: self.issue_at(identity, TokenKind::Refresh, now)?,
        })
    }

    pub fn verify(&self, token: &str) -> Result<ClaimSet, TokenError> {
        self.verify_at(token, Utc::now())
    }

    fn claims_for(&self, identity: &Identity, kind: TokenKind, now: DateTime<Utc>) -> Result<ClaimSet, IssueError> {
        let issued_at = Utc
            .timestamp_opt(now.timestamp(), 0)
            .single()
            .ok_or(IssueError::ExpiryOutOfRange)?;
        let expires_at = issued_at
            .checked_add_signed(self.ttl(kind))
            .ok_or(IssueError::ExpiryOutOfRange)?;

        Ok(ClaimSet {
            subject: identity.id().to_string(),
            user_id: identity.id().clone(),
            kind,
            issued_at,
            expires_at,
        })
    }
}

impl TokenVerifier for TokenEngine {
    /// Signature first, expiry second: a tampered token is never reported as
    /// expired.
    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<ClaimSet, TokenError> {
        let data = decode::<ClaimSet>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "token failed decoding or signature check");
            TokenError::Malformed
        })?;

        let claims = data.claims;
        if claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

impl core::fmt::Debug for TokenEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenEngine")
            .field("algorithm", &ALGORITHM)
            .field("access_ttl_secs", &self.access_ttl.num_seconds())
            .field("refresh_ttl_secs", &self.refresh_ttl.num_seconds())
            .finish()
    }
}

fn positive_ttl(secs: i64, kind: TokenKind) -> Result<TimeDelta, TokenConfigError> {
    if secs <= 0 {
        return Err(TokenConfigError::InvalidTtl(kind));
    }
    TimeDelta::try_seconds(secs).ok_or(TokenConfigError::InvalidTtl(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatewarden_core::UserId;

    const SECRET: &str = "test-secret-key-that-is-long-enough-for-testing";

    fn engine() -> TokenEngine {
        TokenEngine::new(TokenConfig::new(SECRET)).unwrap()
    }

    fn identity(id: &str) -> Identity {
        Identity::new(UserId::new(id).unwrap())
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn config_rejects_empty_key_and_bad_ttls() {
        assert_eq!(
            TokenEngine::new(TokenConfig::new("")).unwrap_err(),
            TokenConfigError::EmptyKey
        );
        assert_eq!(
            TokenEngine::new(TokenConfig::new(SECRET).with_ttls(0, 10)).unwrap_err(),
            TokenConfigError::InvalidTtl(TokenKind::Access)
        );
        assert_eq!(
            TokenEngine::new(TokenConfig::new(SECRET).with_ttls(10, -1)).unwrap_err(),
            TokenConfigError::InvalidTtl(TokenKind::Refresh)
        );
        assert_eq!(
            TokenEngine::new(TokenConfig::new(SECRET).with_ttls(60, 60)).unwrap_err(),
            TokenConfigError::AccessNotShorter
        );
    }

    #[test]
    fn issued_access_token_verifies_with_same_user() {
        let engine = engine();
        let token = engine.issue(&identity("1"), TokenKind::Access).unwrap();

        let claims = engine.verify(&token).unwrap();
        assert_eq!(claims.user_id.as_str(), "1");
        assert_eq!(claims.subject, "1");
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[test]
    fn pair_shares_issue_time_and_differs_in_kind_and_expiry() {
        let engine = engine();
        let now = at(1_700_000_000);
        let pair = engine.issue_pair_at(&identity("1"), now).unwrap();

        let access = engine.verify_at(&pair.access_token, now).unwrap();
        let refresh = engine.verify_at(&pair.refresh_token, now).unwrap();

        assert_eq!(access.kind, TokenKind::Access);
        assert_eq!(refresh.kind, TokenKind::Refresh);
        assert_eq!(access.issued_at, refresh.issued_at);
        assert_eq!(access.expires_at, now + TimeDelta::seconds(3600));
        assert_eq!(refresh.expires_at, now + TimeDelta::seconds(7200));
    }

    #[test]
    fn issue_truncates_to_whole_seconds() {
        let engine = engine();
        let now = Utc.timestamp_opt(1_700_000_000, 750_000_000).unwrap();
        let token = engine.issue_at(&identity("1"), TokenKind::Access, now).unwrap();

        let claims = engine.verify_at(&token, now).unwrap();
        assert_eq!(claims.issued_at, at(1_700_000_000));
    }

    #[test]
    fn expired_token_reports_expired() {
        let engine = engine();
        let token = engine.issue_at(&identity("1"), TokenKind::Access, at(1_000)).unwrap();

        assert_eq!(engine.verify_at(&token, at(4_600)), Err(TokenError::Expired));
        assert!(engine.verify_at(&token, at(4_599)).is_ok());
    }

    #[test]
    fn foreign_key_and_garbage_are_malformed() {
        let other = TokenEngine::new(TokenConfig::new("another-secret-key-for-the-test-suite")).unwrap();
        let token = other.issue(&identity("1"), TokenKind::Access).unwrap();

        let engine = engine();
        assert_eq!(engine.verify(&token), Err(TokenError::Malformed));
        assert_eq!(engine.verify("invalid.token.here"), Err(TokenError::Malformed));
        assert_eq!(engine.verify(""), Err(TokenError::Malformed));
    }

    #[test]
    fn expired_token_under_foreign_key_is_malformed_not_expired() {
        let other = TokenEngine::new(TokenConfig::new("another-secret-key-for-the-test-suite")).unwrap();
        let token = other.issue_at(&identity("1"), TokenKind::Access, at(1_000)).unwrap();

        assert_eq!(engine().verify_at(&token, at(1_000_000)), Err(TokenError::Malformed));
    }

    #[test]
    fn unsigned_token_is_malformed() {
        // {"alg":"none","typ":"JWT"} . {"sub":"1","user_id":"1","token_type":"access_token","iat":1,"exp":9999999999}
        let token = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.\
                     eyJzdWIiOiIxIiwidXNlcl9pZCI6IjEiLCJ0b2tlbl90eXBlIjoiYWNjZXNzX3Rva2VuIiwiaWF0IjoxLCJleHAiOjk5OTk5OTk5OTl9.";
        assert_eq!(engine().verify_at(token, at(2)), Err(TokenError::Malformed));
    }

    #[test]
    fn debug_output_hides_secret() {
        let printed = format!("{:?} {:?}", TokenConfig::new(SECRET), engine());
        assert!(!printed.contains(SECRET));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 64,
                ..ProptestConfig::default()
            })]

            /// Property: verify(issue(id, Access)) yields the same user id and kind.
            #[test]
            fn access_round_trip_preserves_user(id in "[A-Za-z0-9_-]{1,24}") {
                let engine = engine();
                let now = at(1_700_000_000);
                let token = engine.issue_at(&identity(&id), TokenKind::Access, now).unwrap();

                let claims = engine.verify_at(&token, now).unwrap();
                prop_assert_eq!(claims.user_id.as_str(), id.as_str());
                prop_assert_eq!(claims.kind, TokenKind::Access);
            }

            /// Property: valid at issued_at, expired at any instant >= expires_at.
            #[test]
            fn expiry_is_a_sharp_boundary(
                refresh in any::<bool>(),
                issued in 0i64..2_000_000_000,
                after in 0i64..1_000_000,
            ) {
                let engine = engine();
                let kind = if refresh { TokenKind::Refresh } else { TokenKind::Access };
                let token = engine.issue_at(&identity("u"), kind, at(issued)).unwrap();
                let expires = issued + engine.ttl(kind).num_seconds();

                prop_assert!(engine.verify_at(&token, at(issued)).is_ok());
                prop_assert_eq!(engine.verify_at(&token, at(expires + after)), Err(TokenError::Expired));
            }

            /// Property: changing one character never yields Expired, only Malformed.
            #[test]
            fn single_character_tamper_is_malformed(
                index in any::<prop::sample::Index>(),
                issued in 0i64..2_000_000_000,
                late in any::<bool>(),
            ) {
                let engine = engine();
                let token = engine.issue_at(&identity("u"), TokenKind::Access, at(issued)).unwrap();

                let mut chars: Vec<char> = token.chars().collect();
                let i = index.index(chars.len());
                chars[i] = if chars[i] == 'A' { 'B' } else { 'A' };
                let tampered: String = chars.into_iter().collect();

                // Checked both before and after expiry.
                let now = if late { at(issued + 1_000_000) } else { at(issued) };
                prop_assert_eq!(engine.verify_at(&tampered, now), Err(TokenError::Malformed));
            }
        }
    }
}
