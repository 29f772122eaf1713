//! The two authentication stages.
//!
//! Both are transport-agnostic: they receive the already-extracted method,
//! body or header value and return either an [`Identity`] or an
//! [`AuthFailure`]. Updating the execution context is the gateway's job.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    AuthFailure, ClaimSet, CredentialVerifier, Credentials, HttpMethod, Identity, TokenEngine,
    TokenKind, TokenPair, TokenVerifier, Verification,
};

// ─────────────────────────────────────────────────────────────────────────────
// Credential Stage
// ─────────────────────────────────────────────────────────────────────────────

/// Successful login: the bare identity plus its freshly issued tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
    pub identity: Identity,
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct CredentialStage {
    verifier: Arc<dyn CredentialVerifier>,
    tokens: TokenEngine,
}

impl CredentialStage {
    pub fn new(verifier: Arc<dyn CredentialVerifier>, tokens: TokenEngine) -> Self {
        Self { verifier, tokens }
    }

    pub async fn run(&self, method: &HttpMethod, body: &[u8]) -> Result<LoginGrant, AuthFailure> {
        self.run_at(method, body, Utc::now()).await
    }

    pub async fn run_at(
        &self,
        method: &HttpMethod,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<LoginGrant, AuthFailure> {
        if *method != HttpMethod::Post {
            return Err(AuthFailure::MethodNotSupported);
        }

        let credentials = Credentials::from_json(body).map_err(|e| {
            tracing::debug!(error = %e, "login body rejected");
            AuthFailure::BadRequest
        })?;

        let verification = self
            .verifier
            .verify(credentials.username(), credentials.secret())
            .await
            .map_err(|e| {
                // Fail closed; the client only ever sees an identity failure.
                tracing::error!(error = %e, "credential verifier failed");
                AuthFailure::BadCredentials
            })?;

        let record = match verification {
            Verification::Verified(record) => record,
            Verification::NotFound => return Err(AuthFailure::UserNotFound),
            Verification::Mismatch => return Err(AuthFailure::BadCredentials),
        };

        let identity = Identity::new(record.id);
        let tokens = self.tokens.issue_pair_at(&identity, now).map_err(|e| {
            tracing::error!(error = %e, "token issuance failed");
            AuthFailure::TokenIssue
        })?;

        Ok(LoginGrant { identity, tokens })
    }
}

impl core::fmt::Debug for CredentialStage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialStage").field("tokens", &self.tokens).finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Token Stage
// ─────────────────────────────────────────────────────────────────────────────

/// Where the bearer token travels: header name and scheme prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerScheme {
    header: String,
    prefix: String,
}

impl Default for BearerScheme {
    fn default() -> Self {
        Self::new("Authorization", "Bearer ")
    }
}

impl BearerScheme {
    pub fn new(header: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            prefix: prefix.into(),
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Pulls the token out of the header value.
    pub fn extract<'a>(&self, value: Option<&'a str>) -> Result<&'a str, AuthFailure> {
        let value = match value {
            Some(v) if !v.trim().is_empty() => v.trim(),
            _ => return Err(AuthFailure::MissingHeader),
        };
        let token = value
            .strip_prefix(self.prefix.as_str())
            .ok_or(AuthFailure::MalformedHeader)?
            .trim();
        if token.is_empty() {
            return Err(AuthFailure::MalformedHeader);
        }
        Ok(token)
    }
}

#[derive(Clone)]
pub struct TokenStage {
    verifier: Arc<dyn TokenVerifier>,
    scheme: BearerScheme,
}

impl TokenStage {
    pub fn new(verifier: Arc<dyn TokenVerifier>, scheme: BearerScheme) -> Self {
        Self { verifier, scheme }
    }

    pub fn scheme(&self) -> &BearerScheme {
        &self.scheme
    }

    pub fn run(&self, header_value: Option<&str>) -> Result<Identity, AuthFailure> {
        self.run_at(header_value, Utc::now())
    }

    /// Only access tokens authenticate protected requests.
    pub fn run_at(&self, header_value: Option<&str>, now: DateTime<Utc>) -> Result<Identity, AuthFailure> {
        let token = self.scheme.extract(header_value)?;
        let claims = self.verify_kind(token, TokenKind::Access, now)?;
        Ok(Identity::new(claims.user_id))
    }

    /// Verifies `token` and insists on `kind`.
    pub fn verify_kind(&self, token: &str, kind: TokenKind, now: DateTime<Utc>) -> Result<ClaimSet, AuthFailure> {
        let claims = self.verifier.verify_at(token, now)?;
        if claims.kind != kind {
            tracing::debug!(expected = %kind, presented = %claims.kind, "token kind rejected");
            return Err(AuthFailure::WrongTokenKind);
        }
        Ok(claims)
    }
}

impl core::fmt::Debug for TokenStage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenStage").field("scheme", &self.scheme).finish_non_exhaustive()
    }
}
