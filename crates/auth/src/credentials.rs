//! Login credentials.
//!
//! The secret half is wrapped so it never shows up in `Debug` output or logs.

use serde::Deserialize;

use gatewarden_core::CoreError;

/// A presented secret (password). `Debug` is redacted and there is no `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Exposes the raw secret. Only verifiers should call this.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for Secret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

/// Username + secret pair submitted to the login route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    secret: Secret,
}

impl Credentials {
    /// Builds credentials, rejecting blank fields.
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Result<Self, CoreError> {
        let username = username.into();
        let secret = secret.into();
        if username.trim().is_empty() {
            return Err(CoreError::Blank("username"));
        }
        if secret.trim().is_empty() {
            return Err(CoreError::Blank("secret"));
        }
        Ok(Self {
            username,
            secret: Secret::new(secret),
        })
    }

    /// Parses a JSON login body (`{"username": .., "secret": ..}`, with
    /// `password` accepted in place of `secret`).
    pub fn from_json(body: &[u8]) -> Result<Self, CredentialsError> {
        let raw: RawLogin = serde_json::from_slice(body).map_err(|_| CredentialsError::Unparseable)?;
        let username = raw.username.unwrap_or_default();
        let secret = raw.secret.unwrap_or_default();
        Self::new(username, secret).map_err(CredentialsError::Blank)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("login body is not valid JSON")]
    Unparseable,

    #[error(transparent)]
    Blank(CoreError),
}

#[derive(Deserialize)]
struct RawLogin {
    username: Option<String>,
    #[serde(alias = "password")]
    secret: Option<String>,
}
