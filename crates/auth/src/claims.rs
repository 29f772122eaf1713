use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gatewarden_core::UserId;

/// The two token kinds issued together at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// Short-lived token presented on every protected request.
    #[serde(rename = "access_token")]
    Access,

    /// Longer-lived token only accepted by the refresh exchange.
    #[serde(rename = "refresh_token")]
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access_token",
            TokenKind::Refresh => "refresh_token",
        }
    }
}

impl core::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claim set embedded in every signed token.
///
/// Timestamps travel as whole seconds since the epoch (`iat`/`exp`), so any
/// sub-second precision is dropped at issue time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSet {
    /// Subject; always the user id.
    #[serde(rename = "sub")]
    pub subject: String,

    pub user_id: UserId,

    #[serde(rename = "token_type")]
    pub kind: TokenKind,

    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl ClaimSet {
    /// True once `now` has reached `expires_at` (second granularity, no leeway).
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.expires_at.timestamp()
    }
}
