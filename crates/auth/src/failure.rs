//! Failure kinds and the translator that maps them to stable wire codes.

use thiserror::Error;

use crate::TokenError;

/// Every way the gateway can refuse a request.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthFailure {
    #[error("method not supported for this action")]
    MethodNotSupported,

    #[error("missing or unparseable credentials")]
    BadRequest,

    #[error("user not found")]
    UserNotFound,

    #[error("bad credentials")]
    BadCredentials,

    #[error("authorization header missing")]
    MissingHeader,

    #[error("authorization header malformed")]
    MalformedHeader,

    #[error("malformed token")]
    Malformed,

    #[error("token expired")]
    Expired,

    #[error("wrong token kind")]
    WrongTokenKind,

    #[error("insufficient permission")]
    InsufficientPermission,

    #[error("unauthenticated")]
    Unauthenticated,

    /// Tokens could not be minted for an otherwise successful login.
    #[error("token issuance failed")]
    TokenIssue,
}

impl AuthFailure {
    /// Stable snake_case label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MethodNotSupported => "method_not_supported",
            Self::BadRequest => "bad_request",
            Self::UserNotFound => "user_not_found",
            Self::BadCredentials => "bad_credentials",
            Self::MissingHeader => "missing_header",
            Self::MalformedHeader => "malformed_header",
            Self::Malformed => "malformed",
            Self::Expired => "expired",
            Self::WrongTokenKind => "wrong_token_kind",
            Self::InsufficientPermission => "insufficient_permission",
            Self::Unauthenticated => "unauthenticated",
            Self::TokenIssue => "token_issue",
        }
    }
}

impl From<TokenError> for AuthFailure {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::Malformed => Self::Malformed,
            TokenError::Expired => Self::Expired,
        }
    }
}

/// Wire subcode. Several failure kinds share one subcode so that the wire
/// never tells a client more than it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subcode {
    ClientMethod,
    ClientInput,
    Identity,
    TokenFormat,
    TokenLifecycle,
    Authorization,
    Internal,
}

impl Subcode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientMethod => "client-method",
            Self::ClientInput => "client-input",
            Self::Identity => "identity",
            Self::TokenFormat => "token-format",
            Self::TokenLifecycle => "token-lifecycle",
            Self::Authorization => "authorization",
            Self::Internal => "internal",
        }
    }
}

impl core::fmt::Display for Subcode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `(status, subcode, message)` ready to be rendered by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslatedFailure {
    pub status: u16,
    pub subcode: Subcode,
    pub message: &'static str,
}

pub const UNAUTHORIZED: u16 = 401;
pub const INTERNAL_ERROR: u16 = 500;

/// Single sink that turns failures into wire errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureTranslator {
    disclose_accounts: bool,
}

impl FailureTranslator {
    /// With `disclose_accounts` off (the default) an unknown user and a wrong
    /// secret are indistinguishable on the wire.
    pub fn new(disclose_accounts: bool) -> Self {
        Self { disclose_accounts }
    }

    pub fn translate(&self, failure: AuthFailure) -> TranslatedFailure {
        let (subcode, message) = match failure {
            AuthFailure::MethodNotSupported => (Subcode::ClientMethod, "method not allowed for this action"),
            AuthFailure::BadRequest => (Subcode::ClientInput, "missing required fields"),
            AuthFailure::UserNotFound if self.disclose_accounts => (Subcode::Identity, "account not found"),
            AuthFailure::UserNotFound | AuthFailure::BadCredentials => (Subcode::Identity, "invalid credentials"),
            AuthFailure::MissingHeader | AuthFailure::MalformedHeader | AuthFailure::Unauthenticated => {
                (Subcode::TokenFormat, "missing or invalid token")
            }
            AuthFailure::Malformed | AuthFailure::WrongTokenKind => (Subcode::TokenFormat, "invalid token"),
            AuthFailure::Expired => (Subcode::TokenLifecycle, "token expired"),
            AuthFailure::InsufficientPermission => (Subcode::Authorization, "access denied"),
            AuthFailure::TokenIssue => {
                return TranslatedFailure {
                    status: INTERNAL_ERROR,
                    subcode: Subcode::Internal,
                    message: "internal error",
                };
            }
        };

        TranslatedFailure {
            status: UNAUTHORIZED,
            subcode,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIENT_FAILURES: [AuthFailure; 11] = [
        AuthFailure::MethodNotSupported,
        AuthFailure::BadRequest,
        AuthFailure::UserNotFound,
        AuthFailure::BadCredentials,
        AuthFailure::MissingHeader,
        AuthFailure::MalformedHeader,
        AuthFailure::Malformed,
        AuthFailure::Expired,
        AuthFailure::WrongTokenKind,
        AuthFailure::InsufficientPermission,
        AuthFailure::Unauthenticated,
    ];

    #[test]
    fn every_client_failure_is_unauthorized() {
        let t = FailureTranslator::default();
        for f in CLIENT_FAILURES {
            assert_eq!(t.translate(f).status, UNAUTHORIZED, "{f:?}");
        }
    }

    #[test]
    fn identity_failures_are_indistinguishable_by_default() {
        let t = FailureTranslator::default();
        assert_eq!(t.translate(AuthFailure::UserNotFound), t.translate(AuthFailure::BadCredentials));
        assert_eq!(t.translate(AuthFailure::UserNotFound).message, "invalid credentials");
    }

    #[test]
    fn disclosure_reveals_unknown_accounts() {
        let t = FailureTranslator::new(true);
        let not_found = t.translate(AuthFailure::UserNotFound);
        assert_eq!(not_found.subcode, Subcode::Identity);
        assert_eq!(not_found.message, "account not found");
        assert_eq!(t.translate(AuthFailure::BadCredentials).message, "invalid credentials");
    }

    #[test]
    fn token_subcodes() {
        let t = FailureTranslator::default();
        assert_eq!(t.translate(AuthFailure::Expired).subcode.as_str(), "token-lifecycle");
        assert_eq!(t.translate(AuthFailure::MissingHeader).subcode.as_str(), "token-format");
        assert_eq!(t.translate(AuthFailure::Malformed).message, "invalid token");
        assert_eq!(t.translate(AuthFailure::WrongTokenKind).message, "invalid token");
        assert_eq!(
            t.translate(AuthFailure::InsufficientPermission).subcode.as_str(),
            "authorization"
        );
    }

    #[test]
    fn issuance_failure_is_internal() {
        let out = FailureTranslator::default().translate(AuthFailure::TokenIssue);
        assert_eq!(out.status, INTERNAL_ERROR);
        assert_eq!(out.subcode, Subcode::Internal);
    }

    #[test]
    fn token_errors_convert_unchanged() {
        assert_eq!(AuthFailure::from(TokenError::Expired), AuthFailure::Expired);
        assert_eq!(AuthFailure::from(TokenError::Malformed), AuthFailure::Malformed);
    }
}
