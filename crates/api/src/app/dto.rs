use std::collections::BTreeSet;

use serde::Serialize;

use gatewarden_auth::{Identity, TokenPair};
use gatewarden_core::RequestId;

#[derive(Debug, Serialize)]
pub struct FailureBody {
    pub code: u16,
    pub subcode: &'static str,
    pub message: &'static str,
}

/// Login and refresh success body.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub refresh_token: String,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            token: pair.access_token,
            refresh_token: pair.refresh_token,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub name: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub request_id: String,
    pub user_id: String,
    pub permissions: BTreeSet<String>,
}

impl WhoAmIResponse {
    pub fn new(identity: &Identity, request_id: RequestId) -> Self {
        Self {
            request_id: request_id.to_string(),
            user_id: identity.id().to_string(),
            permissions: identity.permissions().iter().map(|p| p.as_str().to_string()).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResourceResponse {
    pub resource: &'static str,
    pub user_id: String,
}
