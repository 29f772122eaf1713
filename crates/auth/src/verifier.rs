//! Collaborator contracts consumed by the pipeline.
//!
//! The pipeline never sees storage. It talks to a user directory through the
//! two traits below; `gatewarden-infra` ships the implementations.

use std::collections::BTreeSet;

use async_trait::async_trait;
use thiserror::Error;

use gatewarden_core::UserId;

use crate::{Permission, Secret};

/// A user record as returned by a successful credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
}

/// Outcome of a credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Verified(UserRecord),
    NotFound,
    Mismatch,
}

/// The directory itself failed (connection lost, corrupt record, ...).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("user directory unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt directory record: {0}")]
    Corrupt(String),
}

/// "Given username + secret, return a user or a not-found/mismatch signal."
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, username: &str, secret: &Secret) -> Result<Verification, DirectoryError>;
}

/// "Given a user id, return its permission codes."
#[async_trait]
pub trait PermissionLookup: Send + Sync {
    async fn by_user_id(&self, id: &UserId) -> Result<BTreeSet<Permission>, DirectoryError>;
}
