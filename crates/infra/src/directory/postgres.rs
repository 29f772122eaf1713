//! Postgres-backed directory over the classic RBAC tables:
//! `t_user`, `t_user_role`, `t_role_permission`, `t_permission`.
//!
//! Ids are read as text so integer and string keys both work.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use gatewarden_auth::{
    CredentialVerifier, DirectoryError, Permission, PermissionLookup, Secret, UserRecord,
    Verification,
};
use gatewarden_core::UserId;

use crate::secret::{BcryptMatcher, SecretMatcher};

const USER_BY_NAME: &str = "SELECT CAST(id AS TEXT), username, password FROM t_user WHERE username = $1";

const PERMISSIONS_BY_USER: &str = "SELECT DISTINCT p.code FROM t_permission p \
     WHERE CAST(p.id AS TEXT) IN ( \
         SELECT CAST(rp.permission_id AS TEXT) FROM t_role_permission rp \
         WHERE CAST(rp.role_id AS TEXT) IN ( \
             SELECT CAST(ur.role_id AS TEXT) FROM t_user_role ur \
             WHERE CAST(ur.user_id AS TEXT) = $1))";

#[derive(Clone)]
pub struct PgUserDirectory {
    pool: Arc<PgPool>,
    matcher: Arc<dyn SecretMatcher>,
}

impl PgUserDirectory {
    /// Passwords in `t_user` are BCrypt hashes.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
            matcher: Arc::new(BcryptMatcher),
        }
    }

    pub async fn connect(url: &str) -> Result<Self, DirectoryError> {
        let pool = PgPool::connect(url).await.map_err(unavailable)?;
        tracing::info!("connected to user database");
        Ok(Self::new(pool))
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn SecretMatcher>) -> Self {
        self.matcher = matcher;
        self
    }
}

fn unavailable(e: sqlx::Error) -> DirectoryError {
    DirectoryError::Unavailable(e.to_string())
}

#[async_trait]
impl CredentialVerifier for PgUserDirectory {
    async fn verify(&self, username: &str, secret: &Secret) -> Result<Verification, DirectoryError> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(USER_BY_NAME)
            .bind(username)
            .fetch_all(&*self.pool)
            .await
            .map_err(unavailable)?;

        if rows.len() > 1 {
            tracing::warn!(username, count = rows.len(), "duplicate usernames in t_user");
        }
        let Some((id, username, stored)) = rows.into_iter().next() else {
            return Ok(Verification::NotFound);
        };
        if !self.matcher.matches(&stored, secret.expose()) {
            return Ok(Verification::Mismatch);
        }

        let id = UserId::new(id).map_err(|e| DirectoryError::Corrupt(e.to_string()))?;
        Ok(Verification::Verified(UserRecord { id, username }))
    }
}

#[async_trait]
impl PermissionLookup for PgUserDirectory {
    async fn by_user_id(&self, id: &UserId) -> Result<BTreeSet<Permission>, DirectoryError> {
        let rows: Vec<(String,)> = sqlx::query_as(PERMISSIONS_BY_USER)
            .bind(id.as_str())
            .fetch_all(&*self.pool)
            .await
            .map_err(unavailable)?;
        Ok(rows.into_iter().map(|(code,)| Permission::from(code)).collect())
    }
}
