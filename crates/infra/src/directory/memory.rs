use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;

use gatewarden_auth::{
    CredentialVerifier, DirectoryError, Permission, PermissionLookup, Role, Secret, UserRecord,
    Verification,
};
use gatewarden_core::UserId;

use crate::secret::{ConstantTimeMatcher, SecretMatcher};

use super::SeedError;

/// One account: login name, stored secret and role memberships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntry {
    pub id: UserId,
    pub username: String,
    pub secret: String,
    pub roles: BTreeSet<Role>,
}

/// Immutable user → role → permission directory.
///
/// Built once at startup and shared through `Arc`; reads take no locks.
#[derive(Clone)]
pub struct InMemoryUserDirectory {
    by_username: HashMap<String, UserEntry>,
    by_id: HashMap<UserId, String>,
    role_permissions: BTreeMap<Role, BTreeSet<Permission>>,
    matcher: Arc<dyn SecretMatcher>,
}

impl InMemoryUserDirectory {
    pub fn builder() -> DirectoryBuilder {
        DirectoryBuilder::default()
    }

    /// Two demo accounts: `zhangsan`/`123` (p1) and `lisi`/`456` (p2).
    pub fn demo() -> Self {
        Self {
            by_username: HashMap::new(),
            by_id: HashMap::new(),
            role_permissions: BTreeMap::new(),
            matcher: Arc::new(ConstantTimeMatcher),
        }
        .with_demo_data()
    }

    fn with_demo_data(mut self) -> Self {
        let demo = [("1", "zhangsan", "123", "r1", "p1"), ("2", "lisi", "456", "r2", "p2")];
        for (id, username, secret, role, permission) in demo {
            let Ok(id) = UserId::new(id) else { continue };
            self.role_permissions
                .entry(Role::new(role))
                .or_default()
                .insert(Permission::new(permission));
            self.by_id.insert(id.clone(), username.to_string());
            self.by_username.insert(
                username.to_string(),
                UserEntry {
                    id,
                    username: username.to_string(),
                    secret: secret.to_string(),
                    roles: BTreeSet::from([Role::new(role)]),
                },
            );
        }
        self
    }

    pub fn len(&self) -> usize {
        self.by_username.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_username.is_empty()
    }

    /// Union of the permissions of every role `id` holds.
    pub fn permissions_of(&self, id: &UserId) -> BTreeSet<Permission> {
        let Some(entry) = self.by_id.get(id).and_then(|name| self.by_username.get(name)) else {
            return BTreeSet::new();
        };
        entry
            .roles
            .iter()
            .filter_map(|role| self.role_permissions.get(role))
            .flatten()
            .cloned()
            .collect()
    }
}

impl core::fmt::Debug for InMemoryUserDirectory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryUserDirectory")
            .field("users", &self.by_username.len())
            .field("roles", &self.role_permissions.len())
            .finish()
    }
}

#[async_trait]
impl CredentialVerifier for InMemoryUserDirectory {
    async fn verify(&self, username: &str, secret: &Secret) -> Result<Verification, DirectoryError> {
        let Some(entry) = self.by_username.get(username) else {
            tracing::debug!(username, "unknown user");
            return Ok(Verification::NotFound);
        };
        if !self.matcher.matches(&entry.secret, secret.expose()) {
            tracing::debug!(username, "secret mismatch");
            return Ok(Verification::Mismatch);
        }
        Ok(Verification::Verified(UserRecord {
            id: entry.id.clone(),
            username: entry.username.clone(),
        }))
    }
}

#[async_trait]
impl PermissionLookup for InMemoryUserDirectory {
    async fn by_user_id(&self, id: &UserId) -> Result<BTreeSet<Permission>, DirectoryError> {
        Ok(self.permissions_of(id))
    }
}

/// Validating builder: ids and usernames are unique and every referenced
/// role is defined.
#[derive(Default)]
pub struct DirectoryBuilder {
    users: Vec<UserEntry>,
    role_permissions: BTreeMap<Role, BTreeSet<Permission>>,
    matcher: Option<Arc<dyn SecretMatcher>>,
}

impl DirectoryBuilder {
    pub fn role(mut self, role: Role, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.role_permissions.entry(role).or_default().extend(permissions);
        self
    }

    pub fn user(mut self, entry: UserEntry) -> Self {
        self.users.push(entry);
        self
    }

    pub fn matcher(mut self, matcher: Arc<dyn SecretMatcher>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn build(self) -> Result<InMemoryUserDirectory, SeedError> {
        let mut by_username = HashMap::with_capacity(self.users.len());
        let mut by_id = HashMap::with_capacity(self.users.len());

        for entry in self.users {
            if let Some(role) = entry.roles.iter().find(|r| !self.role_permissions.contains_key(*r)) {
                return Err(SeedError::UnknownRole {
                    username: entry.username,
                    role: role.to_string(),
                });
            }
            if by_id.contains_key(&entry.id) {
                return Err(SeedError::DuplicateId(entry.id.to_string()));
            }
            if by_username.contains_key(&entry.username) {
                return Err(SeedError::DuplicateUsername(entry.username));
            }
            by_id.insert(entry.id.clone(), entry.username.clone());
            by_username.insert(entry.username.clone(), entry);
        }

        Ok(InMemoryUserDirectory {
            by_username,
            by_id,
            role_permissions: self.role_permissions,
            matcher: self.matcher.unwrap_or_else(|| Arc::new(ConstantTimeMatcher)),
        })
    }
}
