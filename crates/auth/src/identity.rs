use std::collections::BTreeSet;

use serde::Serialize;

use gatewarden_core::UserId;

use crate::Permission;

/// The verified principal attached to one request.
///
/// An `Identity` is immutable: attaching permissions produces a new value.
/// The Credential Stage and the Token Stage both create it with the id only;
/// permissions are resolved later, right before the authorization decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    id: UserId,
    permissions: BTreeSet<Permission>,
}

impl Identity {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            permissions: BTreeSet::new(),
        }
    }

    /// Returns a copy of this identity carrying exactly `permissions`.
    pub fn with_permissions(&self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            id: self.id.clone(),
            permissions: permissions.into_iter().collect(),
        }
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn permissions(&self) -> &BTreeSet<Permission> {
        &self.permissions
    }

    /// True when `required` is granted directly or through the wildcard.
    pub fn has_permission(&self, required: &Permission) -> bool {
        self.permissions.contains(required) || self.permissions.iter().any(Permission::is_wildcard)
    }
}
