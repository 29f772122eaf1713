use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use gatewarden_auth::{Permission, Role};
use gatewarden_core::UserId;

use super::{InMemoryUserDirectory, SeedError, UserEntry};

/// JSON seed for the in-memory directory.
///
/// ```json
/// {
///   "roles": { "r1": ["p1"], "admin": ["*"] },
///   "users": [{ "id": "1", "username": "zhangsan", "secret": "123", "roles": ["r1"] }]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    #[serde(default)]
    pub roles: BTreeMap<String, Vec<String>>,
    pub users: Vec<SeedUser>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedUser {
    pub id: String,
    pub username: String,
    #[serde(alias = "password")]
    pub secret: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl SeedFile {
    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        serde_json::from_str(json).map_err(|e| SeedError::Parse(e.to_string()))
    }

    pub fn into_directory(self) -> Result<InMemoryUserDirectory, SeedError> {
        let mut builder = InMemoryUserDirectory::builder();
        for (role, permissions) in self.roles {
            builder = builder.role(Role::new(role), permissions.into_iter().map(Permission::from));
        }
        for user in self.users {
            let id = UserId::new(user.id.clone()).map_err(|_| SeedError::InvalidId(user.id))?;
            builder = builder.user(UserEntry {
                id,
                username: user.username,
                secret: user.secret,
                roles: user.roles.into_iter().map(Role::new).collect(),
            });
        }
        builder.build()
    }
}

/// Reads and validates a seed file.
pub fn load_seed_file(path: impl AsRef<Path>) -> Result<InMemoryUserDirectory, SeedError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|e| SeedError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let directory = SeedFile::from_json(&json)?.into_directory()?;
    tracing::info!(path = %path.display(), users = directory.len(), "loaded user seed file");
    Ok(directory)
}
