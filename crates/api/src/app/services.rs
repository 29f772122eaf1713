//! Collaborator wiring: picks the user directory the gateway talks to.

use std::sync::Arc;

use thiserror::Error;

use gatewarden_auth::{CredentialVerifier, PermissionLookup};
use gatewarden_infra::{InMemoryUserDirectory, SeedError, load_seed_file};

use crate::config::GatewayConfig;

#[derive(Debug, Error)]
pub enum DirectoryInitError {
    #[error(transparent)]
    Seed(#[from] SeedError),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    Database(#[from] gatewarden_auth::DirectoryError),
}

/// Both collaborator roles, usually served by the same directory.
#[derive(Clone)]
pub struct Directory {
    pub verifier: Arc<dyn CredentialVerifier>,
    pub permissions: Arc<dyn PermissionLookup>,
}

impl Directory {
    fn shared<D>(directory: D) -> Self
    where
        D: CredentialVerifier + PermissionLookup + 'static,
    {
        let directory = Arc::new(directory);
        Self {
            verifier: directory.clone(),
            permissions: directory,
        }
    }
}

/// Database (with the `postgres` feature and a URL), then seed file, then
/// the built-in demo accounts.
pub async fn build_directory(config: &GatewayConfig) -> Result<Directory, DirectoryInitError> {
    #[cfg(feature = "postgres")]
    {
        if let Some(url) = &config.database_url {
            let directory = gatewarden_infra::PgUserDirectory::connect(url).await?;
            return Ok(Directory::shared(directory));
        }
    }

    if let Some(path) = &config.users_file {
        return Ok(Directory::shared(load_seed_file(path)?));
    }

    if config.database_url.is_some() {
        tracing::warn!("database url set but the postgres feature is disabled; ignoring it");
    }
    tracing::warn!("no user source configured; using built-in demo accounts");
    Ok(Directory::shared(InMemoryUserDirectory::demo()))
}
