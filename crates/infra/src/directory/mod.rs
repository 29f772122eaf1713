//! User directories: the collaborators behind credential verification and
//! permission lookup.

mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
mod seed;

use thiserror::Error;

pub use memory::{DirectoryBuilder, InMemoryUserDirectory, UserEntry};
pub use seed::{SeedFile, SeedUser, load_seed_file};

/// Problems with a directory's source data. Fatal at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SeedError {
    #[error("cannot read seed file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("invalid seed file: {0}")]
    Parse(String),

    #[error("invalid user id: {0}")]
    InvalidId(String),

    #[error("user '{username}' references undefined role '{role}'")]
    UnknownRole { username: String, role: String },

    #[error("duplicate user id '{0}'")]
    DuplicateId(String),

    #[error("duplicate username '{0}'")]
    DuplicateUsername(String),
}
