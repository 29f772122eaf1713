//! `gatewarden-infra`: collaborator implementations for the gateway,
//! user directories and secret matching.

pub mod directory;
pub mod secret;

pub use directory::{
    DirectoryBuilder, InMemoryUserDirectory, SeedError, SeedFile, SeedUser, UserEntry,
    load_seed_file,
};
#[cfg(feature = "postgres")]
pub use directory::postgres::PgUserDirectory;
pub use secret::{BcryptMatcher, ConstantTimeMatcher, SecretMatcher};
