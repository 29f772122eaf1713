//! `gatewarden-core`: identifiers and error primitives shared by every crate.
//!
//! Nothing in here knows about HTTP, tokens or storage.

pub mod error;
pub mod id;

pub use error::{CoreError, CoreResult};
pub use id::{RequestId, UserId};
