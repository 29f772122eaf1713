//! `gatewarden-auth`: token lifecycle, request classification, the
//! two-stage authentication pipeline and the authorization decision.
//!
//! This crate is intentionally decoupled from HTTP and storage. Transports
//! hand it paths, methods, bodies and header values; directories plug in
//! through [`CredentialVerifier`] and [`PermissionLookup`].

pub mod authorize;
pub mod claims;
pub mod classifier;
pub mod context;
pub mod credentials;
pub mod failure;
pub mod identity;
pub mod permissions;
pub mod pipeline;
pub mod roles;
pub mod stages;
pub mod token;
pub mod verifier;

pub use authorize::{
    AuthorizationStage, Decision, PermissionRequirements, RequirementsBuilder, Resource, authorize,
};
pub use claims::{ClaimSet, TokenKind};
pub use classifier::{
    ClassifierBuilder, HttpMethod, Matcher, PUBLIC_ENDPOINTS, PathPattern, PatternError,
    RequestClassifier, RequestMatchRule,
};
pub use context::{AuthState, ExecutionContext, TransitionError};
pub use credentials::{Credentials, CredentialsError, Secret};
pub use failure::{AuthFailure, FailureTranslator, Subcode, TranslatedFailure};
pub use identity::Identity;
pub use permissions::Permission;
pub use pipeline::{AuthAttempt, DEFAULT_LOGIN_PATH, DEFAULT_REFRESH_PATH, Gateway, GatewayBuilder, Route};
pub use roles::Role;
pub use stages::{BearerScheme, CredentialStage, LoginGrant, TokenStage};
pub use token::{
    IssueError, TokenConfig, TokenConfigError, TokenEngine, TokenError, TokenPair, TokenVerifier,
};
pub use verifier::{CredentialVerifier, DirectoryError, PermissionLookup, UserRecord, Verification};
