//! HTTP application wiring (Axum router + gateway wiring).
//!
//! - `services.rs`: collaborator wiring (user directory selection)
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::Router;
use thiserror::Error;

use gatewarden_auth::{
    CredentialVerifier, FailureTranslator, Gateway, HttpMethod, PUBLIC_ENDPOINTS, PatternError,
    PermissionLookup, PermissionRequirements, RequestClassifier, TokenConfigError, TokenEngine,
};

use crate::config::GatewayConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Startup-fatal wiring errors.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid token configuration: {0}")]
    Token(#[from] TokenConfigError),

    #[error("invalid route pattern: {0}")]
    Pattern(#[from] PatternError),

    #[error("login and refresh share the path '{0}'")]
    PathClash(String),
}

/// Builds the gateway: public endpoints bypass, everything else requires a
/// bearer token; `/r/r1` needs `p1` and `/r/r2` needs `p2`.
pub fn build_gateway(
    config: &GatewayConfig,
    verifier: Arc<dyn CredentialVerifier>,
    permissions: Arc<dyn PermissionLookup>,
) -> Result<Gateway, BuildError> {
    if config.login_path == config.refresh_path {
        return Err(BuildError::PathClash(config.login_path.clone()));
    }
    let engine = TokenEngine::new(config.token_config())?;

    let classifier = RequestClassifier::builder()
        .allow(&config.login_path)
        .allow(&config.refresh_path)
        .allow_method("/version", HttpMethod::Get)
        .allow_method("/version", HttpMethod::Head)
        .allow_all(PUBLIC_ENDPOINTS.iter().copied())
        .require("/**")
        .build()?;

    let requirements = PermissionRequirements::builder()
        .route("/r/r1", "p1")
        .route("/r/r2", "p2")
        .build()?;

    Ok(Gateway::builder(engine, verifier, permissions)
        .classifier(classifier)
        .login_path(config.login_path.clone())
        .refresh_path(config.refresh_path.clone())
        .scheme(config.bearer_scheme())
        .requirements(requirements)
        .translator(FailureTranslator::new(config.disclose_accounts))
        .build())
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(
    config: &GatewayConfig,
    verifier: Arc<dyn CredentialVerifier>,
    permissions: Arc<dyn PermissionLookup>,
) -> Result<Router, BuildError> {
    let gateway = build_gateway(config, verifier, permissions)?;
    tracing::info!(?gateway, "gateway configured");

    let state = middleware::GatewayState {
        gateway: Arc::new(gateway),
    };

    Ok(routes::router(&config.login_path, &config.refresh_path).layer(
        axum::middleware::from_fn_with_state(state, middleware::gateway_middleware),
    ))
}
