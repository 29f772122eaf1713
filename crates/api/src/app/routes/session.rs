use axum::{Extension, Json};

use gatewarden_auth::TokenPair;

use crate::app::dto::TokenResponse;

/// Renders the pair issued by the credential stage.
pub async fn login(Extension(tokens): Extension<TokenPair>) -> Json<TokenResponse> {
    Json(tokens.into())
}

/// Renders the pair issued by the refresh exchange.
pub async fn refresh(Extension(tokens): Extension<TokenPair>) -> Json<TokenResponse> {
    Json(tokens.into())
}
