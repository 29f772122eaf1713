use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::Response;

use gatewarden_auth::{AuthFailure, ExecutionContext, FailureTranslator, Identity};

use crate::app::errors::failure_response;

/// The authenticated caller, as attached by the gateway middleware.
///
/// Rejects with `Unauthenticated` when the route was reached without an
/// identity (for example a bypassed route).
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| failure_response(FailureTranslator::default().translate(AuthFailure::Unauthenticated)))
    }
}

/// The request's execution context. Always present behind the gateway.
#[derive(Debug, Clone)]
pub struct RequestContext(pub ExecutionContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ExecutionContext>()
            .cloned()
            .map(RequestContext)
            .ok_or_else(|| failure_response(FailureTranslator::default().translate(AuthFailure::Unauthenticated)))
    }
}
