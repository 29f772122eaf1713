use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use gatewarden_auth::{AuthFailure, ExecutionContext, Gateway, HttpMethod, Resource, Route};
use gatewarden_core::RequestId;

use crate::app::errors::failure_response;

/// Largest login/refresh body the gateway will buffer.
pub const BODY_LIMIT: usize = 64 * 1024;

#[derive(Clone)]
pub struct GatewayState {
    pub gateway: Arc<Gateway>,
}

/// Runs the authentication pipeline in front of every route.
///
/// Login and refresh requests are answered by the pipeline itself; the
/// resulting token pair is handed to the route handler for rendering. Every
/// other request leaves here with its [`ExecutionContext`] (and, when
/// authenticated, its [`gatewarden_auth::Identity`]) in the extensions.
pub async fn gateway_middleware(
    State(state): State<GatewayState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let gateway = &state.gateway;
    let mut ctx = ExecutionContext::new(RequestId::new());
    let method = HttpMethod::parse(req.method().as_str());
    let path = req.uri().path().to_string();

    tracing::debug!(request_id = %ctx.request_id(), %method, path = %path, "gateway");

    match gateway.route(&path, &method) {
        Route::Login => {
            let (mut req, body) = match buffer_body(req).await {
                Ok(parts) => parts,
                Err(failure) => return failure_response(gateway.translate(failure)),
            };
            match gateway.login(&mut ctx, &method, &body).await {
                Ok(tokens) => {
                    req.extensions_mut().insert(tokens);
                    req.extensions_mut().insert(ctx);
                    next.run(req).await
                }
                Err(failure) => failure_response(gateway.translate(failure)),
            }
        }
        Route::Refresh => {
            let (mut req, body) = match buffer_body(req).await {
                Ok(parts) => parts,
                Err(failure) => return failure_response(gateway.translate(failure)),
            };
            match gateway.refresh(&method, &body) {
                Ok(tokens) => {
                    req.extensions_mut().insert(tokens);
                    next.run(req).await
                }
                Err(failure) => {
                    tracing::info!(request_id = %ctx.request_id(), failure = failure.kind(), "refresh rejected");
                    failure_response(gateway.translate(failure))
                }
            }
        }
        route @ (Route::Bypass | Route::Protected) => {
            let authorization = match header_value(req.headers(), gateway.scheme().header()) {
                Ok(value) => value,
                Err(_) if route == Route::Bypass => None,
                Err(failure) => return failure_response(gateway.translate(failure)),
            };
            let resource = Resource::new(&path, &method);
            if let Err(failure) = gateway.admit(&mut ctx, &resource, authorization.as_deref()).await {
                return failure_response(gateway.translate(failure));
            }
            admitted(req, ctx, next).await
        }
    }
}

async fn admitted(mut req: Request<Body>, ctx: ExecutionContext, next: Next) -> Response {
    if let Some(identity) = ctx.identity().cloned() {
        req.extensions_mut().insert(identity);
    }
    req.extensions_mut().insert(ctx);
    next.run(req).await
}

/// Reads the body so a stage can inspect it, then puts it back.
async fn buffer_body(req: Request<Body>) -> Result<(Request<Body>, Bytes), AuthFailure> {
    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, BODY_LIMIT).await.map_err(|e| {
        tracing::debug!(error = %e, "request body rejected");
        AuthFailure::BadRequest
    })?;
    Ok((Request::from_parts(parts, Body::from(bytes.clone())), bytes))
}

/// `Ok(None)` when the header is absent; a value that is not visible ASCII
/// cannot carry a bearer token.
fn header_value(headers: &HeaderMap, name: &str) -> Result<Option<String>, AuthFailure> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|v| Some(v.to_string()))
            .map_err(|_| AuthFailure::MalformedHeader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::{HeaderValue, StatusCode};
    use tower::ServiceExt;

    use gatewarden_infra::InMemoryUserDirectory;

    use crate::{GatewayConfig, build_app};

    fn app() -> axum::Router {
        let dir = Arc::new(InMemoryUserDirectory::demo());
        build_app(&GatewayConfig::with_secret("0123456789abcdef0123456789abcdef"), dir.clone(), dir).unwrap()
    }

    fn get_with_opaque_header(path: &str) -> Request<Body> {
        let mut req = Request::get(path).body(Body::empty()).unwrap();
        req.headers_mut()
            .insert("authorization", HeaderValue::from_bytes(b"Bearer \xff\xfe").unwrap());
        req
    }

    #[tokio::test]
    async fn opaque_header_only_matters_on_protected_routes() {
        let res = app().oneshot(get_with_opaque_header("/health")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = app().oneshot(get_with_opaque_header("/r/r1")).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn oversized_login_body_is_bad_request() {
        let body = vec![b' '; BODY_LIMIT + 1];
        let req = Request::post("/users/login").body(Body::from(body)).unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(res.into_body(), BODY_LIMIT).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["subcode"], "client-input");
    }

    #[tokio::test]
    async fn head_version_is_public() {
        let req = Request::head("/version").body(Body::empty()).unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
