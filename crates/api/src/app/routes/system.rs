use axum::{Json, http::StatusCode};

use crate::app::dto::{VersionResponse, WhoAmIResponse};
use crate::app::errors::json_error;
use crate::context::{CurrentUser, RequestContext};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: "gatewarden",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn whoami(CurrentUser(identity): CurrentUser, RequestContext(ctx): RequestContext) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse::new(&identity, ctx.request_id()))
}

pub async fn not_found() -> axum::response::Response {
    json_error(StatusCode::NOT_FOUND, "not-found", "no such route")
}
