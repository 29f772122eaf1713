//! Demo resources guarded by permission codes `p1` and `p2`.

use axum::Json;

use crate::app::dto::ResourceResponse;
use crate::context::CurrentUser;

pub async fn r1(CurrentUser(identity): CurrentUser) -> Json<ResourceResponse> {
    tracing::info!(user_id = %identity.id(), "resource r1 accessed");
    Json(ResourceResponse {
        resource: "r1",
        user_id: identity.id().to_string(),
    })
}

pub async fn r2(CurrentUser(identity): CurrentUser) -> Json<ResourceResponse> {
    tracing::info!(user_id = %identity.id(), "resource r2 accessed");
    Json(ResourceResponse {
        resource: "r2",
        user_id: identity.id().to_string(),
    })
}
