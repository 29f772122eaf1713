use axum::{
    Router,
    routing::{any, get},
};

pub mod resources;
pub mod session;
pub mod system;

/// Every route behind the gateway. Login and refresh accept any method so
/// that the pipeline, not the router, answers a wrong one.
pub fn router(login_path: &str, refresh_path: &str) -> Router {
    Router::new()
        .route(login_path, any(session::login))
        .route(refresh_path, any(session::refresh))
        .route("/version", get(system::version))
        .route("/health", get(system::health))
        .route("/whoami", get(system::whoami))
        .route("/r/r1", get(resources::r1))
        .route("/r/r2", get(resources::r2))
        .fallback(system::not_found)
}
