//! HTTP surface of the gateway: configuration, middleware, routing and
//! response mapping.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;

pub use app::{BuildError, build_app, build_gateway};
pub use config::{ConfigError, GatewayConfig};
