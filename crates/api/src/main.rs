use anyhow::Context;

use gatewarden_api::app::services::build_directory;
use gatewarden_api::{GatewayConfig, build_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gatewarden_observability::init();

    let config = GatewayConfig::from_env().context("invalid configuration")?;
    tracing::debug!(?config, "configuration loaded");

    let directory = build_directory(&config)
        .await
        .context("failed to initialise user directory")?;
    let app = build_app(&config, directory.verifier, directory.permissions)?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
