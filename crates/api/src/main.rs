use anyhow::{Context, Result};
use arogya_api::{build_app, ApiConfig};
use arogya_observability::init_tracing;
use arogya_providers::ProviderConfig;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("arogya_api");

    let providers = ProviderConfig::from_env();
    let api = ApiConfig::from_env();

    let app = build_app(&providers, &api)?;

    let listener = tokio::net::TcpListener::bind(&api.bind)
        .await
        .with_context(|| format!("failed to bind {}", api.bind))?;
    tracing::info!(bind = %api.bind, model = %providers.openai_model, "arogya api started");

    axum::serve(listener, app).await?;
    Ok(())
}
