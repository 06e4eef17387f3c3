use peacekeeper_api::config::Config;
use peacekeeper_api::gateway::{app_router, AppState};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("peacekeeper_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env();
    let app_state = Arc::new(AppState::from_config(&config)?);

    let app = app_router(app_state);

    info!(
        "Peacekeeper API listening on {} (model: {}, cache TTL: {:?}, premium enforced: {})",
        config.bind_addr, config.gemini_model, config.cache_ttl, config.enforce_premium
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
