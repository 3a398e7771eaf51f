use certiforge::{config::Config, routes, state::AppState};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "certiforge=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!(
        fonts_dir = %config.fonts_dir.display(),
        cache_capacity = config.font_cache_capacity,
        max_quantity = config.max_quantity,
        "Configuration loaded"
    );

    let state = Arc::new(AppState::new(config));
    let app = routes::router(state);

    tracing::info!("Certiforge listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
