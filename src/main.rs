use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use saika_index::config;
use saika_index::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "saika_index=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration / 加载配置
    let app_config = config::init_config()
        .map_err(anyhow::Error::msg)?
        .read()
        .clone();
    tracing::info!("Server will listen on {}", app_config.get_bind_address());

    // Create cache directory if not exists / 创建缓存目录
    let cache_dir = app_config.get_cache_dir();
    if !cache_dir.exists() {
        std::fs::create_dir_all(&cache_dir)?;
        tracing::info!("Created cache directory: {:?}", cache_dir);
    }

    // Load cached snapshot and start background refresh / 加载缓存并启动后台刷新
    let offline = saika_index::initialize_index(&app_config).await;
    tracing::info!("Offline index ready with {} entries", offline.engine().len());

    let state = Arc::new(AppState { offline });
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(app_config.get_bind_address()).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
