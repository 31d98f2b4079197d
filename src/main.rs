// src/main.rs

use tracing::info;
use tracing_subscriber::FmtSubscriber;

use companion::config::CompanionConfig;
use companion::server;
use companion::state::build_app_state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CompanionConfig::from_env()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level.parse().unwrap_or(tracing::Level::INFO))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("starting companion");
    info!("text model: {}", config.text_model);
    info!("qdrant: {} ({})", config.qdrant_url, config.qdrant_collection);

    tokio::fs::create_dir_all(&config.images_dir).await?;

    let app_state = build_app_state(&config)?;
    let app = server::app(app_state);

    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("listening on http://{}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
