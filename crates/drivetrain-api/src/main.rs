mod config;
mod error;
mod routes;

use config::AppConfig;
use drivetrain_core::services::StoreHandle;
use routes::{app_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only load .env in development; production uses platform-native env injection.
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("drivetrain_api=info".parse().expect("valid directive"))
                .add_directive("drivetrain_core=info".parse().expect("valid directive")),
        )
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!("Starting drivetrain-api with config: {:?}", config);

    let store = StoreHandle::from_location(&config.db_path);
    if let Err(error) = store.connect().await {
        tracing::warn!("Record store unavailable at startup, will retry on first use: {}", error);
    }

    let state = AppState::from_config(&config, store.clone())?;
    let router = app_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("drivetrain-api listening on {}", config.bind_addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.reset().await;
    tracing::info!("drivetrain-api stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", error);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}
