mod admin;
mod home;
mod problem;
mod router;
mod telemetry;

use jobdeck_storage::Database;
use jobdeck_util::{load_env_file, AppConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let storage = Database::connect(&config.database_url).await?;
    storage.run_migrations().await?;

    let state = router::AppState::new(metrics, storage);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(
        stage = "app",
        addr = %config.bind_addr,
        env = %config.environment.as_str(),
        "serving marketplace home feed"
    );

    axum::serve(listener, router::app_router(state)).await?;
    Ok(())
}
