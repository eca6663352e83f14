//! HTTP server: load settings, open the engine, serve the application until Ctrl+C.

use splitsphere::{build_app, logging, AppState, Engine, Settings};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;
    logging::init(&settings);
    tracing::info!(
        environment = %settings.environment,
        debug = settings.debug,
        database = %settings.redacted_database_url(),
        "starting {} {}",
        settings.project_name,
        settings.project_version
    );

    let engine = Engine::open(&settings)?;
    let bind_addr = settings.bind_addr;
    let app = build_app(AppState::new(settings, engine.clone()));

    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    engine.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
