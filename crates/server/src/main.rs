mod api;
mod bootstrap;
mod health;
mod notify;
mod signature;

use anyhow::Result;
use tower_http::services::ServeDir;

use deskhub_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use deskhub_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    tracing::info!(
        event_name = "system.server.mail_transport_mode",
        transport_mode = if app.notifier.transport_is_noop() { "log" } else { "smtp" },
        correlation_id = "bootstrap",
        "mail transport mode initialized"
    );

    let state = api::ApiState {
        db_pool: app.db_pool.clone(),
        engine: app.engine.clone(),
        notifier: app.notifier.clone(),
        signature_client: app.signature_client.clone(),
    };
    let router = api::router(state)
        .merge(health::router(app.db_pool.clone()))
        .nest_service("/uploads", ServeDir::new(&app.config.uploads.directory));

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "deskhub-server started"
    );

    let grace_secs = app.config.server.graceful_shutdown_secs;
    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown(grace_secs)).await?;

    tracing::info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        "deskhub-server stopped"
    );

    Ok(())
}

async fn wait_for_shutdown(grace_secs: u64) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        grace_secs,
        "shutdown signal received, draining connections"
    );
}
