use crate::commands::CommandResult;
use deskhub_core::config::{AppConfig, LoadOptions};
use deskhub_db::{connect_with_settings, migrations};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let outcome = runtime.block_on(apply_migrations(&config));

    match outcome {
        Ok(()) => {
            let embedded = migrations::MIGRATOR.migrations.len();
            CommandResult::success(
                "migrate",
                format!("database schema is current ({embedded} migrations applied)"),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}

async fn apply_migrations(config: &AppConfig) -> Result<(), (&'static str, String, u8)> {
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

    let result = migrations::run_pending(&pool)
        .await
        .map_err(|error| ("migration", error.to_string(), 5u8));
    pool.close().await;
    result
}
