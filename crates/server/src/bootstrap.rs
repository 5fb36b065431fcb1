use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use deskhub_core::config::{AppConfig, ConfigError, LoadOptions};
use deskhub_db::{connect_with_settings, migrations, DbPool, WorkflowEngine};

use crate::notify::{EmailNotifier, LogTransport};
use crate::signature::RecordingSignatureClient;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub engine: Arc<WorkflowEngine>,
    pub notifier: Arc<EmailNotifier>,
    pub signature_client: Arc<RecordingSignatureClient>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let engine = Arc::new(WorkflowEngine::new(db_pool.clone()));
    let notifier = Arc::new(EmailNotifier::new(
        db_pool.clone(),
        Arc::new(LogTransport),
        config.email.max_retries,
    ));

    Ok(Application {
        config,
        db_pool,
        engine,
        notifier,
        signature_client: Arc::new(RecordingSignatureClient),
    })
}

#[cfg(test)]
mod tests {
    use deskhub_core::config::{ConfigOverrides, LoadOptions};
    use deskhub_core::domain::request::{Priority, Request, RequestId, RequestStatus};
    use deskhub_core::domain::request_type::RequestTypeId;
    use deskhub_core::domain::user::UserId;
    use deskhub_core::domain::workflow::WorkflowStatus;
    use deskhub_db::repositories::{RequestRepository, SqlRequestRepository};
    use deskhub_db::fixtures;
    use serde_json::json;

    use crate::bootstrap::bootstrap;

    fn valid_overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_invalid_database_url() {
        let result = bootstrap(valid_overrides("postgres://nope")).await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("database.url"));
    }

    #[tokio::test]
    async fn integration_smoke_covers_startup_and_the_approval_path() {
        let app = bootstrap(valid_overrides("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('request', 'workflow', 'approval', 'user_account')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected foundation tables to be available after bootstrap");
        assert_eq!(table_count, 4, "bootstrap should expose baseline workflow tables");

        fixtures::seed_demo_data(&app.db_pool).await.expect("seed");

        let now = chrono::Utc::now();
        SqlRequestRepository::new(app.db_pool.clone())
            .save(Request {
                id: RequestId("req-smoke".to_string()),
                request_type_id: RequestTypeId(fixtures::VACATION_TYPE_ID.to_string()),
                title: "Summer vacation".to_string(),
                description: None,
                status: RequestStatus::Draft,
                priority: Priority::Normal,
                created_by: UserId(fixtures::EMPLOYEE_USER_ID.to_string()),
                created_at: now,
                updated_at: now,
                due_date: None,
                data: json!({ "start_date": "2026-08-17", "end_date": "2026-08-21" }),
            })
            .await
            .expect("insert request");

        let workflow = app
            .engine
            .start_workflow(&RequestId("req-smoke".to_string()))
            .await
            .expect("start workflow");
        assert_eq!(workflow.current_step, 1);

        let approvals = app
            .engine
            .approvals_for_request(&RequestId("req-smoke".to_string()))
            .await
            .expect("approvals");
        app.engine
            .approve_step(
                &approvals[0].id,
                &UserId(fixtures::MANAGER_USER_ID.to_string()),
                None,
            )
            .await
            .expect("approve");

        let workflow = app
            .engine
            .workflow_for_request(&RequestId("req-smoke".to_string()))
            .await
            .expect("workflow")
            .expect("exists");
        assert_eq!(workflow.status, WorkflowStatus::Completed);

        assert!(app.notifier.transport_is_noop());

        app.db_pool.close().await;
    }
}
