use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::Row;

use super::{RepositoryError, SettingsRepository};
use crate::repositories::user::parse_timestamp;
use crate::DbPool;

/// One key/value row of operator-editable portal configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SystemSetting {
    pub key: String,
    pub value: Option<String>,
    pub description: Option<String>,
    pub last_updated: DateTime<Utc>,
}

pub struct SqlSettingsRepository {
    pool: DbPool,
}

impl SqlSettingsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_setting(row: &sqlx::sqlite::SqliteRow) -> Result<SystemSetting, RepositoryError> {
    let key: String =
        row.try_get("setting_key").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let value: Option<String> =
        row.try_get("setting_value").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: Option<String> =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let last_updated: String =
        row.try_get("last_updated").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(SystemSetting { key, value, description, last_updated: parse_timestamp(&last_updated) })
}

#[async_trait::async_trait]
impl SettingsRepository for SqlSettingsRepository {
    async fn get(&self, key: &str) -> Result<Option<SystemSetting>, RepositoryError> {
        let row = sqlx::query(
            "SELECT setting_key, setting_value, description, last_updated
             FROM system_setting WHERE setting_key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_setting(r)?)),
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: Option<String>,
        description: Option<String>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO system_setting (setting_key, setting_value, description, last_updated)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(setting_key) DO UPDATE SET
                 setting_value = excluded.setting_value,
                 description = COALESCE(excluded.description, system_setting.description),
                 last_updated = excluded.last_updated",
        )
        .bind(key)
        .bind(&value)
        .bind(&description)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn all(&self) -> Result<Vec<SystemSetting>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT setting_key, setting_value, description, last_updated
             FROM system_setting ORDER BY setting_key ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_setting).collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use super::SqlSettingsRepository;
    use crate::repositories::SettingsRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let pool = setup().await;
        let repo = SqlSettingsRepository::new(pool);

        repo.set("PORTAL_NAME", Some("Deskhub".to_string()), Some("Display name".to_string()))
            .await
            .expect("set");

        let setting = repo.get("PORTAL_NAME").await.expect("get").expect("exists");
        assert_eq!(setting.value.as_deref(), Some("Deskhub"));
        assert_eq!(setting.description.as_deref(), Some("Display name"));
    }

    #[tokio::test]
    async fn set_overwrites_value_but_keeps_description_when_omitted() {
        let pool = setup().await;
        let repo = SqlSettingsRepository::new(pool);

        repo.set("PORTAL_NAME", Some("Deskhub".to_string()), Some("Display name".to_string()))
            .await
            .expect("set");
        repo.set("PORTAL_NAME", Some("Deskhub 2".to_string()), None).await.expect("overwrite");

        let setting = repo.get("PORTAL_NAME").await.expect("get").expect("exists");
        assert_eq!(setting.value.as_deref(), Some("Deskhub 2"));
        assert_eq!(setting.description.as_deref(), Some("Display name"));
    }

    #[tokio::test]
    async fn all_lists_settings_sorted_by_key() {
        let pool = setup().await;
        let repo = SqlSettingsRepository::new(pool);

        repo.set("ZEBRA", None, None).await.expect("set zebra");
        repo.set("ALPHA", None, None).await.expect("set alpha");

        let settings = repo.all().await.expect("all");
        assert_eq!(settings.len(), 2);
        assert_eq!(settings[0].key, "ALPHA");
    }
}
