use chrono::{DateTime, Utc};
use sqlx::Row;

use deskhub_core::domain::request::{Priority, Request, RequestId, RequestStatus};
use deskhub_core::domain::request_type::RequestTypeId;
use deskhub_core::domain::user::UserId;

use super::{RepositoryError, RequestRepository};
use crate::repositories::user::parse_timestamp;
use crate::DbPool;

pub struct SqlRequestRepository {
    pool: DbPool,
}

impl SqlRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const REQUEST_COLUMNS: &str = "id, request_type_id, title, description, status, priority,
                               created_by, created_at, updated_at, due_date, data";

pub(crate) fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<Request, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let request_type_id: String =
        row.try_get("request_type_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let title: String = row.try_get("title").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: Option<String> =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let priority: String =
        row.try_get("priority").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_by: String =
        row.try_get("created_by").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let due_date: Option<String> =
        row.try_get("due_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let data_raw: String =
        row.try_get("data").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let status = RequestStatus::parse(&status)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown request status `{status}`")))?;
    let priority = Priority::parse(&priority)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown priority `{priority}`")))?;
    let data = serde_json::from_str(&data_raw)
        .map_err(|e| RepositoryError::Decode(format!("data column: {e}")))?;

    Ok(Request {
        id: RequestId(id),
        request_type_id: RequestTypeId(request_type_id),
        title,
        description,
        status,
        priority,
        created_by: UserId(created_by),
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
        due_date: due_date
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        data,
    })
}

#[async_trait::async_trait]
impl RequestRepository for SqlRequestRepository {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {REQUEST_COLUMNS} FROM request WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_request(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, request: Request) -> Result<(), RepositoryError> {
        let data = serde_json::to_string(&request.data)
            .map_err(|e| RepositoryError::Decode(format!("data column: {e}")))?;

        sqlx::query(
            "INSERT INTO request (id, request_type_id, title, description, status, priority,
                                  created_by, created_at, updated_at, due_date, data)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 description = excluded.description,
                 status = excluded.status,
                 priority = excluded.priority,
                 updated_at = excluded.updated_at,
                 due_date = excluded.due_date,
                 data = excluded.data",
        )
        .bind(&request.id.0)
        .bind(&request.request_type_id.0)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.status.as_str())
        .bind(request.priority.as_str())
        .bind(&request.created_by.0)
        .bind(request.created_at.to_rfc3339())
        .bind(request.updated_at.to_rfc3339())
        .bind(request.due_date.map(|dt| dt.to_rfc3339()))
        .bind(&data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<Request>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM request ORDER BY created_at DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_request).collect::<Result<Vec<_>, _>>()
    }

    async fn list_by_creator(&self, created_by: &UserId) -> Result<Vec<Request>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM request WHERE created_by = ?
             ORDER BY created_at DESC"
        ))
        .bind(&created_by.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_request).collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use deskhub_core::domain::request::{Priority, Request, RequestId, RequestStatus};
    use deskhub_core::domain::request_type::RequestTypeId;
    use deskhub_core::domain::user::UserId;

    use super::SqlRequestRepository;
    use crate::fixtures;
    use crate::repositories::RequestRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        fixtures::seed_demo_data(&pool).await.expect("seed");
        pool
    }

    fn sample_request(id: &str, created_by: &str) -> Request {
        let now = Utc::now();
        Request {
            id: RequestId(id.to_string()),
            request_type_id: RequestTypeId(fixtures::IT_EQUIPMENT_TYPE_ID.to_string()),
            title: "Replacement monitor".to_string(),
            description: Some("Current one flickers".to_string()),
            status: RequestStatus::Draft,
            priority: Priority::Normal,
            created_by: UserId(created_by.to_string()),
            created_at: now,
            updated_at: now,
            due_date: None,
            data: json!({ "model": "27-inch" }),
        }
    }

    #[tokio::test]
    async fn save_and_find_round_trips_form_data() {
        let pool = setup().await;
        let repo = SqlRequestRepository::new(pool);

        let request = sample_request("req-1", fixtures::EMPLOYEE_USER_ID);
        repo.save(request.clone()).await.expect("save");

        let found =
            repo.find_by_id(&RequestId("req-1".to_string())).await.expect("find").expect("exists");
        assert_eq!(found.data, json!({ "model": "27-inch" }));
        assert_eq!(found.status, RequestStatus::Draft);
        assert_eq!(found.priority, Priority::Normal);
    }

    #[tokio::test]
    async fn list_by_creator_filters_other_users() {
        let pool = setup().await;
        let repo = SqlRequestRepository::new(pool);

        repo.save(sample_request("req-1", fixtures::EMPLOYEE_USER_ID)).await.expect("save 1");
        repo.save(sample_request("req-2", fixtures::MANAGER_USER_ID)).await.expect("save 2");

        let mine = repo
            .list_by_creator(&UserId(fixtures::EMPLOYEE_USER_ID.to_string()))
            .await
            .expect("list");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id.0, "req-1");
    }

    #[tokio::test]
    async fn list_recent_caps_results() {
        let pool = setup().await;
        let repo = SqlRequestRepository::new(pool);

        for index in 0..5 {
            repo.save(sample_request(&format!("req-{index}"), fixtures::EMPLOYEE_USER_ID))
                .await
                .expect("save");
        }

        let recent = repo.list_recent(3).await.expect("list recent");
        assert_eq!(recent.len(), 3);
    }
}
