use sqlx::Row;

use deskhub_core::domain::request_type::{
    ApproverStep, FormField, RequestType, RequestTypeId,
};
use deskhub_core::domain::user::{Department, UserId};

use super::{RepositoryError, RequestTypeRepository};
use crate::repositories::user::parse_timestamp;
use crate::DbPool;

pub struct SqlRequestTypeRepository {
    pool: DbPool,
}

impl SqlRequestTypeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn row_to_request_type(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<RequestType, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: Option<String> =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let department: String =
        row.try_get("department").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_by: String =
        row.try_get("created_by").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let fields_raw: String =
        row.try_get("fields").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approver_config_raw: String =
        row.try_get("approver_config").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let fields: Vec<FormField> = serde_json::from_str(&fields_raw)
        .map_err(|e| RepositoryError::Decode(format!("fields column: {e}")))?;
    let approver_config: Vec<ApproverStep> = serde_json::from_str(&approver_config_raw)
        .map_err(|e| RepositoryError::Decode(format!("approver_config column: {e}")))?;

    let department = Department::parse(&department)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown department `{department}`")))?;

    Ok(RequestType {
        id: RequestTypeId(id),
        name,
        description,
        department,
        created_by: UserId(created_by),
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
        fields,
        approver_config,
    })
}

#[async_trait::async_trait]
impl RequestTypeRepository for SqlRequestTypeRepository {
    async fn find_by_id(
        &self,
        id: &RequestTypeId,
    ) -> Result<Option<RequestType>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, description, department, created_by, created_at, updated_at,
                    fields, approver_config
             FROM request_type WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_request_type(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, request_type: RequestType) -> Result<(), RepositoryError> {
        let fields = serde_json::to_string(&request_type.fields)
            .map_err(|e| RepositoryError::Decode(format!("fields column: {e}")))?;
        let approver_config = serde_json::to_string(&request_type.approver_config)
            .map_err(|e| RepositoryError::Decode(format!("approver_config column: {e}")))?;

        sqlx::query(
            "INSERT INTO request_type (id, name, description, department, created_by,
                                       created_at, updated_at, fields, approver_config)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 description = excluded.description,
                 department = excluded.department,
                 updated_at = excluded.updated_at,
                 fields = excluded.fields,
                 approver_config = excluded.approver_config",
        )
        .bind(&request_type.id.0)
        .bind(&request_type.name)
        .bind(&request_type.description)
        .bind(request_type.department.as_str())
        .bind(&request_type.created_by.0)
        .bind(request_type.created_at.to_rfc3339())
        .bind(request_type.updated_at.to_rfc3339())
        .bind(&fields)
        .bind(&approver_config)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<RequestType>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, name, description, department, created_by, created_at, updated_at,
                    fields, approver_config
             FROM request_type ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_request_type).collect::<Result<Vec<_>, _>>()
    }
}
