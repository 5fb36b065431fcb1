use chrono::{DateTime, Utc};
use sqlx::Row;

use deskhub_core::domain::user::{Department, User, UserId, UserRole, UserStatus};

use super::{RepositoryError, UserRepository};
use crate::DbPool;

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_role(raw: &str) -> UserRole {
    UserRole::parse(raw).unwrap_or(UserRole::User)
}

fn parse_status(raw: &str) -> UserStatus {
    UserStatus::parse(raw).unwrap_or(UserStatus::Active)
}

pub(crate) fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let username: String =
        row.try_get("username").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let email: String = row.try_get("email").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let full_name: String =
        row.try_get("full_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let department: Option<String> =
        row.try_get("department").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let role: String = row.try_get("role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(User {
        id: UserId(id),
        username,
        email,
        full_name,
        department: department.as_deref().and_then(Department::parse),
        role: parse_role(&role),
        status: parse_status(&status),
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, username, email, full_name, department, role, status,
                    created_at, updated_at
             FROM user_account WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_user(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, user: User) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO user_account (id, username, email, full_name, department, role,
                                       status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 username = excluded.username,
                 email = excluded.email,
                 full_name = excluded.full_name,
                 department = excluded.department,
                 role = excluded.role,
                 status = excluded.status,
                 updated_at = excluded.updated_at",
        )
        .bind(&user.id.0)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(user.department.map(|d| d.as_str()))
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(user.created_at.to_rfc3339())
        .bind(user.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, limit: u32) -> Result<Vec<User>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, username, email, full_name, department, role, status,
                    created_at, updated_at
             FROM user_account ORDER BY username ASC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_user).collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use deskhub_core::domain::user::{Department, User, UserId, UserRole, UserStatus};

    use super::SqlUserRepository;
    use crate::repositories::UserRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn sample_user(id: &str, username: &str) -> User {
        let now = Utc::now();
        User {
            id: UserId(id.to_string()),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            full_name: "Sample User".to_string(),
            department: Some(Department::It),
            role: UserRole::User,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn save_and_find_by_id() {
        let pool = setup().await;
        let repo = SqlUserRepository::new(pool);

        repo.save(sample_user("u-1", "jdoe")).await.expect("save");
        let found = repo.find_by_id(&UserId("u-1".to_string())).await.expect("find");
        let found = found.expect("should exist");

        assert_eq!(found.username, "jdoe");
        assert_eq!(found.department, Some(Department::It));
        assert_eq!(found.role, UserRole::User);
    }

    #[tokio::test]
    async fn save_upserts_on_conflict() {
        let pool = setup().await;
        let repo = SqlUserRepository::new(pool);

        let user = sample_user("u-1", "jdoe");
        repo.save(user.clone()).await.expect("save");

        let mut updated = user;
        updated.role = UserRole::Manager;
        updated.updated_at = Utc::now();
        repo.save(updated).await.expect("upsert");

        let found = repo.find_by_id(&UserId("u-1".to_string())).await.expect("find");
        assert_eq!(found.expect("exists").role, UserRole::Manager);
    }

    #[tokio::test]
    async fn list_orders_by_username() {
        let pool = setup().await;
        let repo = SqlUserRepository::new(pool);

        repo.save(sample_user("u-2", "zoe")).await.expect("save zoe");
        repo.save(sample_user("u-1", "amir")).await.expect("save amir");

        let users = repo.list(10).await.expect("list");
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].username, "amir");
        assert_eq!(users[1].username, "zoe");
    }
}
