use chrono::{DateTime, Utc};
use sqlx::Row;

use deskhub_core::domain::announcement::{Announcement, AnnouncementId};
use deskhub_core::domain::user::UserId;

use super::{AnnouncementRepository, RepositoryError};
use crate::repositories::user::parse_timestamp;
use crate::DbPool;

pub struct SqlAnnouncementRepository {
    pool: DbPool,
}

impl SqlAnnouncementRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_announcement(row: &sqlx::sqlite::SqliteRow) -> Result<Announcement, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let title: String = row.try_get("title").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let content: String =
        row.try_get("content").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let author_id: String =
        row.try_get("author_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let expires_at: Option<String> =
        row.try_get("expires_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_active: i64 =
        row.try_get("is_active").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Announcement {
        id: AnnouncementId(id),
        title,
        content,
        author_id: UserId(author_id),
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
        expires_at: expires_at
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        is_active: is_active != 0,
    })
}

#[async_trait::async_trait]
impl AnnouncementRepository for SqlAnnouncementRepository {
    async fn find_by_id(
        &self,
        id: &AnnouncementId,
    ) -> Result<Option<Announcement>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, title, content, author_id, created_at, updated_at, expires_at, is_active
             FROM announcement WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_announcement(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, announcement: Announcement) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO announcement (id, title, content, author_id, created_at, updated_at,
                                       expires_at, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 content = excluded.content,
                 updated_at = excluded.updated_at,
                 expires_at = excluded.expires_at,
                 is_active = excluded.is_active",
        )
        .bind(&announcement.id.0)
        .bind(&announcement.title)
        .bind(&announcement.content)
        .bind(&announcement.author_id.0)
        .bind(announcement.created_at.to_rfc3339())
        .bind(announcement.updated_at.to_rfc3339())
        .bind(announcement.expires_at.map(|dt| dt.to_rfc3339()))
        .bind(i64::from(announcement.is_active))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_recent(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Announcement>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, title, content, author_id, created_at, updated_at, expires_at, is_active
             FROM announcement
             WHERE is_active = 1 AND (expires_at IS NULL OR expires_at > ?)
             ORDER BY created_at DESC
             LIMIT ?",
        )
        .bind(now.to_rfc3339())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_announcement).collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use deskhub_core::domain::announcement::{Announcement, AnnouncementId};
    use deskhub_core::domain::user::UserId;

    use super::SqlAnnouncementRepository;
    use crate::fixtures;
    use crate::repositories::AnnouncementRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        fixtures::seed_demo_data(&pool).await.expect("seed");
        pool
    }

    fn announcement(id: &str, expires_in_hours: Option<i64>, is_active: bool) -> Announcement {
        let now = Utc::now();
        Announcement {
            id: AnnouncementId(id.to_string()),
            title: "Quarterly all-hands".to_string(),
            content: "Thursday at 10:00 in the main auditorium.".to_string(),
            author_id: UserId(fixtures::ADMIN_USER_ID.to_string()),
            created_at: now,
            updated_at: now,
            expires_at: expires_in_hours.map(|hours| now + Duration::hours(hours)),
            is_active,
        }
    }

    #[tokio::test]
    async fn list_recent_hides_expired_and_inactive_entries() {
        let pool = setup().await;
        let repo = SqlAnnouncementRepository::new(pool);

        repo.save(announcement("ann-live", Some(24), true)).await.expect("save live");
        repo.save(announcement("ann-expired", Some(-1), true)).await.expect("save expired");
        repo.save(announcement("ann-disabled", None, false)).await.expect("save disabled");

        let visible = repo.list_recent(Utc::now(), 10).await.expect("list");
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id.0, "ann-live");
    }

    #[tokio::test]
    async fn save_and_find_round_trip() {
        let pool = setup().await;
        let repo = SqlAnnouncementRepository::new(pool);

        let entry = announcement("ann-1", None, true);
        repo.save(entry.clone()).await.expect("save");

        let found = repo
            .find_by_id(&AnnouncementId("ann-1".to_string()))
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(found.title, entry.title);
        assert!(found.is_active);
    }
}
