//! Deterministic demo dataset for local development and the `seed` CLI
//! command. Safe to run repeatedly: every row is upserted by fixed id.

use chrono::Utc;

use deskhub_core::domain::announcement::{Announcement, AnnouncementId};
use deskhub_core::domain::request_type::{
    ApproverStep, FieldType, FormField, RequestType, RequestTypeId,
};
use deskhub_core::domain::user::{Department, User, UserId, UserRole, UserStatus};

use crate::repositories::{
    AnnouncementRepository, RepositoryError, RequestTypeRepository, SqlAnnouncementRepository,
    SqlRequestTypeRepository, SqlUserRepository, UserRepository,
};
use crate::DbPool;

pub const ADMIN_USER_ID: &str = "u-admin";
pub const MANAGER_USER_ID: &str = "u-manager";
pub const IT_LEAD_USER_ID: &str = "u-it-lead";
pub const EMPLOYEE_USER_ID: &str = "u-employee";

pub const IT_EQUIPMENT_TYPE_ID: &str = "rt-it-equipment";
pub const VACATION_TYPE_ID: &str = "rt-vacation";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub request_types: usize,
    pub announcements: usize,
}

pub async fn seed_demo_data(pool: &DbPool) -> Result<SeedSummary, RepositoryError> {
    let now = Utc::now();
    let users = SqlUserRepository::new(pool.clone());
    let request_types = SqlRequestTypeRepository::new(pool.clone());
    let announcements = SqlAnnouncementRepository::new(pool.clone());

    let demo_users = [
        (ADMIN_USER_ID, "admin", "Avery Admin", None, UserRole::Admin),
        (MANAGER_USER_ID, "mpatel", "Mira Patel", Some(Department::Operations), UserRole::Manager),
        (IT_LEAD_USER_ID, "rchen", "Robin Chen", Some(Department::It), UserRole::Manager),
        (EMPLOYEE_USER_ID, "jdoe", "Jordan Doe", Some(Department::Finance), UserRole::User),
    ];
    for (id, username, full_name, department, role) in &demo_users {
        users
            .save(User {
                id: UserId((*id).to_string()),
                username: (*username).to_string(),
                email: format!("{username}@example.com"),
                full_name: (*full_name).to_string(),
                department: *department,
                role: *role,
                status: UserStatus::Active,
                created_at: now,
                updated_at: now,
            })
            .await?;
    }

    let it_equipment = RequestType {
        id: RequestTypeId(IT_EQUIPMENT_TYPE_ID.to_string()),
        name: "IT Equipment".to_string(),
        description: Some("Hardware purchases and replacements".to_string()),
        department: Department::It,
        created_by: UserId(ADMIN_USER_ID.to_string()),
        created_at: now,
        updated_at: now,
        fields: vec![
            FormField {
                name: "item".to_string(),
                label: "Item".to_string(),
                field_type: FieldType::Text,
                required: true,
                options: Vec::new(),
            },
            FormField {
                name: "justification".to_string(),
                label: "Business justification".to_string(),
                field_type: FieldType::Textarea,
                required: true,
                options: Vec::new(),
            },
        ],
        approver_config: vec![
            ApproverStep {
                approver_id: UserId(MANAGER_USER_ID.to_string()),
                name: "Manager approval".to_string(),
                description: None,
            },
            ApproverStep {
                approver_id: UserId(IT_LEAD_USER_ID.to_string()),
                name: "IT review".to_string(),
                description: Some("Checks hardware standards and stock".to_string()),
            },
        ],
    };
    request_types.save(it_equipment).await?;

    let vacation = RequestType {
        id: RequestTypeId(VACATION_TYPE_ID.to_string()),
        name: "Vacation Request".to_string(),
        description: None,
        department: Department::Hr,
        created_by: UserId(ADMIN_USER_ID.to_string()),
        created_at: now,
        updated_at: now,
        fields: vec![
            FormField {
                name: "start_date".to_string(),
                label: "Start date".to_string(),
                field_type: FieldType::Date,
                required: true,
                options: Vec::new(),
            },
            FormField {
                name: "end_date".to_string(),
                label: "End date".to_string(),
                field_type: FieldType::Date,
                required: true,
                options: Vec::new(),
            },
        ],
        approver_config: vec![ApproverStep {
            approver_id: UserId(MANAGER_USER_ID.to_string()),
            name: "Manager approval".to_string(),
            description: None,
        }],
    };
    request_types.save(vacation).await?;

    announcements
        .save(Announcement {
            id: AnnouncementId("ann-welcome".to_string()),
            title: "Welcome to the portal".to_string(),
            content: "Submit requests from the dashboard; your approvers are notified \
                      automatically."
                .to_string(),
            author_id: UserId(ADMIN_USER_ID.to_string()),
            created_at: now,
            updated_at: now,
            expires_at: None,
            is_active: true,
        })
        .await?;

    Ok(SeedSummary { users: demo_users.len(), request_types: 2, announcements: 1 })
}

#[cfg(test)]
mod tests {
    use deskhub_core::domain::request_type::RequestTypeId;

    use super::{seed_demo_data, IT_EQUIPMENT_TYPE_ID};
    use crate::repositories::{RequestTypeRepository, SqlRequestTypeRepository};
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn seed_is_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let first = seed_demo_data(&pool).await.expect("first seed");
        let second = seed_demo_data(&pool).await.expect("second seed");
        assert_eq!(first, second);

        let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_account")
            .fetch_one(&pool)
            .await
            .expect("count users");
        assert_eq!(user_count, first.users as i64);
    }

    #[tokio::test]
    async fn seeded_it_type_has_a_two_step_approver_sequence() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        seed_demo_data(&pool).await.expect("seed");

        let request_type = SqlRequestTypeRepository::new(pool.clone())
            .find_by_id(&RequestTypeId(IT_EQUIPMENT_TYPE_ID.to_string()))
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(request_type.approver_config.len(), 2);
    }
}
