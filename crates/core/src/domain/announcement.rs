use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnouncementId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: AnnouncementId,
    pub title: String,
    pub content: String,
    pub author_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl Announcement {
    /// Whether the announcement should be shown to employees at `now`.
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.map(|expires| expires > now).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::domain::user::UserId;

    use super::{Announcement, AnnouncementId};

    fn announcement(expires_in_hours: Option<i64>, is_active: bool) -> Announcement {
        let now = Utc::now();
        Announcement {
            id: AnnouncementId("ann-1".to_string()),
            title: "Office closed Friday".to_string(),
            content: "Facilities maintenance.".to_string(),
            author_id: UserId("u-admin".to_string()),
            created_at: now,
            updated_at: now,
            expires_at: expires_in_hours.map(|hours| now + Duration::hours(hours)),
            is_active,
        }
    }

    #[test]
    fn active_unexpired_announcements_are_visible() {
        assert!(announcement(Some(24), true).is_visible_at(Utc::now()));
        assert!(announcement(None, true).is_visible_at(Utc::now()));
    }

    #[test]
    fn expired_or_inactive_announcements_are_hidden() {
        assert!(!announcement(Some(-1), true).is_visible_at(Utc::now()));
        assert!(!announcement(Some(24), false).is_visible_at(Utc::now()));
    }
}
