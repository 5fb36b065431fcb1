use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Department {
    It,
    Hr,
    Finance,
    Legal,
    Marketing,
    Operations,
    Other,
}

impl Department {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::It => "it",
            Self::Hr => "hr",
            Self::Finance => "finance",
            Self::Legal => "legal",
            Self::Marketing => "marketing",
            Self::Operations => "operations",
            Self::Other => "other",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "it" => Some(Self::It),
            "hr" => Some(Self::Hr),
            "finance" => Some(Self::Finance),
            "legal" => Some(Self::Legal),
            "marketing" => Some(Self::Marketing),
            "operations" => Some(Self::Operations),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Manager,
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::User => "user",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "manager" => Some(Self::Manager),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
    Pending,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Pending => "pending",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "pending" => Some(Self::Pending),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub department: Option<Department>,
    pub role: UserRole,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn can_approve(&self) -> bool {
        self.status == UserStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::{Department, UserRole, UserStatus};

    #[test]
    fn department_round_trips_through_strings() {
        for department in [
            Department::It,
            Department::Hr,
            Department::Finance,
            Department::Legal,
            Department::Marketing,
            Department::Operations,
            Department::Other,
        ] {
            assert_eq!(Department::parse(department.as_str()), Some(department));
        }
        assert_eq!(Department::parse("facilities"), None);
    }

    #[test]
    fn role_and_status_parse_ignore_case_and_whitespace() {
        assert_eq!(UserRole::parse(" Admin "), Some(UserRole::Admin));
        assert_eq!(UserStatus::parse("INACTIVE"), Some(UserStatus::Inactive));
        assert_eq!(UserRole::parse("superuser"), None);
    }
}
