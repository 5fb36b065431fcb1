use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::user::{Department, UserId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestTypeId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Date,
    Select,
    Checkbox,
    File,
    Radio,
    Email,
    Tel,
}

/// One input on the submission form for a request type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    /// Choices for select/radio fields; empty otherwise.
    #[serde(default)]
    pub options: Vec<String>,
}

/// One entry in a request type's ordered approver sequence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproverStep {
    pub approver_id: UserId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestType {
    pub id: RequestTypeId,
    pub name: String,
    pub description: Option<String>,
    pub department: Department,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub fields: Vec<FormField>,
    /// Ordered approver sequence. Snapshotted into approval records when a
    /// workflow starts; later edits never touch in-flight workflows.
    pub approver_config: Vec<ApproverStep>,
}

impl RequestType {
    /// Field names the submission form requires a value for.
    pub fn required_field_names(&self) -> Vec<&str> {
        self.fields.iter().filter(|field| field.required).map(|field| field.name.as_str()).collect()
    }

    /// Names of required fields missing from (or blank in) submitted data.
    pub fn missing_required_fields(&self, data: &serde_json::Value) -> Vec<String> {
        self.required_field_names()
            .into_iter()
            .filter(|name| match data.get(name) {
                None | Some(serde_json::Value::Null) => true,
                Some(serde_json::Value::String(value)) => value.trim().is_empty(),
                Some(_) => false,
            })
            .map(str::to_owned)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use crate::domain::user::{Department, UserId};

    use super::{ApproverStep, FieldType, FormField, RequestType, RequestTypeId};

    fn vacation_type() -> RequestType {
        let now = Utc::now();
        RequestType {
            id: RequestTypeId("rt-vacation".to_string()),
            name: "Vacation Request".to_string(),
            description: None,
            department: Department::Hr,
            created_by: UserId("u-admin".to_string()),
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
                    name: "notes".to_string(),
                    label: "Notes".to_string(),
                    field_type: FieldType::Textarea,
                    required: false,
                    options: Vec::new(),
                },
            ],
            approver_config: vec![ApproverStep {
                approver_id: UserId("u-manager".to_string()),
                name: "Manager approval".to_string(),
                description: None,
            }],
        }
    }

    #[test]
    fn missing_required_fields_reports_absent_and_blank_values() {
        let request_type = vacation_type();

        let missing = request_type.missing_required_fields(&json!({ "notes": "out friday" }));
        assert_eq!(missing, vec!["start_date".to_string()]);

        let missing = request_type.missing_required_fields(&json!({ "start_date": "  " }));
        assert_eq!(missing, vec!["start_date".to_string()]);

        let missing = request_type.missing_required_fields(&json!({ "start_date": "2026-08-10" }));
        assert!(missing.is_empty());
    }

    #[test]
    fn optional_fields_are_never_reported_missing() {
        let request_type = vacation_type();
        assert_eq!(request_type.required_field_names(), vec!["start_date"]);
    }
}
