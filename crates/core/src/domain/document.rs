use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignatureId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureProvider {
    Adobe,
    Docusign,
}

impl SignatureProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adobe => "adobe",
            Self::Docusign => "docusign",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "adobe" => Some(Self::Adobe),
            "docusign" => Some(Self::Docusign),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    Pending,
    Signed,
    Declined,
}

impl SignatureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Signed => "signed",
            Self::Declined => "declined",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "signed" => Some(Self::Signed),
            "declined" => Some(Self::Declined),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub description: Option<String>,
    pub file_path: String,
    pub file_type: Option<String>,
    pub owner_id: UserId,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: String,
    pub requires_signature: bool,
}

/// A signature request routed to an external provider for one signer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSignature {
    pub id: SignatureId,
    pub document_id: DocumentId,
    pub signer_id: UserId,
    pub status: SignatureStatus,
    pub provider: SignatureProvider,
    /// Envelope/agreement id assigned by the provider.
    pub external_id: Option<String>,
    pub signed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::{SignatureProvider, SignatureStatus};

    #[test]
    fn provider_and_status_round_trip_through_strings() {
        for provider in [SignatureProvider::Adobe, SignatureProvider::Docusign] {
            assert_eq!(SignatureProvider::parse(provider.as_str()), Some(provider));
        }
        for status in
            [SignatureStatus::Pending, SignatureStatus::Signed, SignatureStatus::Declined]
        {
            assert_eq!(SignatureStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SignatureProvider::parse("hellosign"), None);
    }
}
