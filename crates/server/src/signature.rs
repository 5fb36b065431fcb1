//! Seam for the external e-signature providers (Adobe Sign / DocuSign).
//!
//! The portal only records that a document was routed and which envelope the
//! provider assigned; the provider's own flow (signer emails, callbacks) is
//! an external collaborator and stays outside this crate.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use deskhub_core::domain::document::{Document, SignatureProvider};
use deskhub_core::domain::user::User;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature provider rejected the request: {0}")]
    ProviderRejected(String),
}

#[async_trait]
pub trait SignatureClient: Send + Sync {
    /// Route `document` to `provider` for `signer` and return the envelope
    /// id the provider assigned.
    async fn create_envelope(
        &self,
        document: &Document,
        signer: &User,
        provider: SignatureProvider,
    ) -> Result<String, SignatureError>;
}

/// Default client: assigns a locally generated envelope id without calling
/// out anywhere. Stands in for the provider integrations the deployment
/// wires up.
#[derive(Clone, Debug, Default)]
pub struct RecordingSignatureClient;

#[async_trait]
impl SignatureClient for RecordingSignatureClient {
    async fn create_envelope(
        &self,
        _document: &Document,
        _signer: &User,
        provider: SignatureProvider,
    ) -> Result<String, SignatureError> {
        Ok(format!("{}-{}", provider.as_str(), Uuid::new_v4()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use deskhub_core::domain::document::{Document, DocumentId, SignatureProvider};
    use deskhub_core::domain::user::{User, UserId, UserRole, UserStatus};

    use super::{RecordingSignatureClient, SignatureClient};

    #[tokio::test]
    async fn recording_client_prefixes_envelope_ids_with_the_provider() {
        let now = Utc::now();
        let document = Document {
            id: DocumentId("doc-1".to_string()),
            title: "NDA".to_string(),
            description: None,
            file_path: "uploads/doc-1.pdf".to_string(),
            file_type: Some("application/pdf".to_string()),
            owner_id: UserId("u-admin".to_string()),
            uploaded_at: now,
            updated_at: now,
            status: "active".to_string(),
            requires_signature: true,
        };
        let signer = User {
            id: UserId("u-signer".to_string()),
            username: "signer".to_string(),
            email: "signer@example.com".to_string(),
            full_name: "Sig Ner".to_string(),
            department: None,
            role: UserRole::User,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        };

        let envelope = RecordingSignatureClient
            .create_envelope(&document, &signer, SignatureProvider::Docusign)
            .await
            .expect("envelope");
        assert!(envelope.starts_with("docusign-"));
    }
}
