use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use deskhub_core::domain::announcement::{Announcement, AnnouncementId};
use deskhub_core::domain::document::{Document, DocumentId, DocumentSignature};
use deskhub_core::domain::request::{Request, RequestId};
use deskhub_core::domain::request_type::{RequestType, RequestTypeId};
use deskhub_core::domain::user::{User, UserId};

pub mod announcement;
pub mod document;
pub mod memory;
pub mod request;
pub mod request_type;
pub mod settings;
pub mod user;

pub use announcement::SqlAnnouncementRepository;
pub use document::SqlDocumentRepository;
pub use memory::{
    InMemoryRequestRepository, InMemoryRequestTypeRepository, InMemoryUserRepository,
};
pub use request::SqlRequestRepository;
pub use request_type::SqlRequestTypeRepository;
pub use settings::{SqlSettingsRepository, SystemSetting};
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    async fn save(&self, user: User) -> Result<(), RepositoryError>;
    async fn list(&self, limit: u32) -> Result<Vec<User>, RepositoryError>;
}

#[async_trait]
pub trait RequestTypeRepository: Send + Sync {
    async fn find_by_id(&self, id: &RequestTypeId)
        -> Result<Option<RequestType>, RepositoryError>;
    async fn save(&self, request_type: RequestType) -> Result<(), RepositoryError>;
    async fn list(&self) -> Result<Vec<RequestType>, RepositoryError>;
}

#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError>;
    async fn save(&self, request: Request) -> Result<(), RepositoryError>;
    async fn list_recent(&self, limit: u32) -> Result<Vec<Request>, RepositoryError>;
    async fn list_by_creator(&self, created_by: &UserId) -> Result<Vec<Request>, RepositoryError>;
}

#[async_trait]
pub trait AnnouncementRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &AnnouncementId,
    ) -> Result<Option<Announcement>, RepositoryError>;
    async fn save(&self, announcement: Announcement) -> Result<(), RepositoryError>;
    /// Active, unexpired announcements as of `now`, newest first.
    async fn list_recent(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Announcement>, RepositoryError>;
}

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, RepositoryError>;
    async fn save(&self, document: Document) -> Result<(), RepositoryError>;
    async fn list(&self, limit: u32) -> Result<Vec<Document>, RepositoryError>;
    async fn save_signature(&self, signature: DocumentSignature) -> Result<(), RepositoryError>;
    async fn list_signatures_for_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<DocumentSignature>, RepositoryError>;
    /// Signature requests still awaiting action from `signer_id`.
    async fn list_pending_for_signer(
        &self,
        signer_id: &UserId,
    ) -> Result<Vec<DocumentSignature>, RepositoryError>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<SystemSetting>, RepositoryError>;
    async fn set(
        &self,
        key: &str,
        value: Option<String>,
        description: Option<String>,
    ) -> Result<(), RepositoryError>;
    async fn all(&self) -> Result<Vec<SystemSetting>, RepositoryError>;
}
