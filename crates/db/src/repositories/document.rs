use chrono::{DateTime, Utc};
use sqlx::Row;

use deskhub_core::domain::document::{
    Document, DocumentId, DocumentSignature, SignatureId, SignatureProvider, SignatureStatus,
};
use deskhub_core::domain::user::UserId;

use super::{DocumentRepository, RepositoryError};
use crate::repositories::user::parse_timestamp;
use crate::DbPool;

pub struct SqlDocumentRepository {
    pool: DbPool,
}

impl SqlDocumentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<Document, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let title: String = row.try_get("title").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: Option<String> =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let file_path: String =
        row.try_get("file_path").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let file_type: Option<String> =
        row.try_get("file_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let owner_id: String =
        row.try_get("owner_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let uploaded_at: String =
        row.try_get("uploaded_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requires_signature: i64 =
        row.try_get("requires_signature").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Document {
        id: DocumentId(id),
        title,
        description,
        file_path,
        file_type,
        owner_id: UserId(owner_id),
        uploaded_at: parse_timestamp(&uploaded_at),
        updated_at: parse_timestamp(&updated_at),
        status,
        requires_signature: requires_signature != 0,
    })
}

fn row_to_signature(row: &sqlx::sqlite::SqliteRow) -> Result<DocumentSignature, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let document_id: String =
        row.try_get("document_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let signer_id: String =
        row.try_get("signer_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let provider: String =
        row.try_get("provider").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let external_id: Option<String> =
        row.try_get("external_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let signed_at: Option<String> =
        row.try_get("signed_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let status = SignatureStatus::parse(&status)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown signature status `{status}`")))?;
    let provider = SignatureProvider::parse(&provider).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown signature provider `{provider}`"))
    })?;

    Ok(DocumentSignature {
        id: SignatureId(id),
        document_id: DocumentId(document_id),
        signer_id: UserId(signer_id),
        status,
        provider,
        external_id,
        signed_at: signed_at
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc)),
    })
}

#[async_trait::async_trait]
impl DocumentRepository for SqlDocumentRepository {
    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, title, description, file_path, file_type, owner_id, uploaded_at,
                    updated_at, status, requires_signature
             FROM document WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_document(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, document: Document) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO document (id, title, description, file_path, file_type, owner_id,
                                   uploaded_at, updated_at, status, requires_signature)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 description = excluded.description,
                 file_path = excluded.file_path,
                 file_type = excluded.file_type,
                 updated_at = excluded.updated_at,
                 status = excluded.status,
                 requires_signature = excluded.requires_signature",
        )
        .bind(&document.id.0)
        .bind(&document.title)
        .bind(&document.description)
        .bind(&document.file_path)
        .bind(&document.file_type)
        .bind(&document.owner_id.0)
        .bind(document.uploaded_at.to_rfc3339())
        .bind(document.updated_at.to_rfc3339())
        .bind(&document.status)
        .bind(i64::from(document.requires_signature))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, limit: u32) -> Result<Vec<Document>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, title, description, file_path, file_type, owner_id, uploaded_at,
                    updated_at, status, requires_signature
             FROM document ORDER BY uploaded_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_document).collect::<Result<Vec<_>, _>>()
    }

    async fn save_signature(&self, signature: DocumentSignature) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO document_signature (id, document_id, signer_id, status, provider,
                                             external_id, signed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 status = excluded.status,
                 external_id = excluded.external_id,
                 signed_at = excluded.signed_at",
        )
        .bind(&signature.id.0)
        .bind(&signature.document_id.0)
        .bind(&signature.signer_id.0)
        .bind(signature.status.as_str())
        .bind(signature.provider.as_str())
        .bind(&signature.external_id)
        .bind(signature.signed_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_signatures_for_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<DocumentSignature>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, document_id, signer_id, status, provider, external_id, signed_at
             FROM document_signature WHERE document_id = ?",
        )
        .bind(&document_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_signature).collect::<Result<Vec<_>, _>>()
    }

    async fn list_pending_for_signer(
        &self,
        signer_id: &UserId,
    ) -> Result<Vec<DocumentSignature>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, document_id, signer_id, status, provider, external_id, signed_at
             FROM document_signature WHERE signer_id = ? AND status = 'pending'",
        )
        .bind(&signer_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_signature).collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use deskhub_core::domain::document::{
        Document, DocumentId, DocumentSignature, SignatureId, SignatureProvider, SignatureStatus,
    };
    use deskhub_core::domain::user::UserId;

    use super::SqlDocumentRepository;
    use crate::fixtures;
    use crate::repositories::DocumentRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        fixtures::seed_demo_data(&pool).await.expect("seed");
        pool
    }

    fn document(id: &str) -> Document {
        let now = Utc::now();
        Document {
            id: DocumentId(id.to_string()),
            title: "NDA template".to_string(),
            description: None,
            file_path: format!("uploads/{id}.pdf"),
            file_type: Some("application/pdf".to_string()),
            owner_id: UserId(fixtures::ADMIN_USER_ID.to_string()),
            uploaded_at: now,
            updated_at: now,
            status: "active".to_string(),
            requires_signature: true,
        }
    }

    fn signature(id: &str, document_id: &str, status: SignatureStatus) -> DocumentSignature {
        DocumentSignature {
            id: SignatureId(id.to_string()),
            document_id: DocumentId(document_id.to_string()),
            signer_id: UserId(fixtures::MANAGER_USER_ID.to_string()),
            status,
            provider: SignatureProvider::Docusign,
            external_id: Some(format!("env-{id}")),
            signed_at: None,
        }
    }

    #[tokio::test]
    async fn save_and_list_documents() {
        let pool = setup().await;
        let repo = SqlDocumentRepository::new(pool);

        repo.save(document("doc-1")).await.expect("save");
        let documents = repo.list(10).await.expect("list");

        assert_eq!(documents.len(), 1);
        assert!(documents[0].requires_signature);
    }

    #[tokio::test]
    async fn pending_signatures_filter_by_signer_and_status() {
        let pool = setup().await;
        let repo = SqlDocumentRepository::new(pool);

        repo.save(document("doc-1")).await.expect("save document");
        repo.save_signature(signature("sig-1", "doc-1", SignatureStatus::Pending))
            .await
            .expect("save pending");
        repo.save_signature(signature("sig-2", "doc-1", SignatureStatus::Signed))
            .await
            .expect("save signed");

        let pending = repo
            .list_pending_for_signer(&UserId(fixtures::MANAGER_USER_ID.to_string()))
            .await
            .expect("list pending");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id.0, "sig-1");

        let all = repo
            .list_signatures_for_document(&DocumentId("doc-1".to_string()))
            .await
            .expect("list all");
        assert_eq!(all.len(), 2);
    }
}
