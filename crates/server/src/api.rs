//! JSON API for the portal.
//!
//! Endpoints:
//! - `GET  /api/announcements`                  — active announcements, newest first
//! - `POST /api/announcements`                  — publish an announcement
//! - `GET  /api/requests`                       — requests created by a user
//! - `GET  /api/requests/recent`                — newest requests
//! - `GET  /api/requests/{id}`                  — request with workflow and approvals
//! - `POST /api/requests`                       — submit a request and start its workflow
//! - `GET  /api/approvals/pending`              — steps waiting on an approver
//! - `POST /api/approvals/{id}/approve`         — approve the pending step
//! - `POST /api/approvals/{id}/reject`          — reject the pending step
//! - `GET  /api/workflows/active`               — a requester's in-flight workflows
//! - `GET  /api/documents`                      — document metadata listing
//! - `POST /api/documents`                      — register an uploaded document
//! - `POST /api/documents/{id}/request-signature` — route a document for e-signature
//! - `GET  /api/documents/to-sign`              — signature requests waiting on a signer
//! - `GET  /api/admin/users` / `POST ...`       — user administration
//! - `GET  /api/admin/request-types` / `POST ...` — request type administration
//! - `GET  /api/config` / `POST /api/config`    — system settings

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use deskhub_core::domain::announcement::{Announcement, AnnouncementId};
use deskhub_core::domain::document::{
    Document, DocumentId, DocumentSignature, SignatureId, SignatureProvider, SignatureStatus,
};
use deskhub_core::domain::request::{Priority, Request, RequestId, RequestStatus};
use deskhub_core::domain::request_type::{
    ApproverStep, FormField, RequestType, RequestTypeId,
};
use deskhub_core::domain::user::{Department, User, UserId, UserRole, UserStatus};
use deskhub_core::domain::workflow::{ApprovalId, ApprovalRecord, WorkflowInstance};
use deskhub_core::errors::{ApplicationError, InterfaceErrorKind};
use deskhub_core::notify::{Notifier, WorkflowEvent};
use deskhub_core::workflow::WorkflowError;
use deskhub_db::repositories::{
    AnnouncementRepository, DocumentRepository, RepositoryError, RequestRepository,
    RequestTypeRepository, SettingsRepository, SqlAnnouncementRepository, SqlDocumentRepository,
    SqlRequestRepository, SqlRequestTypeRepository, SqlSettingsRepository, SqlUserRepository,
    SystemSetting, UserRepository,
};
use deskhub_db::{DbPool, EngineError, WorkflowEngine};

use crate::signature::{SignatureClient, SignatureError};

#[derive(Clone)]
pub struct ApiState {
    pub db_pool: DbPool,
    pub engine: Arc<WorkflowEngine>,
    pub notifier: Arc<dyn Notifier>,
    pub signature_client: Arc<dyn SignatureClient>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/announcements", get(list_announcements).post(create_announcement))
        .route("/api/requests", get(list_requests).post(create_request))
        .route("/api/requests/recent", get(list_recent_requests))
        .route("/api/requests/{id}", get(request_detail))
        .route("/api/approvals/pending", get(pending_approvals))
        .route("/api/approvals/{id}/approve", post(approve))
        .route("/api/approvals/{id}/reject", post(reject))
        .route("/api/workflows/active", get(active_workflows))
        .route("/api/documents", get(list_documents).post(create_document))
        .route("/api/documents/to-sign", get(documents_to_sign))
        .route("/api/documents/{id}/request-signature", post(request_signature))
        .route("/api/admin/users", get(list_users).post(create_user))
        .route("/api/admin/request-types", get(list_request_types).post(create_request_type))
        .route("/api/admin/request-types/{id}", axum::routing::put(update_request_type))
        .route("/api/config", get(list_settings).post(set_setting))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
}

pub enum ApiError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    /// Infrastructure failure. The detail goes to the logs under a minted
    /// correlation id; the caller sees only the user-safe message.
    Internal(ApplicationError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, ErrorBody { error: message, correlation_id: None })
            }
            Self::Forbidden(message) => {
                (StatusCode::FORBIDDEN, ErrorBody { error: message, correlation_id: None })
            }
            Self::NotFound(message) => {
                (StatusCode::NOT_FOUND, ErrorBody { error: message, correlation_id: None })
            }
            Self::Conflict(message) => {
                (StatusCode::CONFLICT, ErrorBody { error: message, correlation_id: None })
            }
            Self::Internal(source) => {
                let correlation_id = Uuid::new_v4().to_string();
                warn!(
                    event_name = "api.internal_error",
                    correlation_id = %correlation_id,
                    error = %source,
                    "request failed"
                );
                let interface = source.into_interface(correlation_id.clone());
                let status = match interface.kind {
                    InterfaceErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let body = ErrorBody {
                    error: interface.user_message().to_string(),
                    correlation_id: Some(correlation_id),
                };
                (status, body)
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(value: EngineError) -> Self {
        match value {
            EngineError::Workflow(error) => match error {
                WorkflowError::EmptyApproverConfig { .. }
                | WorkflowError::MalformedApproverConfig { .. } => {
                    Self::BadRequest(error.to_string())
                }
                WorkflowError::NotAssignedApprover { .. } => Self::Forbidden(error.to_string()),
                WorkflowError::ApprovalNotPending { .. }
                | WorkflowError::CurrentStepNotCompleted { .. } => {
                    Self::Conflict(error.to_string())
                }
            },
            EngineError::NotFound { .. } => Self::NotFound(value.to_string()),
            EngineError::WorkflowExists { .. } => Self::Conflict(value.to_string()),
            EngineError::Database(_) | EngineError::Decode(_) => {
                Self::Internal(ApplicationError::Persistence(value.to_string()))
            }
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(value: RepositoryError) -> Self {
        Self::Internal(ApplicationError::Persistence(value.to_string()))
    }
}

impl From<SignatureError> for ApiError {
    fn from(value: SignatureError) -> Self {
        Self::BadRequest(value.to_string())
    }
}

// ---------------------------------------------------------------------------
// Announcements
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<u32>,
}

async fn list_announcements(
    State(state): State<ApiState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Announcement>>, ApiError> {
    let repo = SqlAnnouncementRepository::new(state.db_pool.clone());
    let announcements = repo.list_recent(Utc::now(), query.limit.unwrap_or(5)).await?;
    Ok(Json(announcements))
}

#[derive(Debug, Deserialize)]
struct CreateAnnouncement {
    title: String,
    content: String,
    author_id: String,
    expires_at: Option<DateTime<Utc>>,
}

async fn create_announcement(
    State(state): State<ApiState>,
    Json(payload): Json<CreateAnnouncement>,
) -> Result<(StatusCode, Json<Announcement>), ApiError> {
    require_user(&state.db_pool, &payload.author_id).await?;

    let now = Utc::now();
    let announcement = Announcement {
        id: AnnouncementId(Uuid::new_v4().to_string()),
        title: payload.title,
        content: payload.content,
        author_id: UserId(payload.author_id),
        created_at: now,
        updated_at: now,
        expires_at: payload.expires_at,
        is_active: true,
    };

    SqlAnnouncementRepository::new(state.db_pool.clone()).save(announcement.clone()).await?;
    Ok((StatusCode::CREATED, Json(announcement)))
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct UserQuery {
    user_id: String,
}

async fn list_requests(
    State(state): State<ApiState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<Request>>, ApiError> {
    let repo = SqlRequestRepository::new(state.db_pool.clone());
    let requests = repo.list_by_creator(&UserId(query.user_id)).await?;
    Ok(Json(requests))
}

async fn list_recent_requests(
    State(state): State<ApiState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Request>>, ApiError> {
    let repo = SqlRequestRepository::new(state.db_pool.clone());
    let requests = repo.list_recent(query.limit.unwrap_or(10)).await?;
    Ok(Json(requests))
}

#[derive(Debug, Serialize)]
struct RequestDetail {
    request: Request,
    workflow: Option<WorkflowInstance>,
    approvals: Vec<ApprovalRecord>,
}

async fn request_detail(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<RequestDetail>, ApiError> {
    let request_id = RequestId(id);
    let request = SqlRequestRepository::new(state.db_pool.clone())
        .find_by_id(&request_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("request `{}` was not found", request_id.0)))?;

    let workflow = state.engine.workflow_for_request(&request_id).await?;
    let approvals = state.engine.approvals_for_request(&request_id).await?;

    Ok(Json(RequestDetail { request, workflow, approvals }))
}

#[derive(Debug, Deserialize)]
struct CreateRequest {
    request_type_id: String,
    title: String,
    description: Option<String>,
    priority: Option<Priority>,
    created_by: String,
    due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct CreatedRequest {
    request: Request,
    workflow: WorkflowInstance,
}

/// Submit a request: persist it, then immediately start its workflow. The
/// draft row survives a failed start so the submitter can fix the request
/// type configuration and retry.
async fn create_request(
    State(state): State<ApiState>,
    Json(payload): Json<CreateRequest>,
) -> Result<(StatusCode, Json<CreatedRequest>), ApiError> {
    let request_type_id = RequestTypeId(payload.request_type_id);
    let request_type = SqlRequestTypeRepository::new(state.db_pool.clone())
        .find_by_id(&request_type_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("request type `{}` was not found", request_type_id.0))
        })?;

    let data = if payload.data.is_null() { serde_json::json!({}) } else { payload.data };
    let missing = request_type.missing_required_fields(&data);
    if !missing.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    require_user(&state.db_pool, &payload.created_by).await?;

    let now = Utc::now();
    let request = Request {
        id: RequestId(Uuid::new_v4().to_string()),
        request_type_id,
        title: payload.title,
        description: payload.description,
        status: RequestStatus::Draft,
        priority: payload.priority.unwrap_or(Priority::Normal),
        created_by: UserId(payload.created_by),
        created_at: now,
        updated_at: now,
        due_date: payload.due_date,
        data,
    };
    SqlRequestRepository::new(state.db_pool.clone()).save(request.clone()).await?;

    let workflow = state.engine.start_workflow(&request.id).await?;

    let approvals = state.engine.approvals_for_request(&request.id).await?;
    if let Some(activated) = approvals.iter().find(|record| record.is_pending()).cloned() {
        let mut started = request.clone();
        started.status = RequestStatus::PendingApproval;
        notify_best_effort(
            state.notifier.as_ref(),
            &WorkflowEvent::Started { request: started, activated },
        )
        .await;
    }

    let mut created = request;
    created.status = RequestStatus::PendingApproval;
    Ok((StatusCode::CREATED, Json(CreatedRequest { request: created, workflow })))
}

// ---------------------------------------------------------------------------
// Approvals
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct PendingApprovalItem {
    approval: ApprovalRecord,
    request_title: String,
    priority: Priority,
    requester_name: String,
    submitted_at: DateTime<Utc>,
    is_urgent: bool,
}

async fn pending_approvals(
    State(state): State<ApiState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<PendingApprovalItem>>, ApiError> {
    let pending = state.engine.pending_approvals_for(&UserId(query.user_id)).await?;
    let items = pending
        .into_iter()
        .map(|view| PendingApprovalItem {
            is_urgent: view.priority.is_urgent(),
            approval: view.approval,
            request_title: view.request_title,
            priority: view.priority,
            requester_name: view.requester_name,
            submitted_at: view.submitted_at,
        })
        .collect();
    Ok(Json(items))
}

#[derive(Debug, Deserialize)]
struct DecisionPayload {
    user_id: String,
    comments: Option<String>,
}

async fn approve(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(payload): Json<DecisionPayload>,
) -> Result<Json<ApprovalRecord>, ApiError> {
    let approval_id = ApprovalId(id);
    let acting_user = UserId(payload.user_id);

    let record =
        state.engine.approve_step(&approval_id, &acting_user, payload.comments).await?;

    if let Some(request) = SqlRequestRepository::new(state.db_pool.clone())
        .find_by_id(&record.request_id)
        .await?
    {
        let approvals = state.engine.approvals_for_request(&record.request_id).await?;
        let activated = approvals.iter().find(|other| other.is_pending()).cloned();
        notify_best_effort(
            state.notifier.as_ref(),
            &WorkflowEvent::StepApproved { request, approval: record.clone(), activated },
        )
        .await;
    }

    Ok(Json(record))
}

async fn reject(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(payload): Json<DecisionPayload>,
) -> Result<Json<ApprovalRecord>, ApiError> {
    let approval_id = ApprovalId(id);
    let acting_user = UserId(payload.user_id);

    let record = state.engine.reject_step(&approval_id, &acting_user, payload.comments).await?;

    if let Some(request) = SqlRequestRepository::new(state.db_pool.clone())
        .find_by_id(&record.request_id)
        .await?
    {
        notify_best_effort(
            state.notifier.as_ref(),
            &WorkflowEvent::StepRejected { request, approval: record.clone() },
        )
        .await;
    }

    Ok(Json(record))
}

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ActiveWorkflowItem {
    workflow: WorkflowInstance,
    request_title: String,
    total_steps: u32,
    resolved_steps: u32,
}

async fn active_workflows(
    State(state): State<ApiState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<ActiveWorkflowItem>>, ApiError> {
    let progress = state.engine.active_workflows_for(&UserId(query.user_id)).await?;
    let items = progress
        .into_iter()
        .map(|item| ActiveWorkflowItem {
            workflow: item.workflow,
            request_title: item.request_title,
            total_steps: item.total_steps,
            resolved_steps: item.resolved_steps,
        })
        .collect();
    Ok(Json(items))
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

async fn list_documents(
    State(state): State<ApiState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let documents =
        SqlDocumentRepository::new(state.db_pool.clone()).list(query.limit.unwrap_or(20)).await?;
    Ok(Json(documents))
}

#[derive(Debug, Deserialize)]
struct CreateDocument {
    title: String,
    description: Option<String>,
    file_path: String,
    file_type: Option<String>,
    owner_id: String,
    #[serde(default)]
    requires_signature: bool,
}

async fn create_document(
    State(state): State<ApiState>,
    Json(payload): Json<CreateDocument>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    require_user(&state.db_pool, &payload.owner_id).await?;

    let now = Utc::now();
    let document = Document {
        id: DocumentId(Uuid::new_v4().to_string()),
        title: payload.title,
        description: payload.description,
        file_path: payload.file_path,
        file_type: payload.file_type,
        owner_id: UserId(payload.owner_id),
        uploaded_at: now,
        updated_at: now,
        status: "active".to_string(),
        requires_signature: payload.requires_signature,
    };

    SqlDocumentRepository::new(state.db_pool.clone()).save(document.clone()).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

#[derive(Debug, Deserialize)]
struct RequestSignature {
    signer_id: String,
    provider: SignatureProvider,
}

async fn request_signature(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(payload): Json<RequestSignature>,
) -> Result<(StatusCode, Json<DocumentSignature>), ApiError> {
    let repo = SqlDocumentRepository::new(state.db_pool.clone());
    let document_id = DocumentId(id);
    let document = repo
        .find_by_id(&document_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("document `{}` was not found", document_id.0)))?;

    let signer = require_user(&state.db_pool, &payload.signer_id).await?;

    let external_id =
        state.signature_client.create_envelope(&document, &signer, payload.provider).await?;

    let signature = DocumentSignature {
        id: SignatureId(Uuid::new_v4().to_string()),
        document_id: document.id.clone(),
        signer_id: signer.id,
        status: SignatureStatus::Pending,
        provider: payload.provider,
        external_id: Some(external_id),
        signed_at: None,
    };
    repo.save_signature(signature.clone()).await?;

    let mut updated = document;
    updated.requires_signature = true;
    updated.updated_at = Utc::now();
    repo.save(updated).await?;

    Ok((StatusCode::CREATED, Json(signature)))
}

async fn documents_to_sign(
    State(state): State<ApiState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<DocumentSignature>>, ApiError> {
    let signatures = SqlDocumentRepository::new(state.db_pool.clone())
        .list_pending_for_signer(&UserId(query.user_id))
        .await?;
    Ok(Json(signatures))
}

// ---------------------------------------------------------------------------
// Administration
// ---------------------------------------------------------------------------

async fn list_users(State(state): State<ApiState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = SqlUserRepository::new(state.db_pool.clone()).list(200).await?;
    Ok(Json(users))
}

#[derive(Debug, Deserialize)]
struct CreateUser {
    username: String,
    email: String,
    full_name: String,
    department: Option<Department>,
    role: Option<UserRole>,
}

async fn create_user(
    State(state): State<ApiState>,
    Json(payload): Json<CreateUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    if payload.username.trim().is_empty() || payload.email.trim().is_empty() {
        return Err(ApiError::BadRequest("username and email are required".to_string()));
    }

    let now = Utc::now();
    let user = User {
        id: UserId(Uuid::new_v4().to_string()),
        username: payload.username,
        email: payload.email,
        full_name: payload.full_name,
        department: payload.department,
        role: payload.role.unwrap_or(UserRole::User),
        status: UserStatus::Active,
        created_at: now,
        updated_at: now,
    };

    SqlUserRepository::new(state.db_pool.clone()).save(user.clone()).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_request_types(
    State(state): State<ApiState>,
) -> Result<Json<Vec<RequestType>>, ApiError> {
    let types = SqlRequestTypeRepository::new(state.db_pool.clone()).list().await?;
    Ok(Json(types))
}

#[derive(Debug, Deserialize)]
struct CreateRequestType {
    name: String,
    description: Option<String>,
    department: Department,
    created_by: String,
    #[serde(default)]
    fields: Vec<FormField>,
    approver_config: Vec<ApproverStep>,
}

/// Admin boundary validation goes further than the engine's own check: every
/// configured approver must be an existing user able to act.
async fn create_request_type(
    State(state): State<ApiState>,
    Json(payload): Json<CreateRequestType>,
) -> Result<(StatusCode, Json<RequestType>), ApiError> {
    if payload.approver_config.is_empty() {
        return Err(ApiError::BadRequest(
            "approver_config must contain at least one step".to_string(),
        ));
    }

    let users = SqlUserRepository::new(state.db_pool.clone());
    for step in &payload.approver_config {
        let approver = users
            .find_by_id(&step.approver_id)
            .await?
            .ok_or_else(|| {
                ApiError::BadRequest(format!("approver `{}` does not exist", step.approver_id.0))
            })?;
        if !approver.can_approve() {
            return Err(ApiError::BadRequest(format!(
                "approver `{}` is not an active user",
                step.approver_id.0
            )));
        }
    }

    require_user(&state.db_pool, &payload.created_by).await?;

    let now = Utc::now();
    let request_type = RequestType {
        id: RequestTypeId(Uuid::new_v4().to_string()),
        name: payload.name,
        description: payload.description,
        department: payload.department,
        created_by: UserId(payload.created_by),
        created_at: now,
        updated_at: now,
        fields: payload.fields,
        approver_config: payload.approver_config,
    };

    SqlRequestTypeRepository::new(state.db_pool.clone()).save(request_type.clone()).await?;
    Ok((StatusCode::CREATED, Json(request_type)))
}

/// Edits apply to future submissions only: workflows already in flight keep
/// the approver snapshot taken when they started.
async fn update_request_type(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(payload): Json<CreateRequestType>,
) -> Result<Json<RequestType>, ApiError> {
    let repo = SqlRequestTypeRepository::new(state.db_pool.clone());
    let request_type_id = RequestTypeId(id);
    let existing = repo.find_by_id(&request_type_id).await?.ok_or_else(|| {
        ApiError::NotFound(format!("request type `{}` was not found", request_type_id.0))
    })?;

    if payload.approver_config.is_empty() {
        return Err(ApiError::BadRequest(
            "approver_config must contain at least one step".to_string(),
        ));
    }
    let users = SqlUserRepository::new(state.db_pool.clone());
    for step in &payload.approver_config {
        let approver = users.find_by_id(&step.approver_id).await?.ok_or_else(|| {
            ApiError::BadRequest(format!("approver `{}` does not exist", step.approver_id.0))
        })?;
        if !approver.can_approve() {
            return Err(ApiError::BadRequest(format!(
                "approver `{}` is not an active user",
                step.approver_id.0
            )));
        }
    }

    let updated = RequestType {
        id: existing.id.clone(),
        name: payload.name,
        description: payload.description,
        department: payload.department,
        created_by: existing.created_by.clone(),
        created_at: existing.created_at,
        updated_at: Utc::now(),
        fields: payload.fields,
        approver_config: payload.approver_config,
    };
    repo.save(updated.clone()).await?;

    Ok(Json(updated))
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

async fn list_settings(State(state): State<ApiState>) -> Result<Json<Vec<SystemSetting>>, ApiError> {
    let settings = SqlSettingsRepository::new(state.db_pool.clone()).all().await?;
    Ok(Json(settings))
}

#[derive(Debug, Deserialize)]
struct SetSetting {
    key: String,
    value: Option<String>,
    description: Option<String>,
}

async fn set_setting(
    State(state): State<ApiState>,
    Json(payload): Json<SetSetting>,
) -> Result<StatusCode, ApiError> {
    if payload.key.trim().is_empty() {
        return Err(ApiError::BadRequest("setting key must not be empty".to_string()));
    }

    SqlSettingsRepository::new(state.db_pool.clone())
        .set(&payload.key, payload.value, payload.description)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn require_user(pool: &DbPool, id: &str) -> Result<User, ApiError> {
    SqlUserRepository::new(pool.clone())
        .find_by_id(&UserId(id.to_string()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user `{id}` was not found")))
}

async fn notify_best_effort(notifier: &dyn Notifier, event: &WorkflowEvent) {
    if let Err(error) = notifier.notify(event).await {
        warn!(
            event_name = "notify.delivery_failed",
            event_type = event.event_type(),
            request_id = %event.request().id.0,
            error = %error,
            "notification dropped after failure"
        );
    }
}
