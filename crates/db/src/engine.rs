use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{Row, Sqlite, Transaction};
use thiserror::Error;
use uuid::Uuid;

use deskhub_core::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use deskhub_core::domain::request::{Priority, Request, RequestId, RequestStatus};
use deskhub_core::domain::user::UserId;
use deskhub_core::domain::workflow::{
    ApprovalId, ApprovalRecord, ApprovalStatus, WorkflowId, WorkflowInstance, WorkflowStatus,
};
use deskhub_core::workflow::{
    plan_advance, plan_approve, plan_reject, plan_start, AdvanceOutcome, DecisionPlan,
    WorkflowError,
};

use crate::repositories::request::row_to_request;
use crate::repositories::request_type::row_to_request_type;
use crate::repositories::user::parse_timestamp;
use crate::repositories::RepositoryError;
use crate::DbPool;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("{entity} `{id}` was not found")]
    NotFound { entity: &'static str, id: String },
    #[error("request `{request_id}` already has a workflow")]
    WorkflowExists { request_id: String },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for EngineError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Database(error) => Self::Database(error),
            RepositoryError::Decode(message) => Self::Decode(message),
        }
    }
}

/// A pending approval joined with display fields from its request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingApprovalView {
    pub approval: ApprovalRecord,
    pub request_title: String,
    pub priority: Priority,
    pub requester_name: String,
    pub submitted_at: DateTime<Utc>,
}

/// An active workflow joined with step progress for the requester's view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowProgress {
    pub workflow: WorkflowInstance,
    pub request_title: String,
    pub total_steps: u32,
    pub resolved_steps: u32,
}

/// Transactional executor for the approval workflow.
///
/// Each operation loads the rows it needs, delegates the state-machine
/// decision to the planners in `deskhub-core::workflow`, and applies the
/// resulting mutations inside a single transaction. SQLite's single-writer
/// locking plus the read-then-write happening in one transaction serializes
/// concurrent operations on the same request, which is what keeps the
/// one-pending-step invariant intact.
pub struct WorkflowEngine {
    pool: DbPool,
    audit: Option<Arc<dyn AuditSink>>,
}

impl WorkflowEngine {
    pub fn new(pool: DbPool) -> Self {
        Self { pool, audit: None }
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Create the workflow for `request_id` from its request type's current
    /// approver configuration.
    ///
    /// The configuration is snapshotted into one approval row per step; a
    /// second call for the same request fails with `WorkflowExists` (also
    /// backed by a unique index on `workflow.request_id`).
    pub async fn start_workflow(
        &self,
        request_id: &RequestId,
    ) -> Result<WorkflowInstance, EngineError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let request = load_request(&mut tx, request_id).await?;

        let existing: Option<(String,)> =
            sqlx::query_as("SELECT id FROM workflow WHERE request_id = ?")
                .bind(&request_id.0)
                .fetch_optional(&mut *tx)
                .await?;
        if existing.is_some() {
            return Err(EngineError::WorkflowExists { request_id: request_id.0.clone() });
        }

        let request_type_row = sqlx::query(
            "SELECT id, name, description, department, created_by, created_at, updated_at,
                    fields, approver_config
             FROM request_type WHERE id = ?",
        )
        .bind(&request.request_type_id.0)
        .fetch_optional(&mut *tx)
        .await?;
        let request_type = match request_type_row {
            Some(ref row) => row_to_request_type(row)?,
            None => {
                return Err(EngineError::NotFound {
                    entity: "request type",
                    id: request.request_type_id.0.clone(),
                });
            }
        };

        let plan = match plan_start(&request, &request_type, now) {
            Ok(plan) => plan,
            Err(error) => {
                let audit = AuditContext::new(
                    Some(request_id.clone()),
                    Uuid::new_v4().to_string(),
                    request.created_by.0.clone(),
                );
                self.emit_rejected("start", audit, &error);
                return Err(error.into());
            }
        };

        sqlx::query(
            "INSERT INTO workflow (id, request_id, current_step, started_at, completed_at,
                                   due_date, status)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&plan.workflow.id.0)
        .bind(&plan.workflow.request_id.0)
        .bind(i64::from(plan.workflow.current_step))
        .bind(plan.workflow.started_at.to_rfc3339())
        .bind(plan.workflow.completed_at.map(|dt| dt.to_rfc3339()))
        .bind(plan.workflow.due_date.map(|dt| dt.to_rfc3339()))
        .bind(plan.workflow.status.as_str())
        .execute(&mut *tx)
        .await?;

        for record in &plan.approvals {
            sqlx::query(
                "INSERT INTO approval (id, request_id, approver_id, step_order, status,
                                       comments, action_date, notified_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&record.id.0)
            .bind(&record.request_id.0)
            .bind(&record.approver_id.0)
            .bind(i64::from(record.step_order))
            .bind(record.status.as_str())
            .bind(&record.comments)
            .bind(record.action_date.map(|dt| dt.to_rfc3339()))
            .bind(record.notified_at.map(|dt| dt.to_rfc3339()))
            .execute(&mut *tx)
            .await?;
        }

        update_request_status(&mut tx, request_id, plan.request_status, now).await?;
        insert_system_log(
            &mut tx,
            "INFO",
            &format!("Workflow started for request: {}", request.title),
            Some(&request.created_by),
            Some(request_id),
            now,
        )
        .await?;

        tx.commit().await?;

        let audit = AuditContext::new(
            Some(request_id.clone()),
            Uuid::new_v4().to_string(),
            request.created_by.0.clone(),
        );
        self.emit_applied("start", audit, |event| {
            event
                .with_metadata("workflow_id", plan.workflow.id.0.clone())
                .with_metadata("steps", plan.approvals.len().to_string())
        });

        Ok(plan.workflow)
    }

    /// Record `acting_user`'s approval of their pending step and advance the
    /// workflow when no pending step remains.
    pub async fn approve_step(
        &self,
        approval_id: &ApprovalId,
        acting_user: &UserId,
        comments: Option<String>,
    ) -> Result<ApprovalRecord, EngineError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let (request, workflow, approvals, approval) =
            load_decision_context(&mut tx, approval_id).await?;

        let plan = match plan_approve(&workflow, &approvals, &approval, acting_user, comments, now)
        {
            Ok(plan) => plan,
            Err(error) => {
                let audit = AuditContext::new(
                    Some(request.id.clone()),
                    Uuid::new_v4().to_string(),
                    acting_user.0.clone(),
                );
                self.emit_rejected("approve", audit, &error);
                return Err(error.into());
            }
        };

        apply_decision(&mut tx, &request, &plan, now).await?;
        insert_system_log(
            &mut tx,
            "INFO",
            &format!("Request approved: {}", request.title),
            Some(acting_user),
            Some(&request.id),
            now,
        )
        .await?;
        if plan.request_status == RequestStatus::Completed {
            insert_system_log(
                &mut tx,
                "INFO",
                &format!("Workflow completed for request: {}", request.title),
                None,
                Some(&request.id),
                now,
            )
            .await?;
        }

        tx.commit().await?;

        let audit = AuditContext::new(
            Some(request.id.clone()),
            Uuid::new_v4().to_string(),
            acting_user.0.clone(),
        );
        self.emit_applied("approve", audit, |event| {
            let event = event
                .with_metadata("step", plan.approval.step_order.to_string())
                .with_metadata("request_status", plan.request_status.as_str());
            match &plan.activated {
                Some(activated) => event.with_metadata("activated_step", activated.step_order.to_string()),
                None => event,
            }
        });

        Ok(plan.approval)
    }

    /// Record `acting_user`'s rejection. The workflow terminates and the
    /// request is rejected no matter how many steps remain.
    pub async fn reject_step(
        &self,
        approval_id: &ApprovalId,
        acting_user: &UserId,
        comments: Option<String>,
    ) -> Result<ApprovalRecord, EngineError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let (request, workflow, _approvals, approval) =
            load_decision_context(&mut tx, approval_id).await?;

        let plan = match plan_reject(&workflow, &approval, acting_user, comments, now) {
            Ok(plan) => plan,
            Err(error) => {
                let audit = AuditContext::new(
                    Some(request.id.clone()),
                    Uuid::new_v4().to_string(),
                    acting_user.0.clone(),
                );
                self.emit_rejected("reject", audit, &error);
                return Err(error.into());
            }
        };

        apply_decision(&mut tx, &request, &plan, now).await?;
        insert_system_log(
            &mut tx,
            "INFO",
            &format!("Request rejected: {}", request.title),
            Some(acting_user),
            Some(&request.id),
            now,
        )
        .await?;

        tx.commit().await?;

        let audit = AuditContext::new(
            Some(request.id.clone()),
            Uuid::new_v4().to_string(),
            acting_user.0.clone(),
        );
        self.emit_applied("reject", audit, |event| {
            event.with_metadata("step", plan.approval.step_order.to_string())
        });

        Ok(plan.approval)
    }

    /// Move `workflow_id` past its current (approved) step, completing the
    /// workflow when no step remains. A non-active workflow is returned
    /// unchanged.
    pub async fn advance_workflow(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<WorkflowInstance, EngineError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let workflow = load_workflow(&mut tx, workflow_id).await?;
        let approvals = load_approvals(&mut tx, &workflow.request_id).await?;

        let outcome = match plan_advance(&workflow, &approvals, now) {
            Ok(outcome) => outcome,
            Err(error) => {
                let audit = AuditContext::new(
                    Some(workflow.request_id.clone()),
                    Uuid::new_v4().to_string(),
                    "workflow-engine",
                );
                self.emit_rejected("advance", audit, &error);
                return Err(error.into());
            }
        };

        let updated = match outcome {
            AdvanceOutcome::NotActive => {
                return Ok(workflow);
            }
            AdvanceOutcome::Completed { workflow: completed } => {
                update_workflow_row(&mut tx, &completed).await?;
                update_request_status(&mut tx, &completed.request_id, RequestStatus::Completed, now)
                    .await?;
                insert_system_log(
                    &mut tx,
                    "INFO",
                    &format!("Workflow completed for request {}", completed.request_id.0),
                    None,
                    Some(&completed.request_id),
                    now,
                )
                .await?;
                completed
            }
            AdvanceOutcome::Advanced { workflow: advanced, activated } => {
                update_workflow_row(&mut tx, &advanced).await?;
                update_approval_row(&mut tx, &activated).await?;
                update_request_status(
                    &mut tx,
                    &advanced.request_id,
                    RequestStatus::PendingApproval,
                    now,
                )
                .await?;
                insert_system_log(
                    &mut tx,
                    "INFO",
                    &format!(
                        "Workflow advanced to step {} for request {}",
                        advanced.current_step, advanced.request_id.0
                    ),
                    None,
                    Some(&advanced.request_id),
                    now,
                )
                .await?;
                advanced
            }
        };

        tx.commit().await?;

        let audit = AuditContext::new(
            Some(updated.request_id.clone()),
            Uuid::new_v4().to_string(),
            "workflow-engine",
        );
        self.emit_applied("advance", audit, |event| {
            event
                .with_metadata("current_step", updated.current_step.to_string())
                .with_metadata("workflow_status", updated.status.as_str())
        });

        Ok(updated)
    }

    /// The workflow owned by `request_id`, if one was started.
    pub async fn workflow_for_request(
        &self,
        request_id: &RequestId,
    ) -> Result<Option<WorkflowInstance>, EngineError> {
        let row = sqlx::query(
            "SELECT id, request_id, current_step, started_at, completed_at, due_date, status
             FROM workflow WHERE request_id = ?",
        )
        .bind(&request_id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref row) => Ok(Some(row_to_workflow(row)?)),
            None => Ok(None),
        }
    }

    /// All approval records for `request_id`, ordered by step.
    pub async fn approvals_for_request(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<ApprovalRecord>, EngineError> {
        let rows = sqlx::query(
            "SELECT id, request_id, approver_id, step_order, status, comments,
                    action_date, notified_at
             FROM approval WHERE request_id = ? ORDER BY step_order ASC",
        )
        .bind(&request_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_approval).collect()
    }

    /// Steps currently waiting on `approver_id`, most recently notified
    /// first, enriched with request display fields.
    pub async fn pending_approvals_for(
        &self,
        approver_id: &UserId,
    ) -> Result<Vec<PendingApprovalView>, EngineError> {
        let rows = sqlx::query(
            "SELECT a.id, a.request_id, a.approver_id, a.step_order, a.status, a.comments,
                    a.action_date, a.notified_at,
                    r.title AS request_title, r.priority, r.created_at AS submitted_at,
                    u.full_name AS requester_name
             FROM approval a
             JOIN request r ON r.id = a.request_id
             JOIN user_account u ON u.id = r.created_by
             WHERE a.approver_id = ? AND a.status = 'pending_approval'
             ORDER BY a.notified_at DESC",
        )
        .bind(&approver_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let approval = row_to_approval(row)?;
                let request_title: String = row
                    .try_get("request_title")
                    .map_err(|e| EngineError::Decode(e.to_string()))?;
                let priority: String =
                    row.try_get("priority").map_err(|e| EngineError::Decode(e.to_string()))?;
                let submitted_at: String =
                    row.try_get("submitted_at").map_err(|e| EngineError::Decode(e.to_string()))?;
                let requester_name: String = row
                    .try_get("requester_name")
                    .map_err(|e| EngineError::Decode(e.to_string()))?;

                Ok(PendingApprovalView {
                    approval,
                    request_title,
                    priority: Priority::parse(&priority)
                        .ok_or_else(|| EngineError::Decode(format!("unknown priority `{priority}`")))?,
                    requester_name,
                    submitted_at: parse_timestamp(&submitted_at),
                })
            })
            .collect()
    }

    /// Active workflows for requests created by `user_id`, with step
    /// progress counts for dashboard display.
    pub async fn active_workflows_for(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<WorkflowProgress>, EngineError> {
        let rows = sqlx::query(
            "SELECT w.id, w.request_id, w.current_step, w.started_at, w.completed_at,
                    w.due_date, w.status,
                    r.title AS request_title,
                    (SELECT COUNT(*) FROM approval a WHERE a.request_id = w.request_id)
                        AS total_steps,
                    (SELECT COUNT(*) FROM approval a
                     WHERE a.request_id = w.request_id
                       AND a.status IN ('approved', 'rejected')) AS resolved_steps
             FROM workflow w
             JOIN request r ON r.id = w.request_id
             WHERE r.created_by = ? AND w.status = 'active'
             ORDER BY w.due_date IS NULL, w.due_date ASC",
        )
        .bind(&user_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let workflow = row_to_workflow(row)?;
                let request_title: String = row
                    .try_get("request_title")
                    .map_err(|e| EngineError::Decode(e.to_string()))?;
                let total_steps: i64 =
                    row.try_get("total_steps").map_err(|e| EngineError::Decode(e.to_string()))?;
                let resolved_steps: i64 = row
                    .try_get("resolved_steps")
                    .map_err(|e| EngineError::Decode(e.to_string()))?;

                Ok(WorkflowProgress {
                    workflow,
                    request_title,
                    total_steps: total_steps as u32,
                    resolved_steps: resolved_steps as u32,
                })
            })
            .collect()
    }

    fn emit_applied<F>(&self, operation: &str, audit: AuditContext, decorate: F)
    where
        F: FnOnce(AuditEvent) -> AuditEvent,
    {
        if let Some(sink) = &self.audit {
            let event = AuditEvent::new(
                audit.request_id,
                audit.correlation_id,
                "workflow.transition_applied",
                AuditCategory::Workflow,
                audit.actor,
                AuditOutcome::Success,
            )
            .with_metadata("operation", operation);
            sink.emit(decorate(event));
        }
    }

    fn emit_rejected(&self, operation: &str, audit: AuditContext, error: &WorkflowError) {
        if let Some(sink) = &self.audit {
            sink.emit(
                AuditEvent::new(
                    audit.request_id,
                    audit.correlation_id,
                    "workflow.transition_rejected",
                    AuditCategory::Workflow,
                    audit.actor,
                    AuditOutcome::Rejected,
                )
                .with_metadata("operation", operation)
                .with_metadata("error", error.to_string()),
            );
        }
    }
}

fn row_to_workflow(row: &sqlx::sqlite::SqliteRow) -> Result<WorkflowInstance, EngineError> {
    let id: String = row.try_get("id").map_err(|e| EngineError::Decode(e.to_string()))?;
    let request_id: String =
        row.try_get("request_id").map_err(|e| EngineError::Decode(e.to_string()))?;
    let current_step: i64 =
        row.try_get("current_step").map_err(|e| EngineError::Decode(e.to_string()))?;
    let started_at: String =
        row.try_get("started_at").map_err(|e| EngineError::Decode(e.to_string()))?;
    let completed_at: Option<String> =
        row.try_get("completed_at").map_err(|e| EngineError::Decode(e.to_string()))?;
    let due_date: Option<String> =
        row.try_get("due_date").map_err(|e| EngineError::Decode(e.to_string()))?;
    let status: String = row.try_get("status").map_err(|e| EngineError::Decode(e.to_string()))?;

    Ok(WorkflowInstance {
        id: WorkflowId(id),
        request_id: RequestId(request_id),
        current_step: current_step as u32,
        started_at: parse_timestamp(&started_at),
        completed_at: completed_at
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        due_date: due_date
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        status: WorkflowStatus::parse(&status)
            .ok_or_else(|| EngineError::Decode(format!("unknown workflow status `{status}`")))?,
    })
}

fn row_to_approval(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovalRecord, EngineError> {
    let id: String = row.try_get("id").map_err(|e| EngineError::Decode(e.to_string()))?;
    let request_id: String =
        row.try_get("request_id").map_err(|e| EngineError::Decode(e.to_string()))?;
    let approver_id: String =
        row.try_get("approver_id").map_err(|e| EngineError::Decode(e.to_string()))?;
    let step_order: i64 =
        row.try_get("step_order").map_err(|e| EngineError::Decode(e.to_string()))?;
    let status: String = row.try_get("status").map_err(|e| EngineError::Decode(e.to_string()))?;
    let comments: Option<String> =
        row.try_get("comments").map_err(|e| EngineError::Decode(e.to_string()))?;
    let action_date: Option<String> =
        row.try_get("action_date").map_err(|e| EngineError::Decode(e.to_string()))?;
    let notified_at: Option<String> =
        row.try_get("notified_at").map_err(|e| EngineError::Decode(e.to_string()))?;

    Ok(ApprovalRecord {
        id: ApprovalId(id),
        request_id: RequestId(request_id),
        approver_id: UserId(approver_id),
        step_order: step_order as u32,
        status: ApprovalStatus::parse(&status)
            .ok_or_else(|| EngineError::Decode(format!("unknown approval status `{status}`")))?,
        comments,
        action_date: action_date
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        notified_at: notified_at
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc)),
    })
}

async fn load_request(
    tx: &mut Transaction<'_, Sqlite>,
    request_id: &RequestId,
) -> Result<Request, EngineError> {
    let row = sqlx::query(
        "SELECT id, request_type_id, title, description, status, priority,
                created_by, created_at, updated_at, due_date, data
         FROM request WHERE id = ?",
    )
    .bind(&request_id.0)
    .fetch_optional(&mut **tx)
    .await?;

    match row {
        Some(ref row) => Ok(row_to_request(row)?),
        None => Err(EngineError::NotFound { entity: "request", id: request_id.0.clone() }),
    }
}

async fn load_workflow(
    tx: &mut Transaction<'_, Sqlite>,
    workflow_id: &WorkflowId,
) -> Result<WorkflowInstance, EngineError> {
    let row = sqlx::query(
        "SELECT id, request_id, current_step, started_at, completed_at, due_date, status
         FROM workflow WHERE id = ?",
    )
    .bind(&workflow_id.0)
    .fetch_optional(&mut **tx)
    .await?;

    match row {
        Some(ref row) => row_to_workflow(row),
        None => Err(EngineError::NotFound { entity: "workflow", id: workflow_id.0.clone() }),
    }
}

async fn load_approvals(
    tx: &mut Transaction<'_, Sqlite>,
    request_id: &RequestId,
) -> Result<Vec<ApprovalRecord>, EngineError> {
    let rows = sqlx::query(
        "SELECT id, request_id, approver_id, step_order, status, comments,
                action_date, notified_at
         FROM approval WHERE request_id = ? ORDER BY step_order ASC",
    )
    .bind(&request_id.0)
    .fetch_all(&mut **tx)
    .await?;

    rows.iter().map(row_to_approval).collect()
}

async fn load_decision_context(
    tx: &mut Transaction<'_, Sqlite>,
    approval_id: &ApprovalId,
) -> Result<(Request, WorkflowInstance, Vec<ApprovalRecord>, ApprovalRecord), EngineError> {
    let row = sqlx::query(
        "SELECT id, request_id, approver_id, step_order, status, comments,
                action_date, notified_at
         FROM approval WHERE id = ?",
    )
    .bind(&approval_id.0)
    .fetch_optional(&mut **tx)
    .await?;
    let approval = match row {
        Some(ref row) => row_to_approval(row)?,
        None => {
            return Err(EngineError::NotFound { entity: "approval", id: approval_id.0.clone() });
        }
    };

    let request = load_request(tx, &approval.request_id).await?;

    let workflow_row = sqlx::query(
        "SELECT id, request_id, current_step, started_at, completed_at, due_date, status
         FROM workflow WHERE request_id = ?",
    )
    .bind(&approval.request_id.0)
    .fetch_optional(&mut **tx)
    .await?;
    let workflow = match workflow_row {
        Some(ref row) => row_to_workflow(row)?,
        None => {
            return Err(EngineError::NotFound {
                entity: "workflow",
                id: approval.request_id.0.clone(),
            });
        }
    };

    let approvals = load_approvals(tx, &approval.request_id).await?;

    Ok((request, workflow, approvals, approval))
}

async fn apply_decision(
    tx: &mut Transaction<'_, Sqlite>,
    request: &Request,
    plan: &DecisionPlan,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    update_approval_row(tx, &plan.approval).await?;
    if let Some(workflow) = &plan.workflow {
        update_workflow_row(tx, workflow).await?;
    }
    if let Some(activated) = &plan.activated {
        update_approval_row(tx, activated).await?;
    }
    update_request_status(tx, &request.id, plan.request_status, now).await?;
    Ok(())
}

async fn update_approval_row(
    tx: &mut Transaction<'_, Sqlite>,
    record: &ApprovalRecord,
) -> Result<(), EngineError> {
    sqlx::query(
        "UPDATE approval SET status = ?, comments = ?, action_date = ?, notified_at = ?
         WHERE id = ?",
    )
    .bind(record.status.as_str())
    .bind(&record.comments)
    .bind(record.action_date.map(|dt| dt.to_rfc3339()))
    .bind(record.notified_at.map(|dt| dt.to_rfc3339()))
    .bind(&record.id.0)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn update_workflow_row(
    tx: &mut Transaction<'_, Sqlite>,
    workflow: &WorkflowInstance,
) -> Result<(), EngineError> {
    sqlx::query("UPDATE workflow SET current_step = ?, status = ?, completed_at = ? WHERE id = ?")
        .bind(i64::from(workflow.current_step))
        .bind(workflow.status.as_str())
        .bind(workflow.completed_at.map(|dt| dt.to_rfc3339()))
        .bind(&workflow.id.0)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn update_request_status(
    tx: &mut Transaction<'_, Sqlite>,
    request_id: &RequestId,
    status: RequestStatus,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    sqlx::query("UPDATE request SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(now.to_rfc3339())
        .bind(&request_id.0)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn insert_system_log(
    tx: &mut Transaction<'_, Sqlite>,
    level: &str,
    message: &str,
    user_id: Option<&UserId>,
    request_id: Option<&RequestId>,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    sqlx::query(
        "INSERT INTO system_log (id, logged_at, level, message, user_id, request_id)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(now.to_rfc3339())
    .bind(level)
    .bind(message)
    .bind(user_id.map(|id| id.0.clone()))
    .bind(request_id.map(|id| id.0.clone()))
    .execute(&mut **tx)
    .await?;
    Ok(())
}
