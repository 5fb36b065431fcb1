use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::request::{Request, RequestStatus};
use crate::domain::request_type::RequestType;
use crate::domain::user::UserId;
use crate::domain::workflow::{
    ApprovalId, ApprovalRecord, ApprovalStatus, WorkflowId, WorkflowInstance, WorkflowStatus,
};

/// Typed failures raised by the workflow planners. Every failure aborts the
/// single operation that raised it; nothing is retried.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("request type `{request_type_id}` has an empty approver configuration")]
    EmptyApproverConfig { request_type_id: String },
    #[error(
        "approver configuration entry {position} for request type `{request_type_id}` has a blank approver id"
    )]
    MalformedApproverConfig { request_type_id: String, position: usize },
    #[error("user `{user_id}` is not the assigned approver for approval `{approval_id}`")]
    NotAssignedApprover { approval_id: String, user_id: String },
    #[error("approval `{approval_id}` is {status:?}, not pending approval")]
    ApprovalNotPending { approval_id: String, status: ApprovalStatus },
    #[error("current step {step} of workflow `{workflow_id}` is not completed")]
    CurrentStepNotCompleted { workflow_id: String, step: u32 },
}

/// Row mutations that start a workflow for a submitted request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartPlan {
    pub workflow: WorkflowInstance,
    pub approvals: Vec<ApprovalRecord>,
    pub request_status: RequestStatus,
}

/// Row mutations produced by an approver acting on their pending step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionPlan {
    /// The acted-on approval record, updated.
    pub approval: ApprovalRecord,
    /// Committed status for the owning request after this operation.
    pub request_status: RequestStatus,
    /// Updated workflow instance, when the decision changed it.
    pub workflow: Option<WorkflowInstance>,
    /// The next step's record, when the decision activated one.
    pub activated: Option<ApprovalRecord>,
}

/// Result of advancing a workflow past its current step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The workflow is already completed or terminated; advancing is a no-op.
    NotActive,
    /// Moved to the next step and activated its approval record.
    Advanced { workflow: WorkflowInstance, activated: ApprovalRecord },
    /// No step remained past the current one; the workflow is done.
    Completed { workflow: WorkflowInstance },
}

/// Plan the creation of a workflow for `request`.
///
/// The approver sequence is copied out of `request_type` into one approval
/// record per entry. The copy is a snapshot: editing the request type later
/// never changes an in-flight workflow. Step 1 starts `PendingApproval` and
/// is marked notified; every later step starts `Waiting`.
pub fn plan_start(
    request: &Request,
    request_type: &RequestType,
    now: DateTime<Utc>,
) -> Result<StartPlan, WorkflowError> {
    if request_type.approver_config.is_empty() {
        return Err(WorkflowError::EmptyApproverConfig {
            request_type_id: request_type.id.0.clone(),
        });
    }
    for (index, step) in request_type.approver_config.iter().enumerate() {
        if step.approver_id.0.trim().is_empty() {
            return Err(WorkflowError::MalformedApproverConfig {
                request_type_id: request_type.id.0.clone(),
                position: index + 1,
            });
        }
    }

    let workflow = WorkflowInstance {
        id: WorkflowId(Uuid::new_v4().to_string()),
        request_id: request.id.clone(),
        current_step: 1,
        started_at: now,
        completed_at: None,
        due_date: request.due_date,
        status: WorkflowStatus::Active,
    };

    let approvals = request_type
        .approver_config
        .iter()
        .enumerate()
        .map(|(index, step)| {
            let first = index == 0;
            ApprovalRecord {
                id: ApprovalId(Uuid::new_v4().to_string()),
                request_id: request.id.clone(),
                approver_id: step.approver_id.clone(),
                step_order: (index + 1) as u32,
                status: if first {
                    ApprovalStatus::PendingApproval
                } else {
                    ApprovalStatus::Waiting
                },
                comments: None,
                action_date: None,
                notified_at: first.then_some(now),
            }
        })
        .collect();

    Ok(StartPlan { workflow, approvals, request_status: RequestStatus::PendingApproval })
}

/// Plan the effect of `acting_user` approving `approval`.
///
/// When no pending record remains for the request the workflow advances in
/// the same operation: either the next step is activated (the request stays
/// `PendingApproval`) or no step remains and workflow and request both
/// complete.
pub fn plan_approve(
    workflow: &WorkflowInstance,
    approvals: &[ApprovalRecord],
    approval: &ApprovalRecord,
    acting_user: &UserId,
    comments: Option<String>,
    now: DateTime<Utc>,
) -> Result<DecisionPlan, WorkflowError> {
    check_actionable(approval, acting_user)?;

    let mut updated = approval.clone();
    updated.status = ApprovalStatus::Approved;
    updated.action_date = Some(now);
    updated.comments = comments;

    let resolved: Vec<ApprovalRecord> = approvals
        .iter()
        .map(|record| if record.id == updated.id { updated.clone() } else { record.clone() })
        .collect();

    let still_pending = resolved.iter().any(ApprovalRecord::is_pending);
    if still_pending {
        return Ok(DecisionPlan {
            approval: updated,
            request_status: RequestStatus::PendingApproval,
            workflow: None,
            activated: None,
        });
    }

    match plan_advance(workflow, &resolved, now)? {
        AdvanceOutcome::NotActive => Ok(DecisionPlan {
            approval: updated,
            request_status: RequestStatus::Approved,
            workflow: None,
            activated: None,
        }),
        AdvanceOutcome::Advanced { workflow, activated } => Ok(DecisionPlan {
            approval: updated,
            request_status: RequestStatus::PendingApproval,
            workflow: Some(workflow),
            activated: Some(activated),
        }),
        AdvanceOutcome::Completed { workflow } => Ok(DecisionPlan {
            approval: updated,
            request_status: RequestStatus::Completed,
            workflow: Some(workflow),
            activated: None,
        }),
    }
}

/// Plan the effect of `acting_user` rejecting `approval`.
///
/// A single rejection anywhere short-circuits the whole workflow: the
/// request is rejected and the workflow terminated no matter how many steps
/// remain.
pub fn plan_reject(
    workflow: &WorkflowInstance,
    approval: &ApprovalRecord,
    acting_user: &UserId,
    comments: Option<String>,
    now: DateTime<Utc>,
) -> Result<DecisionPlan, WorkflowError> {
    check_actionable(approval, acting_user)?;

    let mut updated = approval.clone();
    updated.status = ApprovalStatus::Rejected;
    updated.action_date = Some(now);
    updated.comments = comments;

    let mut terminated = workflow.clone();
    terminated.status = WorkflowStatus::Terminated;

    Ok(DecisionPlan {
        approval: updated,
        request_status: RequestStatus::Rejected,
        workflow: Some(terminated),
        activated: None,
    })
}

/// Plan moving `workflow` past its current step.
///
/// A non-active workflow is left untouched. The record at the current step
/// must already be approved. This is the only place `current_step` moves,
/// and it only moves up.
pub fn plan_advance(
    workflow: &WorkflowInstance,
    approvals: &[ApprovalRecord],
    now: DateTime<Utc>,
) -> Result<AdvanceOutcome, WorkflowError> {
    if workflow.status != WorkflowStatus::Active {
        return Ok(AdvanceOutcome::NotActive);
    }

    let current = approvals.iter().find(|record| record.step_order == workflow.current_step);
    match current {
        Some(record) if record.status == ApprovalStatus::Approved => {}
        _ => {
            return Err(WorkflowError::CurrentStepNotCompleted {
                workflow_id: workflow.id.0.clone(),
                step: workflow.current_step,
            });
        }
    }

    let next_step = workflow.current_step + 1;
    let Some(next) = approvals.iter().find(|record| record.step_order == next_step) else {
        let mut completed = workflow.clone();
        completed.status = WorkflowStatus::Completed;
        completed.completed_at = Some(now);
        return Ok(AdvanceOutcome::Completed { workflow: completed });
    };

    let mut advanced = workflow.clone();
    advanced.current_step = next_step;

    let mut activated = next.clone();
    activated.status = ApprovalStatus::PendingApproval;
    activated.notified_at = Some(now);

    Ok(AdvanceOutcome::Advanced { workflow: advanced, activated })
}

fn check_actionable(approval: &ApprovalRecord, acting_user: &UserId) -> Result<(), WorkflowError> {
    if approval.approver_id != *acting_user {
        return Err(WorkflowError::NotAssignedApprover {
            approval_id: approval.id.0.clone(),
            user_id: acting_user.0.clone(),
        });
    }
    if approval.status != ApprovalStatus::PendingApproval {
        return Err(WorkflowError::ApprovalNotPending {
            approval_id: approval.id.0.clone(),
            status: approval.status,
        });
    }
    Ok(())
}
