use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::request::Request;
use crate::domain::workflow::ApprovalRecord;

/// Workflow milestones the surrounding application reports to approvers and
/// requesters. Delivery is an external concern: a failed notification never
/// fails or rolls back the engine operation that produced it.
#[derive(Clone, Debug, PartialEq)]
pub enum WorkflowEvent {
    Started { request: Request, activated: ApprovalRecord },
    StepApproved { request: Request, approval: ApprovalRecord, activated: Option<ApprovalRecord> },
    StepRejected { request: Request, approval: ApprovalRecord },
}

impl WorkflowEvent {
    pub fn request(&self) -> &Request {
        match self {
            Self::Started { request, .. }
            | Self::StepApproved { request, .. }
            | Self::StepRejected { request, .. } => request,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Started { .. } => "workflow.started",
            Self::StepApproved { .. } => "workflow.step_approved",
            Self::StepRejected { .. } => "workflow.step_rejected",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification template failure: {0}")]
    Template(String),
    #[error("notification transport failure: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &WorkflowEvent) -> Result<(), NotifyError>;
}

#[derive(Clone, Default)]
pub struct InMemoryNotifier {
    events: Arc<Mutex<Vec<WorkflowEvent>>>,
}

impl InMemoryNotifier {
    pub fn events(&self) -> Vec<WorkflowEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify(&self, event: &WorkflowEvent) -> Result<(), NotifyError> {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use crate::domain::request::{Priority, Request, RequestId, RequestStatus};
    use crate::domain::request_type::RequestTypeId;
    use crate::domain::user::UserId;
    use crate::domain::workflow::{ApprovalId, ApprovalRecord, ApprovalStatus};

    use super::{InMemoryNotifier, Notifier, WorkflowEvent};

    fn fixture() -> (Request, ApprovalRecord) {
        let now = Utc::now();
        let request = Request {
            id: RequestId("req-1".to_string()),
            request_type_id: RequestTypeId("rt-1".to_string()),
            title: "Vacation".to_string(),
            description: None,
            status: RequestStatus::PendingApproval,
            priority: Priority::Normal,
            created_by: UserId("u-emp".to_string()),
            created_at: now,
            updated_at: now,
            due_date: None,
            data: json!({}),
        };
        let approval = ApprovalRecord {
            id: ApprovalId("apv-1".to_string()),
            request_id: request.id.clone(),
            approver_id: UserId("u-manager".to_string()),
            step_order: 1,
            status: ApprovalStatus::PendingApproval,
            comments: None,
            action_date: None,
            notified_at: Some(now),
        };
        (request, approval)
    }

    #[tokio::test]
    async fn in_memory_notifier_records_events_in_order() {
        let notifier = InMemoryNotifier::default();
        let (request, approval) = fixture();

        notifier
            .notify(&WorkflowEvent::Started {
                request: request.clone(),
                activated: approval.clone(),
            })
            .await
            .expect("notify started");
        notifier
            .notify(&WorkflowEvent::StepRejected { request, approval })
            .await
            .expect("notify rejected");

        let events = notifier.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type(), "workflow.started");
        assert_eq!(events[1].event_type(), "workflow.step_rejected");
        assert_eq!(events[1].request().id.0, "req-1");
    }
}
