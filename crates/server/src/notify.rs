//! Email notifications for workflow milestones.
//!
//! The notifier renders tera templates and hands finished messages to a
//! `MailTransport`. Actual SMTP delivery belongs to the deployment; the
//! bundled transport logs the message and reports itself as no-op, the same
//! way the server runs without a configured mail host.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::Row;
use tera::Tera;
use tracing::{info, warn};

use deskhub_core::domain::request::Request;
use deskhub_core::domain::user::UserId;
use deskhub_core::domain::workflow::ApprovalRecord;
use deskhub_core::notify::{Notifier, NotifyError, WorkflowEvent};
use deskhub_core::RequestStatus;
use deskhub_db::DbPool;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, email: &RenderedEmail) -> Result<(), NotifyError>;

    fn is_noop(&self) -> bool {
        false
    }
}

/// Logs rendered messages instead of sending them.
#[derive(Clone, Debug, Default)]
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn deliver(&self, email: &RenderedEmail) -> Result<(), NotifyError> {
        info!(
            event_name = "notify.email_logged",
            to = %email.to,
            subject = %email.subject,
            "email notification rendered (log transport)"
        );
        Ok(())
    }

    fn is_noop(&self) -> bool {
        true
    }
}

/// Collects rendered messages for assertions.
#[derive(Clone, Default)]
pub struct InMemoryTransport {
    sent: Arc<Mutex<Vec<RenderedEmail>>>,
}

impl InMemoryTransport {
    pub fn sent(&self) -> Vec<RenderedEmail> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl MailTransport for InMemoryTransport {
    async fn deliver(&self, email: &RenderedEmail) -> Result<(), NotifyError> {
        match self.sent.lock() {
            Ok(mut sent) => sent.push(email.clone()),
            Err(poisoned) => poisoned.into_inner().push(email.clone()),
        }
        Ok(())
    }
}

// Templates present on disk win; the embedded copies fill in whatever the
// deployment does not override.
fn init_templates() -> Arc<Tera> {
    let mut tera = match Tera::new("templates/email/**/*") {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "failed to load email templates from filesystem, starting empty");
            Tera::default()
        }
    };

    let mut embedded = Tera::default();
    if let Err(e) = embedded.add_raw_templates(vec![
        (
            "approval_requested.html",
            include_str!("../../../templates/email/approval_requested.html"),
        ),
        (
            "request_decided.html",
            include_str!("../../../templates/email/request_decided.html"),
        ),
    ]) {
        warn!(error = %e, "embedded email templates failed to parse");
    }
    if let Err(e) = tera.extend(&embedded) {
        warn!(error = %e, "embedded email templates could not be registered");
    }

    Arc::new(tera)
}

pub struct EmailNotifier {
    pool: DbPool,
    templates: Arc<Tera>,
    transport: Arc<dyn MailTransport>,
    max_retries: u32,
}

impl EmailNotifier {
    pub fn new(pool: DbPool, transport: Arc<dyn MailTransport>, max_retries: u32) -> Self {
        Self { pool, templates: init_templates(), transport, max_retries }
    }

    pub fn transport_is_noop(&self) -> bool {
        self.transport.is_noop()
    }

    async fn lookup_user(&self, id: &UserId) -> Result<Option<(String, String)>, NotifyError> {
        let row = sqlx::query("SELECT email, full_name FROM user_account WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| NotifyError::Transport(error.to_string()))?;

        match row {
            Some(row) => {
                let email: String = row
                    .try_get("email")
                    .map_err(|error| NotifyError::Transport(error.to_string()))?;
                let full_name: String = row
                    .try_get("full_name")
                    .map_err(|error| NotifyError::Transport(error.to_string()))?;
                Ok(Some((email, full_name)))
            }
            None => Ok(None),
        }
    }

    async fn deliver_with_retry(&self, email: RenderedEmail) -> Result<(), NotifyError> {
        let mut last_error = None;
        for _attempt in 0..=self.max_retries {
            match self.transport.deliver(&email).await {
                Ok(()) => return Ok(()),
                Err(error) => last_error = Some(error),
            }
        }
        Err(last_error.unwrap_or_else(|| NotifyError::Transport("delivery failed".to_string())))
    }

    fn render(&self, template: &str, context: &tera::Context) -> Result<String, NotifyError> {
        self.templates
            .render(template, context)
            .map_err(|error| NotifyError::Template(error.to_string()))
    }

    async fn notify_approver(
        &self,
        request: &Request,
        activated: &ApprovalRecord,
    ) -> Result<(), NotifyError> {
        let Some((approver_email, approver_name)) =
            self.lookup_user(&activated.approver_id).await?
        else {
            warn!(
                event_name = "notify.unknown_recipient",
                user_id = %activated.approver_id.0,
                "skipping approval notification for unknown approver"
            );
            return Ok(());
        };
        let requester_name = self
            .lookup_user(&request.created_by)
            .await?
            .map(|(_, name)| name)
            .unwrap_or_else(|| request.created_by.0.clone());

        let mut context = tera::Context::new();
        context.insert("approver_name", &approver_name);
        context.insert("requester_name", &requester_name);
        context.insert("request_title", &request.title);
        context.insert("step", &activated.step_order);
        context.insert("due_date", &request.due_date.map(|dt| dt.to_rfc3339()));

        let body = self.render("approval_requested.html", &context)?;
        self.deliver_with_retry(RenderedEmail {
            to: approver_email,
            subject: format!("Approval needed: {}", request.title),
            body,
        })
        .await
    }

    async fn notify_requester(
        &self,
        request: &Request,
        approval: &ApprovalRecord,
        decision: &str,
    ) -> Result<(), NotifyError> {
        let Some((requester_email, requester_name)) =
            self.lookup_user(&request.created_by).await?
        else {
            warn!(
                event_name = "notify.unknown_recipient",
                user_id = %request.created_by.0,
                "skipping decision notification for unknown requester"
            );
            return Ok(());
        };

        let completed = request.status == RequestStatus::Completed;
        let mut context = tera::Context::new();
        context.insert("requester_name", &requester_name);
        context.insert("request_title", &request.title);
        context.insert("step", &approval.step_order);
        context.insert("decision", decision);
        context.insert("comments", &approval.comments);
        context.insert("completed", &completed);

        let body = self.render("request_decided.html", &context)?;
        self.deliver_with_retry(RenderedEmail {
            to: requester_email,
            subject: format!("Request {decision}: {}", request.title),
            body,
        })
        .await
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, event: &WorkflowEvent) -> Result<(), NotifyError> {
        match event {
            WorkflowEvent::Started { request, activated } => {
                self.notify_approver(request, activated).await
            }
            WorkflowEvent::StepApproved { request, approval, activated } => {
                self.notify_requester(request, approval, "approved").await?;
                if let Some(activated) = activated {
                    self.notify_approver(request, activated).await?;
                }
                Ok(())
            }
            WorkflowEvent::StepRejected { request, approval } => {
                self.notify_requester(request, approval, "rejected").await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;

    use deskhub_core::domain::request::{Priority, Request, RequestId, RequestStatus};
    use deskhub_core::domain::request_type::RequestTypeId;
    use deskhub_core::domain::user::UserId;
    use deskhub_core::domain::workflow::{ApprovalId, ApprovalRecord, ApprovalStatus};
    use deskhub_core::notify::{Notifier, NotifyError, WorkflowEvent};
    use deskhub_db::{connect_with_settings, fixtures, migrations};

    use super::{EmailNotifier, InMemoryTransport, MailTransport, RenderedEmail};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        fixtures::seed_demo_data(&pool).await.expect("seed");
        pool
    }

    fn request(status: RequestStatus) -> Request {
        let now = Utc::now();
        Request {
            id: RequestId("req-1".to_string()),
            request_type_id: RequestTypeId(fixtures::IT_EQUIPMENT_TYPE_ID.to_string()),
            title: "New laptop".to_string(),
            description: None,
            status,
            priority: Priority::Normal,
            created_by: UserId(fixtures::EMPLOYEE_USER_ID.to_string()),
            created_at: now,
            updated_at: now,
            due_date: None,
            data: json!({}),
        }
    }

    fn approval(step_order: u32, approver: &str, status: ApprovalStatus) -> ApprovalRecord {
        ApprovalRecord {
            id: ApprovalId(format!("apv-{step_order}")),
            request_id: RequestId("req-1".to_string()),
            approver_id: UserId(approver.to_string()),
            step_order,
            status,
            comments: Some("within budget".to_string()),
            action_date: Some(Utc::now()),
            notified_at: Some(Utc::now()),
        }
    }

    #[tokio::test]
    async fn started_event_mails_the_first_approver() {
        let pool = setup().await;
        let transport = InMemoryTransport::default();
        let notifier = EmailNotifier::new(pool, Arc::new(transport.clone()), 0);

        notifier
            .notify(&WorkflowEvent::Started {
                request: request(RequestStatus::PendingApproval),
                activated: approval(1, fixtures::MANAGER_USER_ID, ApprovalStatus::PendingApproval),
            })
            .await
            .expect("notify");

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "mpatel@example.com");
        assert_eq!(sent[0].subject, "Approval needed: New laptop");
        assert!(sent[0].body.contains("Mira Patel"));
        assert!(sent[0].body.contains("Jordan Doe"));
    }

    #[tokio::test]
    async fn intermediate_approval_mails_requester_and_next_approver() {
        let pool = setup().await;
        let transport = InMemoryTransport::default();
        let notifier = EmailNotifier::new(pool, Arc::new(transport.clone()), 0);

        notifier
            .notify(&WorkflowEvent::StepApproved {
                request: request(RequestStatus::PendingApproval),
                approval: approval(1, fixtures::MANAGER_USER_ID, ApprovalStatus::Approved),
                activated: Some(approval(
                    2,
                    fixtures::IT_LEAD_USER_ID,
                    ApprovalStatus::PendingApproval,
                )),
            })
            .await
            .expect("notify");

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "jdoe@example.com");
        assert!(sent[0].body.contains("approved"));
        assert!(sent[0].body.contains("within budget"));
        assert_eq!(sent[1].to, "rchen@example.com");
    }

    #[tokio::test]
    async fn rejection_mails_only_the_requester() {
        let pool = setup().await;
        let transport = InMemoryTransport::default();
        let notifier = EmailNotifier::new(pool, Arc::new(transport.clone()), 0);

        notifier
            .notify(&WorkflowEvent::StepRejected {
                request: request(RequestStatus::Rejected),
                approval: approval(1, fixtures::MANAGER_USER_ID, ApprovalStatus::Rejected),
            })
            .await
            .expect("notify");

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Request rejected: New laptop");
        assert!(sent[0].body.contains("rejected"));
    }

    #[tokio::test]
    async fn unknown_recipient_is_skipped_without_error() {
        let pool = setup().await;
        let transport = InMemoryTransport::default();
        let notifier = EmailNotifier::new(pool, Arc::new(transport.clone()), 0);

        notifier
            .notify(&WorkflowEvent::Started {
                request: request(RequestStatus::PendingApproval),
                activated: approval(1, "u-ghost", ApprovalStatus::PendingApproval),
            })
            .await
            .expect("unknown recipient should not error");

        assert!(transport.sent().is_empty());
    }

    #[derive(Clone, Default)]
    struct FlakyTransport {
        failures_remaining: Arc<Mutex<u32>>,
        delivered: Arc<Mutex<Vec<RenderedEmail>>>,
    }

    impl FlakyTransport {
        fn failing(times: u32) -> Self {
            Self {
                failures_remaining: Arc::new(Mutex::new(times)),
                delivered: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn delivered_count(&self) -> usize {
            self.delivered.lock().map(|sent| sent.len()).unwrap_or(0)
        }
    }

    #[async_trait]
    impl MailTransport for FlakyTransport {
        async fn deliver(&self, email: &RenderedEmail) -> Result<(), NotifyError> {
            let mut remaining =
                self.failures_remaining.lock().map_err(|_| {
                    NotifyError::Transport("failure counter poisoned".to_string())
                })?;
            if *remaining > 0 {
                *remaining -= 1;
                return Err(NotifyError::Transport("temporary smtp failure".to_string()));
            }
            drop(remaining);
            self.delivered
                .lock()
                .map_err(|_| NotifyError::Transport("delivery log poisoned".to_string()))?
                .push(email.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn delivery_retries_up_to_the_configured_limit() {
        let pool = setup().await;
        let transport = FlakyTransport::failing(2);
        let notifier = EmailNotifier::new(pool.clone(), Arc::new(transport.clone()), 2);

        notifier
            .notify(&WorkflowEvent::Started {
                request: request(RequestStatus::PendingApproval),
                activated: approval(1, fixtures::MANAGER_USER_ID, ApprovalStatus::PendingApproval),
            })
            .await
            .expect("third attempt should succeed");
        assert_eq!(transport.delivered_count(), 1);

        let exhausted = FlakyTransport::failing(2);
        let notifier = EmailNotifier::new(pool, Arc::new(exhausted.clone()), 0);
        let error = notifier
            .notify(&WorkflowEvent::Started {
                request: request(RequestStatus::PendingApproval),
                activated: approval(1, fixtures::MANAGER_USER_ID, ApprovalStatus::PendingApproval),
            })
            .await
            .expect_err("no retries left");
        assert!(matches!(error, NotifyError::Transport(_)));
        assert_eq!(exhausted.delivered_count(), 0);
    }
}
