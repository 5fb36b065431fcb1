pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod notify;
pub mod workflow;

pub use domain::announcement::{Announcement, AnnouncementId};
pub use domain::document::{
    Document, DocumentId, DocumentSignature, SignatureId, SignatureProvider, SignatureStatus,
};
pub use domain::request::{Priority, Request, RequestId, RequestStatus};
pub use domain::request_type::{
    ApproverStep, FieldType, FormField, RequestType, RequestTypeId,
};
pub use domain::user::{Department, User, UserId, UserRole, UserStatus};
pub use domain::workflow::{
    pending_count, ApprovalId, ApprovalRecord, ApprovalStatus, WorkflowId, WorkflowInstance,
    WorkflowStatus,
};
pub use errors::{ApplicationError, DomainError, InterfaceError, InterfaceErrorKind};
pub use notify::{InMemoryNotifier, Notifier, NotifyError, WorkflowEvent};
pub use workflow::{
    plan_advance, plan_approve, plan_reject, plan_start, AdvanceOutcome, DecisionPlan, StartPlan,
    WorkflowError,
};
