pub mod connection;
pub mod engine;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, ping, DbPool};
pub use engine::{EngineError, PendingApprovalView, WorkflowEngine, WorkflowProgress};
pub use fixtures::{seed_demo_data, SeedSummary};
