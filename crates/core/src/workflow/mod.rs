pub mod engine;

pub use engine::{
    plan_advance, plan_approve, plan_reject, plan_start, AdvanceOutcome, DecisionPlan, StartPlan,
    WorkflowError,
};
