//! Order provisioning workflow.
//!
//! Drives the remote ad server through the steps needed to set up a
//! header-bidding order in GAM:
//! - **Order**: created once, its id adopted immediately
//! - **Line items**: created once the order exists
//! - **Creative associations**: created in batches, resuming from the last
//!   completed batch
//!
//! Failures are surfaced to the caller and retried only by explicit user
//! action. See [`AttemptState`] for the escalation rule.

mod config;
mod runner;
mod types;

pub use config::WorkflowConfig;
pub use runner::{CompletionCallback, OrderWorkflow, UnrecoverableCallback};
pub use types::{
    AttemptState, FailureReport, WorkflowError, WorkflowProgress, WorkflowSnapshot, WorkflowStep,
    FIXED_STEPS,
};
