//! Types for the order provisioning workflow.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapter::{
    AdapterCall, AdapterError, OrderConfig, OrderConfigError, OrderId, OrderState,
};

/// Steps that exist for every order: create order, create line items, fetch
/// the association config. Each creative batch adds one more, numbered after
/// the fetch.
pub const FIXED_STEPS: usize = 3;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum WorkflowStep {
    #[default]
    Idle,
    CreatingOrder,
    CreatingLineItems,
    /// Creating the associations of batch `batch_index` (0-based).
    AssociatingCreatives { batch_index: usize },
}

impl WorkflowStep {
    /// 1-based position of the step for progress display (0 when idle).
    pub fn number(&self) -> usize {
        match self {
            Self::Idle => 0,
            Self::CreatingOrder => 1,
            Self::CreatingLineItems => 2,
            Self::AssociatingCreatives { batch_index } => FIXED_STEPS + batch_index + 1,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Retry escalation state.
///
/// A failed fresh run stays retryable. Once an order exists on the server a
/// failure leaves exactly one more attempt; failing that attempt (or any
/// attempt on an externally supplied order) exhausts the workflow, which then
/// archives the order and starts over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    #[default]
    FreshAttempt,
    RetryPending,
    Exhausted,
}

impl AttemptState {
    /// State after a failed run.
    ///
    /// `resuming_existing` is set when the order id was supplied from outside
    /// the workflow; `order_obtained` when an order id was known at the time
    /// of the failure.
    pub fn on_failure(self, resuming_existing: bool, order_obtained: bool) -> Self {
        if resuming_existing {
            return Self::Exhausted;
        }
        match self {
            Self::RetryPending | Self::Exhausted => Self::Exhausted,
            Self::FreshAttempt if order_obtained => Self::RetryPending,
            Self::FreshAttempt => Self::FreshAttempt,
        }
    }

    /// State after a successful run.
    pub fn on_success(self) -> Self {
        Self::FreshAttempt
    }

    /// Whether the next failure will be unrecoverable.
    pub fn is_last_attempt(&self) -> bool {
        matches!(self, Self::RetryPending)
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

/// Progress update published while a run advances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowProgress {
    pub step: WorkflowStep,
    pub step_number: usize,
    /// `3 + total_batches` once the batch count is known, 3 before that.
    pub total_steps: usize,
    pub total_batches: Option<usize>,
    pub order_id: Option<OrderId>,
}

/// The most recent failure, kept for error reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub message: String,
    pub recoverable: bool,
    /// Step that was running when the failure happened.
    pub step: WorkflowStep,
    /// Remote call that failed.
    pub call: AdapterCall,
    /// Order affected by the failure (the archived one if unrecoverable).
    pub order_id: Option<OrderId>,
}

/// Point-in-time view of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub step: WorkflowStep,
    pub step_number: usize,
    pub total_steps: usize,
    pub total_batches: Option<usize>,
    pub attempt: AttemptState,
    pub in_flight: bool,
    pub resuming_existing: bool,
    pub config: OrderConfig,
    pub order: Option<OrderState>,
    pub last_failure: Option<FailureReport>,
}

/// Errors returned by a workflow run.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Another run is already in progress.
    #[error("a provisioning run is already in progress")]
    InFlight,

    /// The order configuration is invalid; nothing was sent.
    #[error("invalid order configuration: {0}")]
    InvalidConfig(#[from] OrderConfigError),

    /// A remote call failed; the run can be retried.
    #[error("{} failed: {source}", .call.as_str())]
    Remote {
        step: WorkflowStep,
        call: AdapterCall,
        #[source]
        source: AdapterError,
    },

    /// A remote call failed and the order was given up.
    #[error("order {} could not be completed: {source}", display_order_id(.order_id))]
    Unrecoverable {
        order_id: Option<OrderId>,
        #[source]
        source: AdapterError,
    },
}

fn display_order_id(order_id: &Option<OrderId>) -> String {
    order_id.map_or_else(|| "(none)".to_string(), |id| id.to_string())
}

impl WorkflowError {
    /// Whether the user can retry with the same workflow state.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Unrecoverable { .. })
    }

    /// The remote error behind this failure, if any.
    pub fn remote_error(&self) -> Option<&AdapterError> {
        match self {
            Self::Remote { source, .. } | Self::Unrecoverable { source, .. } => Some(source),
            _ => None,
        }
    }
}
