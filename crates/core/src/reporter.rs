//! Human-readable progress and error reporting for the provisioning workflow.

use serde::{Deserialize, Serialize};

use crate::adapter::AdapterCall;
use crate::workflow::{FailureReport, WorkflowProgress, WorkflowSnapshot, WorkflowStep};

/// Severity of a notice shown next to the order form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Label for a step. The batch count is shown once it is known.
pub fn step_label(step: WorkflowStep, total_batches: Option<usize>) -> String {
    match step {
        WorkflowStep::Idle => "Ready".to_string(),
        WorkflowStep::CreatingOrder => "Creating order".to_string(),
        WorkflowStep::CreatingLineItems => "Creating line items".to_string(),
        WorkflowStep::AssociatingCreatives { batch_index } => match total_batches {
            Some(total) => format!(
                "Associating creatives (batch {} of {})",
                batch_index + 1,
                total
            ),
            None => format!("Associating creatives (batch {})", batch_index + 1),
        },
    }
}

/// Label for the action that failed. Batch failures keep their batch number.
pub fn failure_label(failure: &FailureReport, total_batches: Option<usize>) -> String {
    match failure.call {
        AdapterCall::CreateOrder => "Creating order".to_string(),
        AdapterCall::CreateLineItems => "Creating line items".to_string(),
        AdapterCall::CreateCreatives => step_label(failure.step, total_batches),
        AdapterCall::LicaConfig => "Fetching creative associations".to_string(),
        AdapterCall::Order => "Fetching order".to_string(),
        AdapterCall::Bidders => "Fetching bidders".to_string(),
        AdapterCall::Archive => "Archiving order".to_string(),
    }
}

/// `Step n of m: label`.
pub fn progress_label(progress: &WorkflowProgress) -> String {
    format!(
        "Step {} of {}: {}",
        progress.step_number,
        progress.total_steps,
        step_label(progress.step, progress.total_batches)
    )
}

/// Notices for the current workflow state.
///
/// `has_issues` is the result of the idle issue check and is ignored while
/// a run is in flight.
pub fn notices(snapshot: &WorkflowSnapshot, has_issues: bool) -> Vec<Notice> {
    let mut notices = Vec::new();

    if snapshot.in_flight {
        notices.push(Notice::new(
            NoticeLevel::Warning,
            "Provisioning is in progress. Each step may take up to 15 minutes, \
             do not close this page until it finishes.",
        ));
    }

    if let Some(failure) = &snapshot.last_failure {
        if failure.recoverable {
            let hint = if snapshot.attempt.is_last_attempt() {
                "You can edit the order and try once more. If it fails again the order will be archived."
            } else {
                "You can edit the order and try again."
            };
            notices.push(Notice::new(
                NoticeLevel::Error,
                format!(
                    "{} failed: {}. {}",
                    failure_label(failure, snapshot.total_batches),
                    failure.message,
                    hint
                ),
            ));
        } else {
            let order = failure
                .order_id
                .map(|id| format!("Order {}", id))
                .unwrap_or_else(|| "The order".to_string());
            notices.push(Notice::new(
                NoticeLevel::Error,
                format!(
                    "{} could not be completed and was archived: {}. The form has been reset to create a new order.",
                    order, failure.message
                ),
            ));
        }
    }

    if snapshot.in_flight {
        return notices;
    }

    if let Some(order) = &snapshot.order {
        if has_issues {
            let missing = match snapshot.total_batches {
                Some(total) if !order.line_item_ids.is_empty() => format!(
                    "{} of {} creative batches were created",
                    order.lica_batch_count, total
                ),
                _ => "its line items were not created".to_string(),
            };
            notices.push(Notice::new(
                NoticeLevel::Warning,
                format!(
                    "Order {} is incomplete: {}. Run the workflow again to finish it.",
                    order.order_id, missing
                ),
            ));
        } else if snapshot.last_failure.is_none() && snapshot.total_batches.is_some() {
            notices.push(Notice::new(
                NoticeLevel::Info,
                format!("Order {} is fully provisioned.", order.order_id),
            ));
        }
    }

    notices
}
