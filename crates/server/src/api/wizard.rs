//! Order provisioning wizard API handlers.
//!
//! All handlers answer 503 when no remote ad server is configured.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use adprovision_core::reporter::{notices, progress_label, step_label, Notice};
use adprovision_core::{
    OrderConfig, OrderId, OrderState, WorkflowError, WorkflowProgress, WorkflowSnapshot,
};

use super::handlers::{error_response, ErrorResponse};
use crate::state::AppState;
use crate::wizard::WizardSession;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct WizardResponse {
    #[serde(flatten)]
    pub snapshot: WorkflowSnapshot,
    pub step_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<WorkflowProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_label: Option<String>,
    pub has_issues: bool,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Deserialize)]
pub struct OrderConfigRequest {
    pub name: String,
    #[serde(default)]
    pub revenue_share: u8,
    #[serde(default)]
    pub bidders: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub order: OrderState,
    pub wizard: WizardResponse,
}

#[derive(Debug, Serialize)]
pub struct IssuesResponse {
    pub order_id: Option<OrderId>,
    pub has_issues: bool,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn session(state: &AppState) -> Result<&Arc<WizardSession>, ApiError> {
    state.wizard().ok_or_else(|| {
        error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Order provisioning is not configured (missing [adapter] section)",
        )
    })
}

fn workflow_error(e: WorkflowError) -> ApiError {
    let status = match e {
        WorkflowError::InFlight => StatusCode::CONFLICT,
        WorkflowError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
        WorkflowError::Remote { .. } | WorkflowError::Unrecoverable { .. } => {
            StatusCode::BAD_GATEWAY
        }
    };
    error_response(status, e)
}

/// Issue state derivable without a remote call.
fn local_has_issues(snapshot: &WorkflowSnapshot) -> bool {
    if snapshot.in_flight {
        return false;
    }
    match (&snapshot.order, snapshot.total_batches) {
        (Some(order), Some(total)) => order.has_issues(total),
        (Some(order), None) => order.line_item_ids.is_empty(),
        (None, _) => false,
    }
}

async fn describe(wizard: &WizardSession) -> WizardResponse {
    let snapshot = wizard.current().await.snapshot().await;
    let progress = if snapshot.in_flight {
        wizard.last_progress().await
    } else {
        None
    };
    let has_issues = local_has_issues(&snapshot);

    WizardResponse {
        step_label: step_label(snapshot.step, snapshot.total_batches),
        progress_label: progress.as_ref().map(progress_label),
        notices: notices(&snapshot, has_issues),
        has_issues,
        progress,
        snapshot,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/wizard
pub async fn get_wizard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<WizardResponse>, ApiError> {
    let wizard = session(&state)?;
    Ok(Json(describe(wizard).await))
}

/// PUT /api/v1/wizard/config
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OrderConfigRequest>,
) -> Result<Json<WizardResponse>, ApiError> {
    let wizard = session(&state)?;
    let config = OrderConfig::new(request.name, request.revenue_share, request.bidders)
        .map_err(|e| workflow_error(e.into()))?;
    wizard.set_config(config).await.map_err(workflow_error)?;
    Ok(Json(describe(wizard).await))
}

/// POST /api/v1/wizard/run
///
/// Runs the workflow to completion and answers when it ends. Steps may take
/// several minutes each.
pub async fn run_wizard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RunResponse>, ApiError> {
    let wizard = session(&state)?;
    let order = wizard.run().await.map_err(workflow_error)?;
    Ok(Json(RunResponse {
        order,
        wizard: describe(wizard).await,
    }))
}

/// POST /api/v1/wizard/resume/{order_id}
pub async fn resume_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<WizardResponse>, ApiError> {
    let wizard = session(&state)?;
    match wizard.resume(order_id).await {
        Ok(_) => Ok(Json(describe(wizard).await)),
        Err(WorkflowError::Remote { source, .. })
            if matches!(source, adprovision_core::AdapterError::NotFound(_)) =>
        {
            Err(error_response(
                StatusCode::NOT_FOUND,
                format!("Order not found: {}", order_id),
            ))
        }
        Err(e) => Err(workflow_error(e)),
    }
}

/// POST /api/v1/wizard/reset
pub async fn reset_wizard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<WizardResponse>, ApiError> {
    let wizard = session(&state)?;
    wizard.reset().await.map_err(workflow_error)?;
    Ok(Json(describe(wizard).await))
}

/// GET /api/v1/wizard/issues
///
/// Fetches the association config to check the order against the server.
pub async fn check_issues(
    State(state): State<Arc<AppState>>,
) -> Result<Json<IssuesResponse>, ApiError> {
    let wizard = session(&state)?;
    let has_issues = wizard.check_issues().await.map_err(workflow_error)?;
    let order_id = wizard.current().await.order_config().await.order_id;
    Ok(Json(IssuesResponse {
        order_id,
        has_issues,
    }))
}
