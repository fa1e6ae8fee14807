//! Bidder API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use adprovision_core::Bidder;

use super::handlers::error_response;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BidderListResponse {
    pub bidders: Vec<Bidder>,
    /// Keys for bidder selection in the order form.
    pub keys: Vec<String>,
}

/// GET /api/v1/bidders
pub async fn list_bidders(State(state): State<Arc<AppState>>) -> Json<BidderListResponse> {
    let registry = state.registry();
    Json(BidderListResponse {
        bidders: registry.iter().cloned().collect(),
        keys: registry.keys().map(str::to_string).collect(),
    })
}

/// GET /api/v1/bidders/{key}
pub async fn get_bidder(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<Bidder>, impl IntoResponse> {
    match state.registry().get(&key) {
        Some(bidder) => Ok(Json(bidder.clone())),
        None => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Bidder not found: {}", key),
        )),
    }
}
