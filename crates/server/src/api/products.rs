//! Ad product API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use adprovision_core::{AdProduct, ProductError, ProductId, ProductInput};

use super::handlers::{error_response, ErrorResponse, SuccessResponse};
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<AdProduct>,
    pub total: usize,
}

fn product_error(e: ProductError) -> (StatusCode, Json<ErrorResponse>) {
    match e {
        ProductError::NotFound(_) => error_response(StatusCode::NOT_FOUND, e),
        ProductError::Database(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/products
pub async fn list_products(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ProductListResponse>, impl IntoResponse> {
    match state.product_store().list() {
        Ok(products) => {
            let total = products.len();
            Ok(Json(ProductListResponse { products, total }))
        }
        Err(e) => Err(product_error(e)),
    }
}

/// POST /api/v1/products
///
/// Fields are sanitized, never rejected: bad prices become 0, unknown
/// payable events become empty and malformed sizes are dropped.
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<AdProduct>), impl IntoResponse> {
    match state.product_store().create(&input) {
        Ok(product) => Ok((StatusCode::CREATED, Json(product))),
        Err(e) => Err(product_error(e)),
    }
}

/// GET /api/v1/products/{id}
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ProductId>,
) -> Result<Json<AdProduct>, impl IntoResponse> {
    state.product_store().get(id).map(Json).map_err(product_error)
}

/// PUT /api/v1/products/{id}
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ProductId>,
    Json(input): Json<ProductInput>,
) -> Result<Json<AdProduct>, impl IntoResponse> {
    state
        .product_store()
        .update(id, &input)
        .map(Json)
        .map_err(product_error)
}

/// DELETE /api/v1/products/{id}
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ProductId>,
) -> Result<Json<SuccessResponse>, impl IntoResponse> {
    match state.product_store().delete(id) {
        Ok(()) => Ok(Json(SuccessResponse {
            message: format!("Deleted ad product {}", id),
        })),
        Err(e) => Err(product_error(e)),
    }
}
