//! Ad settings API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use adprovision_core::{SettingValue, SettingsError, SettingsSection};

use super::handlers::{error_response, ErrorResponse};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SectionListResponse {
    pub sections: Vec<SettingsSection>,
}

#[derive(Debug, Serialize)]
pub struct SectionResponse {
    pub section: String,
    pub values: Vec<SettingValue>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingRequest {
    pub value: Value,
}

fn settings_error(e: SettingsError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match e {
        SettingsError::Validation(_) => StatusCode::BAD_REQUEST,
        SettingsError::NotFound(_) => StatusCode::NOT_FOUND,
        SettingsError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, e)
}

/// GET /api/v1/settings
pub async fn list_sections(State(state): State<Arc<AppState>>) -> Json<SectionListResponse> {
    Json(SectionListResponse {
        sections: state.settings_store().sections(),
    })
}

/// GET /api/v1/settings/{section}
pub async fn get_section(
    State(state): State<Arc<AppState>>,
    Path(section): Path<String>,
) -> Result<Json<SectionResponse>, impl IntoResponse> {
    match state.settings_store().get_section(&section) {
        Ok(values) => Ok(Json(SectionResponse { section, values })),
        Err(e) => Err(settings_error(e)),
    }
}

/// PUT /api/v1/settings/{section}/{key}
pub async fn update_setting(
    State(state): State<Arc<AppState>>,
    Path((section, key)): Path<(String, String)>,
    Json(request): Json<UpdateSettingRequest>,
) -> Result<Json<SettingValue>, impl IntoResponse> {
    state
        .settings_store()
        .update(&section, &key, request.value)
        .map(Json)
        .map_err(settings_error)
}
