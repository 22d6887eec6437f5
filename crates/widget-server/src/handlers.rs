//! HTTP Handlers

use axum::{extract::State, Json};
use serde::Serialize;

use widget_core::WidgetConfig;

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub direct_charge_test: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        direct_charge_test: state.config.direct_charge_test,
    })
}

/// Widget settings for the browser bundle
pub async fn widget_config(State(state): State<AppState>) -> Json<WidgetConfig> {
    Json(WidgetConfig::clone(&state.config))
}
