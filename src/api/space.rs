// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SneakyNote

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Report available substrate space, in megabytes.
#[utoipa::path(
    get,
    path = "/free_space",
    tag = "System",
    responses(
        (status = 200, description = "Available space as `\"%.3f MB\\n\"` text", body = String)
    )
)]
pub async fn free_space(State(state): State<AppState>) -> String {
    state.metrics.record_request();
    let available = state.store.available_memory();
    format!("{:.3} MB\n", available as f64 / 1024.0 / 1024.0)
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
