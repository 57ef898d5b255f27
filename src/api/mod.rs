// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SneakyNote

use std::path::PathBuf;

use axum::{
    http::{header, HeaderValue},
    routing::{get, post},
    Json, Router,
};
use tower_http::services::ServeDir;
use tower_http::set_header::{SetResponseHeader, SetResponseHeaderLayer};
use utoipa::OpenApi;

use crate::state::AppState;

pub mod notes;
pub mod space;

pub fn router(state: AppState) -> Router {
    let note_routes = Router::new()
        .route(
            "/notes/{id}",
            post(notes::post_note).get(notes::get_note),
        )
        .route("/notes/{id}/status", get(notes::note_status))
        .route("/free_space", get(space::free_space))
        .route("/health", get(space::health))
        // Nothing under /notes may ever be cached by intermediaries.
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("private, max-age=0, no-cache, no-store"),
        ))
        .with_state(state);

    let assets = SetResponseHeader::overriding(
        ServeDir::new(public_path()),
        header::CACHE_CONTROL,
        HeaderValue::from_static("private, max-age=86400"),
    );

    Router::new()
        .merge(note_routes)
        .route("/api-doc/openapi.json", get(openapi_json))
        .fallback_service(assets)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Root directory for static files.
fn public_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("public")
}

#[derive(OpenApi)]
#[openapi(
    paths(
        notes::post_note,
        notes::get_note,
        notes::note_status,
        space::free_space,
        space::health
    ),
    components(schemas(space::HealthResponse)),
    tags(
        (name = "Notes", description = "One-time secret upload, retrieval, and status"),
        (name = "System", description = "Capacity and liveness probes")
    )
)]
struct ApiDoc;
