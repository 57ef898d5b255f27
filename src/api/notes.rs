// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SneakyNote

//! Note upload, retrieval, and status handlers.
//!
//! The store owns all durable state; these handlers validate the path id,
//! adapt request/response bodies to the store's buffer discipline, and map
//! store outcomes onto the HTTP contract. Payload bytes only ever pass
//! through zeroizing buffers on the way in and out.

use std::io;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use tokio::time::Instant;
use tokio_util::io::StreamReader;
use zeroize::Zeroizing;

use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{naming, SecretStatus, StoreError};

/// Header carrying the sharing code on note responses and status requests.
pub const NOTE_CODE_HEADER: &str = "x-note-code";

/// Header opting a status request into long polling.
pub const LONG_POLL_HEADER: &str = "x-long-poll";

/// Re-probe interval while a long-polled status stays pending.
const STATUS_POLL_TICK: Duration = Duration::from_millis(300);

/// Total budget of a long-polled status request.
const LONG_POLL_BUDGET: Duration = Duration::from_secs(8);

/// Save a secret under a client-chosen UUID.
#[utoipa::path(
    post,
    path = "/notes/{id}",
    tag = "Notes",
    params(("id" = String, Path, description = "Client-chosen UUID for the note")),
    responses(
        (status = 201, description = "Secret stored; sharing code in X-Note-Code"),
        (status = 403, description = "UUID has prior state; any pending secret was destroyed"),
        (status = 404, description = "Malformed UUID"),
        (status = 413, description = "Payload exceeds the maximum secret size"),
        (status = 507, description = "Substrate cannot accept the payload"),
    )
)]
pub async fn post_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    state.metrics.record_request();

    if !naming::is_valid_note_id(&id) {
        return ApiError::not_found().into_response();
    }

    // Reject declared-oversize payloads before reading a byte of body.
    if let Some(length) = content_length(&headers) {
        if length > state.store.max_secret_size() as u64 {
            state.metrics.record_too_large();
            return ApiError::secret_too_large().into_response();
        }
    }

    let mut reader = StreamReader::new(body.into_data_stream().map_err(io::Error::other));

    match state.store.save(&mut reader, &id).await {
        Ok(code) => {
            state.metrics.record_created();
            (StatusCode::CREATED, [(NOTE_CODE_HEADER, code)]).into_response()
        }
        Err(StoreError::SecretTooLarge) => {
            state.metrics.record_too_large();
            ApiError::secret_too_large().into_response()
        }
        Err(StoreError::DuplicateId) => {
            state.metrics.record_duplicate_id();
            ApiError::duplicate_id().into_response()
        }
        Err(StoreError::StorageFull) => {
            state.metrics.record_storage_full();
            ApiError::storage_full().into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to save note");
            ApiError::internal().into_response()
        }
    }
}

/// Retrieve a secret, consuming it.
#[utoipa::path(
    get,
    path = "/notes/{id}",
    tag = "Notes",
    params(("id" = String, Path, description = "UUID the note was saved under")),
    responses(
        (status = 200, description = "The payload; sharing code in X-Note-Code"),
        (status = 403, description = "Secret was already accessed"),
        (status = 404, description = "No state for this UUID"),
        (status = 410, description = "Secret expired unread"),
    )
)]
pub async fn get_note(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    state.metrics.record_request();

    if !naming::is_valid_note_id(&id) {
        return ApiError::not_found().into_response();
    }

    let mut buf = Zeroizing::new(vec![0u8; state.store.max_secret_size()]);

    match state.store.retrieve(&id, &mut buf) {
        Ok((n_read, code)) => {
            state.metrics.record_opened();
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE.as_str(), "application/octet-stream".to_string()),
                    (NOTE_CODE_HEADER, code),
                ],
                buf[..n_read].to_vec(),
            )
                .into_response()
        }
        Err(StoreError::SecretAlreadyAccessed) => {
            state.metrics.record_already_opened();
            ApiError::already_accessed().into_response()
        }
        Err(StoreError::SecretExpired) => {
            state.metrics.record_expired();
            ApiError::expired().into_response()
        }
        Err(StoreError::SecretNotFound) => {
            state.metrics.record_not_found();
            ApiError::not_found().into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to retrieve note");
            ApiError::internal().into_response()
        }
    }
}

/// Report a note's lifecycle position to a sender holding its code.
///
/// With `X-Long-Poll: true` the handler re-probes a pending note every
/// 300 ms for up to 8 s, so senders learn of a read without hammering the
/// endpoint.
#[utoipa::path(
    get,
    path = "/notes/{id}/status",
    tag = "Notes",
    params(("id" = String, Path, description = "UUID the note was saved under")),
    responses(
        (status = 200, description = "Pending: saved and not yet read"),
        (status = 403, description = "Already accessed"),
        (status = 404, description = "Unknown UUID or non-matching code"),
        (status = 410, description = "Expired unread"),
    )
)]
pub async fn note_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.metrics.record_request();
    state.metrics.record_status_request();

    if !naming::is_valid_note_id(&id) {
        return ApiError::not_found().into_response();
    }

    let given_code = headers
        .get(NOTE_CODE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let long_poll = headers
        .get(LONG_POLL_HEADER)
        .map(|v| v == "true")
        .unwrap_or(false);

    let deadline = Instant::now()
        + if long_poll {
            LONG_POLL_BUDGET
        } else {
            Duration::ZERO
        };

    loop {
        match state.store.status(&id, &given_code).await {
            SecretStatus::AlreadyAccessed => {
                return ApiError::already_accessed().into_response();
            }
            SecretStatus::Expired => return ApiError::expired().into_response(),
            SecretStatus::NotFound => return ApiError::not_found().into_response(),
            SecretStatus::Pending => {
                if Instant::now() >= deadline {
                    return StatusCode::OK.into_response();
                }
                tokio::time::sleep(STATUS_POLL_TICK).await;
            }
        }
    }
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}
