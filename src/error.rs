// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SneakyNote

//! # API Error Handling
//!
//! This module provides the error type returned by all API handlers.
//! Errors convert directly into HTTP responses.
//!
//! ## Response bodies
//!
//! The save family (`POST /notes/{uuid}`) returns JSON bodies that existing
//! clients parse byte-for-byte, so they are kept as pinned literals rather
//! than serialized structs. The retrieve/status family returns empty bodies
//! only; in particular, "uuid unknown" and "bad code" are both a bare 404,
//! so the endpoint leaks nothing to callers without the code.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::store::DEFAULT_MAX_SECRET_SIZE;

const DUPLICATE_ID_BODY: &str = "{\n  \"error_type\": \"duplicate_id\",\n  \"error_message\": \"A secret with that ID has already been created. If you are not an attacker trying to replace the secret, this indicates a bug in your program and a potentially insecure source of randomness. As a precaution/penalty, the secret has been destroyed (if it has not already expired or been accessed).\"\n}\n";

const STORAGE_FULL_BODY: &str = "{\n  \"error_type\": \"storage_full\",\n  \"error_message\": \"Sorry, server secret storage is full right now. Try again later.\"\n}\n";

fn secret_too_large_body(max_secret_size: usize) -> String {
    format!(
        "{{\n  \"error_type\": \"secret_too_large\",\n  \"error_message\": \"Secret too large. Maximum allowed secret size is {max_secret_size} bytes.\"\n}}\n"
    )
}

/// API error with HTTP status and an optional pinned JSON body.
///
/// This type implements `IntoResponse`, allowing it to be returned directly
/// from Axum handlers.
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status code for the response.
    pub status: StatusCode,
    /// JSON body, when the endpoint contract includes one.
    body: Option<String>,
}

impl ApiError {
    /// 413 with the `secret_too_large` JSON body.
    pub fn secret_too_large() -> Self {
        Self {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            body: Some(secret_too_large_body(DEFAULT_MAX_SECRET_SIZE)),
        }
    }

    /// 403 with the `duplicate_id` JSON body.
    pub fn duplicate_id() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            body: Some(DUPLICATE_ID_BODY.to_string()),
        }
    }

    /// 507 with the `storage_full` JSON body.
    pub fn storage_full() -> Self {
        Self {
            status: StatusCode::INSUFFICIENT_STORAGE,
            body: Some(STORAGE_FULL_BODY.to_string()),
        }
    }

    /// Bare 403 for a retrieve/status hit on a consumed secret.
    pub fn already_accessed() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            body: None,
        }
    }

    /// Bare 410 for a retrieve/status hit on an expired secret.
    pub fn expired() -> Self {
        Self {
            status: StatusCode::GONE,
            body: None,
        }
    }

    /// Bare 404: no state, bad code, or malformed uuid.
    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: None,
        }
    }

    /// Bare 500. The cause is logged by the caller, never exposed.
    pub fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (
                self.status,
                [(header::CONTENT_TYPE, "application/json")],
                body,
            )
                .into_response(),
            None => self.status.into_response(),
        }
    }
}
