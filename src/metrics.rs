// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SneakyNote

//! Request counters, one per externally observable outcome.
//!
//! Thread-safe via atomic operations; handlers record outcomes as they map
//! store results to responses.

use std::sync::atomic::{AtomicU64, Ordering};

/// Collected counters for note operations.
#[derive(Debug, Default)]
pub struct Metrics {
    notes_created: AtomicU64,
    notes_opened: AtomicU64,
    too_large_requests: AtomicU64,
    duplicate_id_requests: AtomicU64,
    storage_full_requests: AtomicU64,
    expired_requests: AtomicU64,
    already_opened_requests: AtomicU64,
    not_found_requests: AtomicU64,
    status_requests: AtomicU64,
    total_requests: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record any request reaching a note or free-space handler.
    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_created(&self) {
        self.notes_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_opened(&self) {
        self.notes_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_too_large(&self) {
        self.too_large_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate_id(&self) {
        self.duplicate_id_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_storage_full(&self) {
        self.storage_full_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expired(&self) {
        self.expired_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_already_opened(&self) {
        self.already_opened_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_not_found(&self) {
        self.not_found_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_status_request(&self) {
        self.status_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            notes_created: self.notes_created.load(Ordering::Relaxed),
            notes_opened: self.notes_opened.load(Ordering::Relaxed),
            too_large_requests: self.too_large_requests.load(Ordering::Relaxed),
            duplicate_id_requests: self.duplicate_id_requests.load(Ordering::Relaxed),
            storage_full_requests: self.storage_full_requests.load(Ordering::Relaxed),
            expired_requests: self.expired_requests.load(Ordering::Relaxed),
            already_opened_requests: self.already_opened_requests.load(Ordering::Relaxed),
            not_found_requests: self.not_found_requests.load(Ordering::Relaxed),
            status_requests: self.status_requests.load(Ordering::Relaxed),
            total_requests: self.total_requests.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub notes_created: u64,
    pub notes_opened: u64,
    pub too_large_requests: u64,
    pub duplicate_id_requests: u64,
    pub storage_full_requests: u64,
    pub expired_requests: u64,
    pub already_opened_requests: u64,
    pub not_found_requests: u64,
    pub status_requests: u64,
    pub total_requests: u64,
}
