// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SneakyNote

//! # Application State
//!
//! Shared state passed to all Axum request handlers via the `State`
//! extractor: the secret store and the request counters. Both are
//! `Arc`-wrapped so the state is cheap to clone across tasks; the sweeper
//! receives its own clone of the store `Arc` at startup.

use std::sync::Arc;

use crate::metrics::Metrics;
use crate::store::Store;

/// Shared application state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The secret store over the RAM-backed substrate.
    pub store: Arc<Store>,
    /// Per-outcome request counters.
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Create new application state over an opened store.
    pub fn new(store: Store) -> Self {
        Self {
            store: Arc::new(store),
            metrics: Arc::new(Metrics::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        // Default creates a test-friendly instance over a temp directory
        #[cfg(test)]
        {
            use crate::store::StorePaths;
            let root = std::env::temp_dir()
                .join(format!("sneakynote-state-{}", uuid::Uuid::new_v4()));
            let store = Store::new(StorePaths::new(&root));
            store.open().expect("failed to initialize test store");
            Self::new(store)
        }
        #[cfg(not(test))]
        {
            panic!("AppState::default() should not be used in production - use AppState::new() with an opened store")
        }
    }
}
