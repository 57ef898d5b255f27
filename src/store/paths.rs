// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SneakyNote

//! Path constants and utilities for the secret store layout.

use std::path::{Path, PathBuf};

/// Default mount point for the RAM-backed secret store.
pub const DEFAULT_STORE_PATH: &str = "/tmp/sneakynote_store";

/// Path utilities for the five state directories of the store.
///
/// A secret's position in its lifecycle is encoded by which directory its
/// file lives in: the root (pending), `being_accessed/`, `accessed/`,
/// `expiring/`, or `expired/`.
#[derive(Debug, Clone)]
pub struct StorePaths {
    root: PathBuf,
}

impl Default for StorePaths {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_PATH)
    }
}

impl StorePaths {
    /// Create a new StorePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory; pending secrets live directly under it.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding secrets currently being read out.
    pub fn being_accessed_dir(&self) -> PathBuf {
        self.root.join("being_accessed")
    }

    /// Directory holding records of delivered secrets.
    pub fn accessed_dir(&self) -> PathBuf {
        self.root.join("accessed")
    }

    /// Staging directory for secrets awaiting zero-then-delete.
    pub fn expiring_dir(&self) -> PathBuf {
        self.root.join("expiring")
    }

    /// Directory holding records of secrets that expired unread.
    pub fn expired_dir(&self) -> PathBuf {
        self.root.join("expired")
    }

    /// Path of a pending secret file.
    pub fn secret(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Path of a being-accessed file.
    pub fn being_accessed(&self, name: &str) -> PathBuf {
        self.being_accessed_dir().join(name)
    }

    /// Path of an accessed record.
    pub fn accessed(&self, name: &str) -> PathBuf {
        self.accessed_dir().join(name)
    }

    /// Path of an expiring file.
    pub fn expiring(&self, name: &str) -> PathBuf {
        self.expiring_dir().join(name)
    }

    /// Path of an expired record.
    pub fn expired(&self, name: &str) -> PathBuf {
        self.expired_dir().join(name)
    }
}
