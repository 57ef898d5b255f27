// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SneakyNote

//! Zero-then-unlink of substrate files.
//!
//! The substrate is volatile, but a file's blocks may still be readable
//! until they are reused. Destroying a file therefore overwrites it with
//! zeros and syncs before unlinking. The unlink is attempted even when the
//! overwrite fails, so a partially-wiped file never outlives the operation.

use std::fs::{self, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Overwrite a file with zeros, sync, then remove it.
///
/// The removal happens regardless of whether the overwrite succeeded; the
/// first error encountered is returned.
pub fn zero_file_and_remove(path: &Path) -> io::Result<()> {
    let overwritten = zero_file(path);
    let removed = fs::remove_file(path);
    overwritten.and(removed)
}

fn zero_file(path: &Path) -> io::Result<()> {
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    let size = file.metadata()?.len() as usize;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&vec![0u8; size])?;
    file.sync_all()?;
    Ok(())
}

/// Drop guard that wipes a file on every exit path of the enclosing scope.
///
/// Used for the being-accessed temp files of `retrieve` and the
/// duplicate-kill path of `save`.
pub struct WipeGuard {
    path: PathBuf,
}

impl WipeGuard {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Drop for WipeGuard {
    fn drop(&mut self) {
        if let Err(e) = zero_file_and_remove(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to wipe temp file"
                );
            }
        }
    }
}
