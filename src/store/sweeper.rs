// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SneakyNote

//! # Sweeper
//!
//! Background actor that enforces the secret-lifetime invariant and
//! garbage-collects old records. A single sweeper runs for the lifetime of
//! the process with a fixed cadence; it shares no state with request
//! handlers beyond the filesystem itself.
//!
//! Every tick runs five passes in order: expire stale pending secrets,
//! clear leftovers in `being_accessed/`, drop old accessed records, drain
//! `expiring/`, drop old expired records. Each pass logs failures and
//! continues; live-operation correctness never depends on the sweeper's
//! timeliness, only on its eventual progress.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::wipe::zero_file_and_remove;
use super::{
    is_older_than, read_code, write_file_mode, Store, BEING_ACCESSED_GRACE, RECORD_LIFETIME,
};

/// Default interval between sweep ticks.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

impl Store {
    /// Run all five sweep passes once. Pass failures are logged, never
    /// propagated; the sweep always visits every folder.
    pub fn sweep(&self) {
        if let Err(e) = self.sweep_secrets() {
            warn!(error = %e, "failed to sweep pending secrets");
        }
        if let Err(e) = self.sweep_being_accessed() {
            warn!(error = %e, "failed to sweep being_accessed");
        }
        if let Err(e) = self.sweep_accessed() {
            warn!(error = %e, "failed to sweep accessed records");
        }
        if let Err(e) = self.sweep_expiring() {
            warn!(error = %e, "failed to sweep expiring secrets");
        }
        if let Err(e) = self.sweep_expired() {
            warn!(error = %e, "failed to sweep expired records");
        }
    }

    /// Expire pending secrets older than the secret lifetime.
    ///
    /// The empty expired record is staked before the rename: a concurrent
    /// retrieve that wins the rename converts the secret into an accessed
    /// record and our rename simply fails; a retrieve that loses finds the
    /// expired record already in place.
    pub fn sweep_secrets(&self) -> io::Result<()> {
        for entry in fs::read_dir(self.paths().root())? {
            let entry = entry?;
            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(_) => continue,
            };
            if !meta.is_file() || !is_older_than(&meta, self.secret_lifetime()) {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };

            let expired_path = self.paths().expired(&name);
            if let Err(e) = write_file_mode(&expired_path, &[], 0o600) {
                warn!(name = %name, error = %e, "failed to stake expired record");
            }

            let expiring_path = self.paths().expiring(&name);
            match fs::rename(entry.path(), &expiring_path) {
                Err(e) => {
                    // Lost the race to a retrieve; nothing left to expire.
                    warn!(name = %name, error = %e, "failed to move secret to expiring");
                }
                Ok(()) => match read_code(&expiring_path) {
                    Ok(code) => {
                        if let Err(e) = write_file_mode(&expired_path, code.as_bytes(), 0o400) {
                            warn!(name = %name, error = %e, "failed to record code on expired record");
                        }
                    }
                    Err(e) => {
                        warn!(name = %name, error = %e, "failed to read code from expiring secret")
                    }
                },
            }
        }
        Ok(())
    }

    /// Clear unlikely leftovers in `being_accessed/`. A minute beyond the
    /// secret lifetime is more than plenty to read a secret out.
    pub fn sweep_being_accessed(&self) -> io::Result<()> {
        sweep_folder(
            &self.paths().being_accessed_dir(),
            self.secret_lifetime() + BEING_ACCESSED_GRACE,
        )
    }

    /// Drop accessed records once senders have had a day to poll.
    pub fn sweep_accessed(&self) -> io::Result<()> {
        sweep_folder(&self.paths().accessed_dir(), RECORD_LIFETIME)
    }

    /// Drain everything staged by the previous tick's pending pass.
    pub fn sweep_expiring(&self) -> io::Result<()> {
        sweep_folder(&self.paths().expiring_dir(), Duration::ZERO)
    }

    /// Drop expired records once senders have had a day to poll.
    pub fn sweep_expired(&self) -> io::Result<()> {
        sweep_folder(&self.paths().expired_dir(), RECORD_LIFETIME)
    }
}

fn sweep_folder(folder: &Path, max_age: Duration) -> io::Result<()> {
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        let meta = match entry.metadata() {
            Ok(meta) => meta,
            Err(_) => continue,
        };
        if !meta.is_file() || !is_older_than(&meta, max_age) {
            continue;
        }
        if let Err(e) = zero_file_and_remove(&entry.path()) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %entry.path().display(), error = %e, "failed to wipe swept file");
            }
        }
    }
    Ok(())
}

/// Background sweeper owning its cadence.
pub struct Sweeper {
    store: Arc<Store>,
    interval: Duration,
}

impl Sweeper {
    /// Create a sweeper over the given store.
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "sweeper starting");

        loop {
            if shutdown.is_cancelled() {
                info!("sweeper shutting down");
                return;
            }

            self.store.sweep();

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("sweeper shutting down");
                    return;
                }
            }
        }
    }
}
