// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SneakyNote

//! # Secret Store
//!
//! Filesystem-backed state machine providing at-most-once delivery of
//! secrets. A secret's lifecycle position is encoded by which of five
//! directories holds its file (see [`paths::StorePaths`]); every transition
//! is an atomic rename, so no user-space lock is held anywhere and races
//! are resolved by the filesystem: whichever caller's rename succeeds owns
//! the file.
//!
//! ## On-disk format
//!
//! A live secret file is `code + "\n" + payload`. Accessed and expired
//! records hold the bare 12-byte code with no newline (staked empty first,
//! rewritten once the code is known). File names are
//! `hex(SHA-256(uuid-bytes))`, so the substrate never learns the UUID.
//!
//! ## Memory discipline
//!
//! Every buffer that holds payload bytes is [`Zeroizing`] and temp files
//! are destroyed with zero-then-unlink on all exit paths.

use std::fmt;
use std::fs::{self, Metadata, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use zeroize::Zeroizing;

pub mod naming;
pub mod paths;
pub mod substrate;
pub mod sweeper;
pub mod wipe;

pub use paths::{StorePaths, DEFAULT_STORE_PATH};
pub use sweeper::Sweeper;

use wipe::WipeGuard;

/// On-disk size of a sharing code (`XXX XXX XXXX`).
pub const CODE_BYTE_SIZE: usize = 12;

/// Largest accepted payload, in bytes.
pub const DEFAULT_MAX_SECRET_SIZE: usize = 16 * 1024;

/// How long an unread secret stays retrievable.
pub const DEFAULT_SECRET_LIFETIME: Duration = Duration::from_secs(10 * 60);

/// How long accessed/expired records are kept for status checks.
pub const RECORD_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Extra allowance before leftovers in `being_accessed/` are swept.
pub const BEING_ACCESSED_GRACE: Duration = Duration::from_secs(60);

/// Status probe attempts before concluding a secret does not exist.
pub const STATUS_PROBE_ATTEMPTS: u32 = 3;

/// Backoff between status probe attempts, covering the window where a file
/// is renamed away between stat and read by a concurrent retrieve or sweep.
pub const STATUS_PROBE_BACKOFF: Duration = Duration::from_millis(50);

/// Error type for store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Payload exceeds the maximum secret size
    SecretTooLarge,
    /// Save attempted on a uuid with any prior state
    DuplicateId,
    /// Substrate cannot accept the payload
    StorageFull,
    /// Retrieve on a secret that was already delivered
    SecretAlreadyAccessed,
    /// Retrieve on a secret that expired unread
    SecretExpired,
    /// No state exists for the uuid
    SecretNotFound,
    /// Free-space probe failed; admission cannot be decided
    StorageStatusUnknown,
    /// The uuid does not decode to 16 bytes of hex
    InvalidId,
    /// I/O or RNG failure not captured above
    Io(io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::SecretTooLarge => write!(f, "Secret too large"),
            StoreError::DuplicateId => write!(f, "ID has been used before"),
            StoreError::StorageFull => write!(f, "Secret storage full"),
            StoreError::SecretAlreadyAccessed => {
                write!(f, "Secret has already been accessed")
            }
            StoreError::SecretExpired => {
                write!(f, "Secret has expired without being accessed")
            }
            StoreError::SecretNotFound => write!(f, "Secret not found"),
            StoreError::StorageStatusUnknown => {
                write!(f, "Could not determine storage free space")
            }
            StoreError::InvalidId => write!(f, "Note id is not a valid UUID"),
            StoreError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

/// Result of a status probe, as reported to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretStatus {
    /// Saved and not yet read
    Pending,
    /// Delivered to exactly one reader
    AlreadyAccessed,
    /// Expired unread
    Expired,
    /// No state for the uuid, or the presented code did not match
    NotFound,
}

/// The secret store over a substrate root.
///
/// Cheap to clone; holds no handles, only configuration. All coordination
/// between concurrent operations is filesystem-mediated.
#[derive(Debug, Clone)]
pub struct Store {
    paths: StorePaths,
    max_secret_size: usize,
    headroom: i64,
    secret_lifetime: Duration,
}

impl Store {
    /// Create a store over the given paths with default limits.
    pub fn new(paths: StorePaths) -> Self {
        Self {
            paths,
            max_secret_size: DEFAULT_MAX_SECRET_SIZE,
            headroom: substrate::DEFAULT_HEADROOM,
            secret_lifetime: DEFAULT_SECRET_LIFETIME,
        }
    }

    /// Create a store over the default mount point.
    pub fn with_default_paths() -> Self {
        Self::new(StorePaths::default())
    }

    /// Override the maximum payload size.
    pub fn with_max_secret_size(mut self, max_secret_size: usize) -> Self {
        self.max_secret_size = max_secret_size;
        self
    }

    /// Override the free-space headroom.
    pub fn with_headroom(mut self, headroom: i64) -> Self {
        self.headroom = headroom;
        self
    }

    /// Override the secret lifetime.
    pub fn with_secret_lifetime(mut self, secret_lifetime: Duration) -> Self {
        self.secret_lifetime = secret_lifetime;
        self
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    pub fn max_secret_size(&self) -> usize {
        self.max_secret_size
    }

    pub fn secret_lifetime(&self) -> Duration {
        self.secret_lifetime
    }

    /// Create the root and the four state directories (0700). Idempotent.
    ///
    /// Tests run over a plain temp directory; production roots are mounted
    /// first via [`Store::setup`].
    pub fn open(&self) -> io::Result<()> {
        let dirs = [
            self.paths.root().to_path_buf(),
            self.paths.being_accessed_dir(),
            self.paths.accessed_dir(),
            self.paths.expiring_dir(),
            self.paths.expired_dir(),
        ];
        for dir in dirs {
            if !dir.exists() {
                fs::DirBuilder::new().recursive(true).mode(0o700).create(&dir)?;
            }
        }
        Ok(())
    }

    /// Mount the RAM-backed substrate and initialize the state directories.
    pub fn setup(&self) -> io::Result<()> {
        substrate::setup_ram_disk(self.paths.root())?;
        self.open()
    }

    /// Unmount the substrate and remove the mount point directory.
    ///
    /// The removal only runs for roots under `/tmp/`; an arbitrary root is
    /// never deleted.
    pub fn teardown(&self) -> io::Result<()> {
        substrate::unmount(self.paths.root())?;
        let root = self.paths.root();
        if root.to_string_lossy().starts_with("/tmp/") {
            fs::remove_dir_all(root)?;
            tracing::info!(root = %root.display(), "mount point directory removed");
        }
        Ok(())
    }

    /// Substrate bytes available for new secrets: free space minus the
    /// platform headroom. Returns -1 when free space cannot be determined.
    pub fn available_memory(&self) -> i64 {
        match substrate::free_space(self.paths.root()) {
            Ok(free) => free.saturating_sub(self.headroom),
            Err(e) => {
                tracing::warn!(error = %e, "failed to determine substrate free space");
                -1
            }
        }
    }

    /// Save a payload under `id` and return the sharing code.
    ///
    /// The reader is drained into a single zeroizing buffer sized one byte
    /// past the limit so oversize detection is deterministic. Re-use of an
    /// id with any prior state fails with [`StoreError::DuplicateId`]; if a
    /// pending secret exists under the same id, it is destroyed and an
    /// accessed record with the original sender's code is left behind, so
    /// the legitimate sender can detect the replay from status.
    pub async fn save<R>(&self, data: &mut R, id: &str) -> Result<String, StoreError>
    where
        R: AsyncRead + Unpin,
    {
        let name = naming::uuid_to_file_name(id).ok_or(StoreError::InvalidId)?;

        if self.record_state(&name).is_some() {
            return Err(StoreError::DuplicateId);
        }

        let mut buf = Zeroizing::new(vec![0u8; self.max_secret_size + CODE_BYTE_SIZE + 2]);
        let code = naming::generate_code().map_err(|e| {
            tracing::error!(error = %e, "failed to generate code");
            StoreError::Io(e)
        })?;
        buf[..CODE_BYTE_SIZE].copy_from_slice(code.as_bytes());
        buf[CODE_BYTE_SIZE] = b'\n';
        let head = CODE_BYTE_SIZE + 1;

        let n_read = read_to_capacity(data, &mut buf[head..]).await.map_err(|e| {
            tracing::error!(error = %e, "failed to read payload");
            StoreError::Io(e)
        })?;

        if n_read > self.max_secret_size {
            return Err(StoreError::SecretTooLarge);
        }
        admit(n_read, self.available_memory())?;

        // A concurrent or re-submitted save for the same id got here first:
        // destroy the pending secret and leave an accessed record carrying
        // its code, penalizing the duplicate sender either way.
        let secret_path = self.paths.secret(&name);
        if secret_path.exists() {
            self.kill_duplicate(&name);
            return Err(StoreError::DuplicateId);
        }

        match write_file_mode(&secret_path, &buf[..head + n_read], 0o600) {
            Ok(()) => Ok(code),
            Err(e) if e.kind() == io::ErrorKind::StorageFull => Err(StoreError::StorageFull),
            Err(e) => {
                tracing::error!(error = %e, "failed to write secret file");
                Err(StoreError::Io(e))
            }
        }
    }

    /// Retrieve the payload for `id` into `buf`, consuming the secret.
    ///
    /// Returns the payload length and the sharing code. The secret file is
    /// renamed to a random temp name first, so exactly one of any number of
    /// concurrent retrievals wins; the temp file is zeroed and unlinked on
    /// every exit path. The accessed record is staked immediately after the
    /// rename and rewritten with the code once it has been read out.
    pub fn retrieve(&self, id: &str, buf: &mut [u8]) -> Result<(usize, String), StoreError> {
        let name = naming::uuid_to_file_name(id).ok_or(StoreError::InvalidId)?;
        let secret_path = self.paths.secret(&name);
        let temp_path = self
            .paths
            .being_accessed_dir()
            .join(naming::random_temp_name()?);

        // Stale pending secret: refuse without touching the file, the
        // sweeper will stake the expired record and clean it up.
        if let Ok(meta) = fs::metadata(&secret_path) {
            if is_older_than(&meta, self.secret_lifetime) {
                return Err(StoreError::SecretExpired);
            }
        }

        if let Err(e) = fs::rename(&secret_path, &temp_path) {
            if !secret_path.exists() {
                return Err(self.not_found_state(&name));
            }
            tracing::error!(error = %e, "failed to move secret for access");
            return Err(StoreError::Io(e));
        }
        let _wipe = WipeGuard::new(temp_path.clone());

        // Record the access before anything else can fail.
        let accessed_path = self.paths.accessed(&name);
        if let Err(e) = write_file_mode(&accessed_path, &[], 0o600) {
            tracing::warn!(error = %e, "failed to stake accessed record");
        }

        let mut temp_file = fs::File::open(&temp_path)?;
        let mut code_part = Zeroizing::new([0u8; CODE_BYTE_SIZE + 1]);
        temp_file.read_exact(&mut code_part[..])?;
        let code = String::from_utf8_lossy(&code_part[..CODE_BYTE_SIZE]).into_owned();

        if let Err(e) = write_file_mode(&accessed_path, code.as_bytes(), 0o400) {
            tracing::warn!(error = %e, "failed to record code on accessed record");
        }

        let n_read = read_to_capacity_sync(&mut temp_file, buf)?;
        Ok((n_read, code))
    }

    /// Report a secret's lifecycle position to a sender holding its code.
    ///
    /// The presented code is a capability: when it is empty or does not
    /// match the stored one, the probe reports [`SecretStatus::NotFound`]
    /// no matter what state exists, so the endpoint leaks nothing without
    /// the code.
    pub async fn status(&self, id: &str, given_code: &str) -> SecretStatus {
        let Some(name) = naming::uuid_to_file_name(id) else {
            return SecretStatus::NotFound;
        };

        let (outcome, secret_code) = self.locate_secret_and_code(&name).await;

        if !given_code.is_empty() && given_code == secret_code {
            outcome
        } else {
            SecretStatus::NotFound
        }
    }

    /// Probe the accessed record, the expired record, and the pending file
    /// in that order. Any of them may be renamed or unlinked between stat
    /// and read by a concurrent retrieve or sweep, so failed rounds retry
    /// with a short backoff.
    async fn locate_secret_and_code(&self, name: &str) -> (SecretStatus, String) {
        let accessed_path = self.paths.accessed(name);
        let expired_path = self.paths.expired(name);
        let secret_path = self.paths.secret(name);

        for attempt in 0..STATUS_PROBE_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(STATUS_PROBE_BACKOFF).await;
            }

            if let Ok(code) = read_code(&accessed_path) {
                return (SecretStatus::AlreadyAccessed, code);
            }
            if let Ok(code) = read_code(&expired_path) {
                return (SecretStatus::Expired, code);
            }
            if let Ok(code) = read_code(&secret_path) {
                // Stat may fail if the file vanished since the read; retry.
                if let Ok(meta) = fs::metadata(&secret_path) {
                    if is_older_than(&meta, self.secret_lifetime) {
                        return (SecretStatus::Expired, code);
                    }
                    return (SecretStatus::Pending, code);
                }
            }
        }

        (SecretStatus::NotFound, String::new())
    }

    /// Which record slot, if any, holds this name.
    fn record_state(&self, name: &str) -> Option<StoreError> {
        if self.paths.accessed(name).exists() {
            Some(StoreError::SecretAlreadyAccessed)
        } else if self.paths.expired(name).exists() {
            Some(StoreError::SecretExpired)
        } else {
            None
        }
    }

    fn not_found_state(&self, name: &str) -> StoreError {
        self.record_state(name).unwrap_or(StoreError::SecretNotFound)
    }

    /// Duplicate-kill protocol: move the pending secret out of reach, stake
    /// an accessed record, then rewrite the record with the original code
    /// extracted from the dying secret. Failures are logged and the
    /// sequence continues; the caller reports DuplicateId regardless.
    fn kill_duplicate(&self, name: &str) {
        let secret_path = self.paths.secret(name);
        let being_accessed_path = self.paths.being_accessed(name);

        if let Err(e) = fs::rename(&secret_path, &being_accessed_path) {
            tracing::warn!(error = %e, "failed to move duplicate-id secret");
        }
        let _wipe = WipeGuard::new(being_accessed_path.clone());

        let accessed_path = self.paths.accessed(name);
        if let Err(e) = write_file_mode(&accessed_path, &[], 0o600) {
            tracing::warn!(error = %e, "failed to stake accessed record");
        }

        match fs::File::open(&being_accessed_path) {
            Ok(mut file) => {
                let mut code_part = Zeroizing::new([0u8; CODE_BYTE_SIZE + 1]);
                match file.read_exact(&mut code_part[..]) {
                    Ok(()) => {
                        let code = &code_part[..CODE_BYTE_SIZE];
                        if let Err(e) = write_file_mode(&accessed_path, code, 0o400) {
                            tracing::warn!(error = %e, "failed to record code on accessed record");
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "failed to read code from dying secret"),
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to open dying secret"),
        }
    }
}

/// Admission decision for a payload of `n_read` bytes against the probed
/// available space. A negative available means the probe itself failed and
/// nothing can be admitted safely.
fn admit(n_read: usize, available: i64) -> Result<(), StoreError> {
    if available < 0 {
        return Err(StoreError::StorageStatusUnknown);
    }
    if n_read as i64 > available {
        return Err(StoreError::StorageFull);
    }
    Ok(())
}

/// Whether a file's mtime is at least `max_age` in the past. Files with
/// unreadable or future mtimes are treated as fresh.
pub(crate) fn is_older_than(meta: &Metadata, max_age: Duration) -> bool {
    meta.modified()
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .map(|age| age >= max_age)
        .unwrap_or(false)
}

/// Read only the code from a secret file, accessed record, or expired
/// record: the first 12 bytes either way, since live files carry the code
/// followed by a newline. A staked-but-empty record fails the read and is
/// treated as absent.
pub(crate) fn read_code(path: &Path) -> io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut code = [0u8; CODE_BYTE_SIZE];
    file.read_exact(&mut code)?;
    Ok(String::from_utf8_lossy(&code).into_owned())
}

/// Write a file with the given mode, truncating any existing contents.
/// The mode only applies on creation.
pub(crate) fn write_file_mode(path: &Path, data: &[u8], mode: u32) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)?;
    file.write_all(data)?;
    file.flush()?;
    Ok(())
}

/// Fill `buf` from the reader, treating EOF as normal termination. Returns
/// the number of bytes read, at most `buf.len()`.
async fn read_to_capacity<R>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

fn read_to_capacity_sync<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}


#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;

    const TEST_ID: &str = "fc2a4122-e81e-4b10-a31b-d79fbdb33a27";
    const TEST_CODE: &str = "234 567 abcd";

    fn name_for(id: &str) -> String {
        naming::uuid_to_file_name(id).unwrap()
    }

    #[test]
    fn open_creates_state_directories() {
        let store = test_store();
        assert!(store.paths().root().is_dir());
        assert!(store.paths().being_accessed_dir().is_dir());
        assert!(store.paths().accessed_dir().is_dir());
        assert!(store.paths().expiring_dir().is_dir());
        assert!(store.paths().expired_dir().is_dir());
        cleanup_store(&store);
    }

    #[tokio::test]
    async fn save_writes_code_then_newline_then_payload() {
        let store = test_store();
        let payload = b"saved test data 123";

        let mut reader: &[u8] = payload;
        let code = store.save(&mut reader, TEST_ID).await.unwrap();

        assert_eq!(code.len(), CODE_BYTE_SIZE);
        let groups: Vec<&str> = code.split(' ').collect();
        assert_eq!(groups.len(), 3);

        let saved = fs::read(store.paths().secret(&name_for(TEST_ID))).unwrap();
        let mut expected = code.clone().into_bytes();
        expected.push(b'\n');
        expected.extend_from_slice(payload);
        assert_eq!(saved, expected);

        cleanup_store(&store);
    }

    #[tokio::test]
    async fn save_accepts_exactly_max_and_rejects_one_more() {
        let store = test_store();

        let right_size = vec![0x41u8; store.max_secret_size()];
        let mut reader: &[u8] = &right_size;
        store
            .save(&mut reader, &naming::generate_uuid())
            .await
            .expect("payload of exactly the limit should be accepted");

        let wrong_size = vec![0x41u8; store.max_secret_size() + 1];
        let mut reader: &[u8] = &wrong_size;
        let err = store
            .save(&mut reader, &naming::generate_uuid())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SecretTooLarge));

        cleanup_store(&store);
    }

    #[tokio::test]
    async fn save_rejects_id_with_accessed_record() {
        let store = test_store();
        let id = naming::generate_uuid();
        write_file_mode(&store.paths().accessed(&name_for(&id)), &[], 0o600).unwrap();

        let mut reader: &[u8] = &[];
        let err = store.save(&mut reader, &id).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId));
        assert!(!store.paths().secret(&name_for(&id)).exists());

        cleanup_store(&store);
    }

    #[tokio::test]
    async fn save_rejects_id_with_expired_record() {
        let store = test_store();
        let id = naming::generate_uuid();
        write_file_mode(&store.paths().expired(&name_for(&id)), &[], 0o600).unwrap();

        let mut reader: &[u8] = &[];
        let err = store.save(&mut reader, &id).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId));

        cleanup_store(&store);
    }

    #[tokio::test]
    async fn save_replay_destroys_pending_secret_and_keeps_its_code() {
        let store = test_store();
        let id = naming::generate_uuid();
        let name = name_for(&id);
        let secret_path = store.paths().secret(&name);
        write_file_mode(&secret_path, format!("{TEST_CODE}\n").as_bytes(), 0o600).unwrap();

        let mut reader: &[u8] = &[];
        let err = store.save(&mut reader, &id).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId));

        // Pending secret destroyed, accessed record staked with its code.
        assert!(!secret_path.exists());
        let accessed = fs::read(store.paths().accessed(&name)).unwrap();
        assert_eq!(accessed, TEST_CODE.as_bytes());

        cleanup_store(&store);
    }

    #[tokio::test]
    async fn save_fails_when_free_space_is_unknown() {
        let store = test_store().with_headroom(i64::MAX);
        let mut reader: &[u8] = b"payload";
        let err = store
            .save(&mut reader, &naming::generate_uuid())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::StorageStatusUnknown));
        cleanup_store(&store);
    }

    #[test]
    fn admission_logic_boundaries() {
        assert!(admit(0, 0).is_ok());
        assert!(admit(100, 100).is_ok());
        assert!(matches!(admit(101, 100), Err(StoreError::StorageFull)));
        assert!(matches!(admit(0, -1), Err(StoreError::StorageStatusUnknown)));
    }

    #[test]
    fn retrieve_returns_payload_and_records_access() {
        let store = test_store();
        let payload = b"saved test data 123";
        let name = name_for(TEST_ID);
        let file_data = format!("{TEST_CODE}\n{}", String::from_utf8_lossy(payload));
        write_file_mode(&store.paths().secret(&name), file_data.as_bytes(), 0o600).unwrap();

        let mut buf = vec![0u8; store.max_secret_size()];
        let (n_read, code) = store.retrieve(TEST_ID, &mut buf).unwrap();

        assert_eq!(n_read, payload.len());
        assert_eq!(code, TEST_CODE);
        assert_eq!(&buf[..n_read], payload);

        // Secret gone, temp cleaned up, access recorded with the code.
        assert!(!store.paths().secret(&name).exists());
        let leftovers: Vec<_> = fs::read_dir(store.paths().being_accessed_dir())
            .unwrap()
            .collect();
        assert!(leftovers.is_empty(), "being_accessed should be drained");
        let accessed = fs::read(store.paths().accessed(&name)).unwrap();
        assert_eq!(accessed, TEST_CODE.as_bytes());

        cleanup_store(&store);
    }

    #[test]
    fn retrieve_refuses_consumed_secret() {
        let store = test_store();
        let name = name_for(TEST_ID);
        write_file_mode(&store.paths().accessed(&name), b"code", 0o600).unwrap();

        let mut buf = vec![0u8; store.max_secret_size()];
        let err = store.retrieve(TEST_ID, &mut buf).unwrap_err();
        assert!(matches!(err, StoreError::SecretAlreadyAccessed));

        cleanup_store(&store);
    }

    #[test]
    fn retrieve_refuses_stale_pending_secret() {
        let store = test_store();
        let name = name_for(TEST_ID);
        let secret_path = store.paths().secret(&name);
        write_file_mode(&secret_path, b"code\nmy super secret", 0o600).unwrap();
        age_file(&secret_path, DEFAULT_SECRET_LIFETIME);

        let mut buf = vec![0u8; store.max_secret_size()];
        let err = store.retrieve(TEST_ID, &mut buf).unwrap_err();
        assert!(matches!(err, StoreError::SecretExpired));

        // Untouched; cleanup is the sweeper's job.
        assert!(secret_path.exists());

        cleanup_store(&store);
    }

    #[test]
    fn retrieve_refuses_swept_secret() {
        let store = test_store();
        let name = name_for(TEST_ID);
        write_file_mode(&store.paths().expired(&name), b"code", 0o600).unwrap();

        let mut buf = vec![0u8; store.max_secret_size()];
        let err = store.retrieve(TEST_ID, &mut buf).unwrap_err();
        assert!(matches!(err, StoreError::SecretExpired));

        cleanup_store(&store);
    }

    #[test]
    fn retrieve_unknown_id_is_not_found() {
        let store = test_store();
        let mut buf = vec![0u8; store.max_secret_size()];
        let err = store.retrieve(TEST_ID, &mut buf).unwrap_err();
        assert!(matches!(err, StoreError::SecretNotFound));
        cleanup_store(&store);
    }

    #[tokio::test]
    async fn status_pending_requires_matching_code() {
        let store = test_store();
        let name = name_for(TEST_ID);
        let file_data = format!("{TEST_CODE}\nsaved test data 123");
        write_file_mode(&store.paths().secret(&name), file_data.as_bytes(), 0o600).unwrap();

        assert_eq!(store.status(TEST_ID, TEST_CODE).await, SecretStatus::Pending);
        // Idempotent.
        assert_eq!(store.status(TEST_ID, TEST_CODE).await, SecretStatus::Pending);
        // The code is a capability.
        assert_eq!(store.status(TEST_ID, "bad code").await, SecretStatus::NotFound);
        assert_eq!(store.status(TEST_ID, "").await, SecretStatus::NotFound);

        cleanup_store(&store);
    }

    #[tokio::test]
    async fn status_reports_accessed() {
        let store = test_store();
        let name = name_for(TEST_ID);
        write_file_mode(&store.paths().accessed(&name), TEST_CODE.as_bytes(), 0o600).unwrap();

        assert_eq!(
            store.status(TEST_ID, TEST_CODE).await,
            SecretStatus::AlreadyAccessed
        );
        assert_eq!(
            store.status(TEST_ID, TEST_CODE).await,
            SecretStatus::AlreadyAccessed
        );
        assert_eq!(store.status(TEST_ID, "bad code").await, SecretStatus::NotFound);

        cleanup_store(&store);
    }

    #[tokio::test]
    async fn status_reports_stale_pending_secret_as_expired() {
        let store = test_store();
        let name = name_for(TEST_ID);
        let secret_path = store.paths().secret(&name);
        let file_data = format!("{TEST_CODE}\nmy super secret");
        write_file_mode(&secret_path, file_data.as_bytes(), 0o600).unwrap();
        age_file(&secret_path, DEFAULT_SECRET_LIFETIME);

        assert_eq!(store.status(TEST_ID, TEST_CODE).await, SecretStatus::Expired);
        assert_eq!(store.status(TEST_ID, TEST_CODE).await, SecretStatus::Expired);
        assert_eq!(store.status(TEST_ID, "bad code").await, SecretStatus::NotFound);

        cleanup_store(&store);
    }

    #[tokio::test]
    async fn status_reports_expired_record() {
        let store = test_store();
        let name = name_for(TEST_ID);
        write_file_mode(&store.paths().expired(&name), TEST_CODE.as_bytes(), 0o600).unwrap();

        assert_eq!(store.status(TEST_ID, TEST_CODE).await, SecretStatus::Expired);
        assert_eq!(store.status(TEST_ID, "bad code").await, SecretStatus::NotFound);

        cleanup_store(&store);
    }

    #[tokio::test]
    async fn status_unknown_id_is_not_found() {
        let store = test_store();
        assert_eq!(store.status(TEST_ID, TEST_CODE).await, SecretStatus::NotFound);
        cleanup_store(&store);
    }

    #[tokio::test]
    async fn status_ignores_staked_but_empty_accessed_record() {
        // A crash between staking the record and writing the code leaves an
        // empty file; the probe must not report a code-less access.
        let store = test_store();
        let name = name_for(TEST_ID);
        write_file_mode(&store.paths().accessed(&name), &[], 0o600).unwrap();

        assert_eq!(store.status(TEST_ID, TEST_CODE).await, SecretStatus::NotFound);

        cleanup_store(&store);
    }

    #[tokio::test]
    async fn save_then_retrieve_round_trip() {
        let store = test_store();
        let id = naming::generate_uuid();
        let payload = b"this is my secret";

        let mut reader: &[u8] = payload;
        let code = store.save(&mut reader, &id).await.unwrap();

        let mut buf = vec![0u8; store.max_secret_size()];
        let (n_read, retrieved_code) = store.retrieve(&id, &mut buf).unwrap();
        assert_eq!(retrieved_code, code);
        assert_eq!(&buf[..n_read], payload);

        // Second retrieval refused.
        let err = store.retrieve(&id, &mut buf).unwrap_err();
        assert!(matches!(err, StoreError::SecretAlreadyAccessed));

        // Status agrees, with the code as capability.
        assert_eq!(store.status(&id, &code).await, SecretStatus::AlreadyAccessed);

        cleanup_store(&store);
    }
}
