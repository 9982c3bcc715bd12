//! Lock file primitive for single-instance supervision
//!
//! The record lives in a `<base>.lock` companion file next to the
//! well-known lock path. Holding the lock means the record file exists.
//! Acquisition stages the full record in a scratch file and publishes
//! it with a hard link, so a record is only ever observed complete and
//! at most one of two racing acquirers succeeds.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use crate::errors::{Result, TorrentdError};

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Identifies which logical daemon configuration an instance serves
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fingerprint {
    pub name: String,
    pub search_host: String,
    pub search_port: u16,
    pub service_port: u16,
}

impl Fingerprint {
    pub fn new(name: &str, search_host: &str, search_port: u16, service_port: u16) -> Self {
        Fingerprint {
            name: name.to_string(),
            search_host: search_host.to_string(),
            search_port,
            service_port,
        }
    }

    /// Compare against another fingerprint
    ///
    /// The service port is only consulted when `match_service_port` is
    /// set; it may legitimately change across restarts of the same
    /// logical instance.
    pub fn matches(&self, other: &Fingerprint, match_service_port: bool) -> bool {
        self.name == other.name
            && self.search_host == other.search_host
            && self.search_port == other.search_port
            && (!match_service_port || self.service_port == other.service_port)
    }
}

/// Persisted lock record naming the current holder and its fingerprint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockRecord {
    /// Process id of the current holder
    pub owner_pid: u32,
    /// Configuration the holder serves
    pub fingerprint: Fingerprint,
    /// Diagnostic only; age queries use the file modification time
    pub acquired_at: String,
}

impl LockRecord {
    pub fn new(owner_pid: u32, fingerprint: Fingerprint) -> Self {
        LockRecord {
            owner_pid,
            fingerprint,
            acquired_at: Utc::now().to_rfc3339(),
        }
    }
}

/// File-backed lock; the record file existing means the lock is held
#[derive(Debug, Clone)]
pub struct LockFile {
    record_path: PathBuf,
}

impl LockFile {
    /// Create a handle for the given lock base path
    ///
    /// The record is kept in the `<base>.lock` companion file.
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        let mut os = base.as_ref().as_os_str().to_os_string();
        os.push(".lock");
        LockFile {
            record_path: PathBuf::from(os),
        }
    }

    /// Path of the record file
    pub fn record_path(&self) -> &Path {
        &self.record_path
    }

    /// Whether a record currently exists for this path
    pub fn is_locked(&self) -> bool {
        self.record_path.exists()
    }

    /// Read the current record
    ///
    /// Returns `Ok(None)` when the lock is not held and an error when a
    /// record exists but cannot be parsed.
    pub fn read(&self) -> Result<Option<LockRecord>> {
        let content = match fs::read_to_string(&self.record_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record = serde_json::from_str(&content)
            .map_err(|e| TorrentdError::Lock(format!("Unreadable lock record: {}", e)))?;

        Ok(Some(record))
    }

    /// Atomically publish `record` as the new lock
    ///
    /// Exactly one of two racing acquirers succeeds; the loser gets
    /// `LockContended` and must re-inspect the winner's record.
    pub fn acquire(&self, record: &LockRecord) -> Result<()> {
        if let Some(parent) = self.record_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
        let staging = self
            .record_path
            .with_extension(format!("lock-{}-{}", record.owner_pid, seq));

        let json = serde_json::to_string_pretty(record)?;
        fs::write(&staging, json)?;

        let linked = fs::hard_link(&staging, &self.record_path);
        let _ = fs::remove_file(&staging);

        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(TorrentdError::LockContended(
                    self.record_path.display().to_string(),
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Forcibly clear a record left behind by another owner
    ///
    /// Missing files are fine; the owner may have released in between.
    pub fn break_lock(&self) {
        let _ = fs::remove_file(&self.record_path);
    }

    /// Release a lock held by this process
    pub fn release(&self) -> Result<()> {
        fs::remove_file(&self.record_path)?;
        Ok(())
    }

    /// Seconds since the record file was last modified
    ///
    /// Returns 0.0 when the file cannot be inspected. Diagnostic only,
    /// never consulted by the acquire/release decision.
    pub fn age_seconds(&self) -> f64 {
        fs::metadata(&self.record_path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|mtime| SystemTime::now().duration_since(mtime).ok())
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}
