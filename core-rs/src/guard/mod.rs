//! Single-instance daemon supervision
//!
//! One lock file per daemon configuration. A new launch inspects the
//! persisted record, takes over a stale or mismatched owner (quit
//! signal, clear, re-acquire) and skips startup entirely when the
//! identical configuration is already served by a live process.
//!
//! The guard is a synchronous sequence of blocking OS calls executed
//! once at process startup; cross-process races at acquire time are
//! resolved by the lock primitive's exclusive publish plus a bounded
//! re-inspection loop on the losing side.

mod lock;

pub use lock::{Fingerprint, LockFile, LockRecord};

use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::errors::TorrentdError;
use crate::process::{ProcessControl, SystemProcessControl};

/// Re-inspections allowed when an acquire races with another launch
const CONTENTION_RETRIES: u32 = 5;

/// Pause between contention re-inspections
const CONTENTION_PAUSE: Duration = Duration::from_millis(100);

/// What `ensure_single_instance` did with the start callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// The callback ran to completion and the lock was released
    Started,
    /// The callback was skipped: a live instance already serves this
    /// configuration, or contention did not resolve within the bound
    AlreadyRunning,
}

enum Decision {
    Acquire,
    AlreadyRunning,
}

/// Single-instance guard for one lock path
///
/// Construction takes the lock path and the process-control collaborator
/// explicitly, so tests run against temporary paths and mock signals.
///
/// # Example
///
/// ```no_run
/// use torrentd_core::{Fingerprint, InstanceGuard};
///
/// let guard = InstanceGuard::new(torrentd_core::DEFAULT_LOCK_PATH);
/// let fingerprint = Fingerprint::new("torrentd", "127.0.0.1", 9010, 46123);
///
/// guard.ensure_single_instance(&fingerprint, || {
///     // serve until shutdown
/// });
/// ```
pub struct InstanceGuard {
    lock: LockFile,
    control: Box<dyn ProcessControl>,
    match_service_port: bool,
}

impl InstanceGuard {
    /// Guard the given lock path using real OS signals
    pub fn new<P: AsRef<Path>>(lock_path: P) -> Self {
        Self::with_control(lock_path, Box::new(SystemProcessControl))
    }

    /// Guard with an explicit process-control collaborator
    pub fn with_control<P: AsRef<Path>>(lock_path: P, control: Box<dyn ProcessControl>) -> Self {
        InstanceGuard {
            lock: LockFile::new(lock_path),
            control,
            match_service_port: false,
        }
    }

    /// Include the service port in the mismatch test
    ///
    /// Off by default: the service port may legitimately change across
    /// restarts of the same logical instance.
    pub fn match_service_port(mut self, enabled: bool) -> Self {
        self.match_service_port = enabled;
        self
    }

    /// Run `start` as the sole instance serving `fingerprint`
    ///
    /// Runs as the first action of daemon startup. Never fails: every
    /// lock or signal problem is resolved toward either running the
    /// callback exactly once or skipping it, and the branch taken is
    /// logged. The callback is expected to block until shutdown; the
    /// lock is released when it returns.
    pub fn ensure_single_instance<F>(&self, fingerprint: &Fingerprint, start: F) -> GuardOutcome
    where
        F: FnOnce(),
    {
        let mut attempts = 0;

        loop {
            match self.inspect(fingerprint) {
                Decision::AlreadyRunning => {
                    info!("same daemon process");
                    return GuardOutcome::AlreadyRunning;
                }
                Decision::Acquire => {
                    let record = LockRecord::new(std::process::id(), fingerprint.clone());
                    match self.lock.acquire(&record) {
                        Ok(()) => {
                            debug!(pid = record.owner_pid, "creating process");
                            start();
                            if let Err(e) = self.lock.release() {
                                warn!("Failed to release lock: {}", e);
                            }
                            return GuardOutcome::Started;
                        }
                        Err(TorrentdError::LockContended(path)) => {
                            attempts += 1;
                            if attempts > CONTENTION_RETRIES {
                                error!(
                                    %path,
                                    "Lock contention did not resolve after {} attempts",
                                    CONTENTION_RETRIES
                                );
                                return GuardOutcome::AlreadyRunning;
                            }
                            debug!(%path, attempt = attempts, "lock contended, re-inspecting");
                            thread::sleep(CONTENTION_PAUSE);
                        }
                        Err(e) => {
                            error!("Failed to acquire lock: {}", e);
                            return GuardOutcome::AlreadyRunning;
                        }
                    }
                }
            }
        }
    }

    /// Inspect the current record and decide between acquiring and
    /// deferring to a live identical instance
    ///
    /// Takeover side effects (quit signal, record clearing) happen here;
    /// both are best-effort and never block the decision.
    fn inspect(&self, fingerprint: &Fingerprint) -> Decision {
        if !self.lock.is_locked() {
            return Decision::Acquire;
        }
        debug!("lock active");

        let record = match self.lock.read() {
            Ok(Some(record)) => record,
            Ok(None) => return Decision::Acquire,
            Err(e) => {
                // Not usable as evidence of a live owner
                warn!("Discarding unreadable lock record: {}", e);
                self.lock.break_lock();
                return Decision::Acquire;
            }
        };

        let matched = record
            .fingerprint
            .matches(fingerprint, self.match_service_port);
        let alive = self.control.is_alive(record.owner_pid);

        if matched && alive {
            return Decision::AlreadyRunning;
        }

        debug!(pid = record.owner_pid, matched, alive, "killing process");
        if let Err(e) = self.control.terminate(record.owner_pid) {
            // The owner may already be gone
            debug!(pid = record.owner_pid, "termination signal failed: {}", e);
        }
        self.lock.break_lock();

        Decision::Acquire
    }

    /// Seconds since the lock record last changed, 0.0 when absent
    ///
    /// Diagnostic only, never part of the acquire/release decision.
    pub fn lock_age_seconds(&self) -> f64 {
        self.lock.age_seconds()
    }

    /// Current lock record, if one is held and readable
    pub fn current_record(&self) -> Option<LockRecord> {
        self.lock.read().ok().flatten()
    }

    /// Path of the record file this guard watches
    pub fn record_path(&self) -> &Path {
        self.lock.record_path()
    }
}
