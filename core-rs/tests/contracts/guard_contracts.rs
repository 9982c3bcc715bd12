//! Instance Guard Contract Tests
//!
//! These tests verify INVARIANTS of the single-instance protocol that
//! must never break regardless of implementation: at most one record
//! per lock path, mutual exclusion between concurrent acquirers, the
//! fingerprint comparison rule, and release semantics.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use tempfile::TempDir;
use torrentd_core::{Fingerprint, GuardOutcome, InstanceGuard, LockFile, LockRecord};

fn fingerprint() -> Fingerprint {
    Fingerprint::new("seedbox", "tracker.local", 9090, 46123)
}

/// WHY: the record file existing IS the lock; two records can never
/// coexist for one path
/// BREAKS: two daemons serving the same configuration at once
#[test]
fn at_most_one_record_per_path() {
    let temp = TempDir::new().unwrap();
    let lock = LockFile::new(temp.path().join("torrentd"));

    lock.acquire(&LockRecord::new(1, fingerprint())).unwrap();
    assert!(lock.acquire(&LockRecord::new(2, fingerprint())).is_err());

    // The winner's record survived the losing attempt untouched
    assert_eq!(lock.read().unwrap().unwrap().owner_pid, 1);
}

/// WHY: two launches racing for an unlocked path must resolve to one
/// winner; the loser observes the winner's record and defers
/// BREAKS: double start of the daemon under launch races
#[test]
fn mutual_exclusion_between_concurrent_acquirers() {
    let temp = TempDir::new().unwrap();
    let base = temp.path().join("torrentd");

    let started = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(2));

    // Both guards use real process control: the loser sees the winner's
    // record naming this (live) process and the identical fingerprint,
    // which is the normal already-running outcome.
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let base = base.clone();
            let started = started.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let guard = InstanceGuard::new(&base);
                barrier.wait();
                guard.ensure_single_instance(&fingerprint(), || {
                    started.fetch_add(1, Ordering::SeqCst);
                    // Hold the lock long enough for the loser to inspect it
                    thread::sleep(std::time::Duration::from_millis(300));
                })
            })
        })
        .collect();

    let outcomes: Vec<GuardOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(started.load(Ordering::SeqCst), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| **o == GuardOutcome::Started)
            .count(),
        1
    );
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| **o == GuardOutcome::AlreadyRunning)
            .count(),
        1
    );
}

/// WHY: the mismatch test compares name and search endpoint, not the
/// service port; the port may change across restarts of the same
/// logical instance
/// BREAKS: restart loops where every relaunch kills a healthy daemon
/// that merely picked a new port
#[test]
fn fingerprint_comparison_ignores_service_port_by_default() {
    let held = fingerprint();

    let mut new_port = held.clone();
    new_port.service_port = 47000;
    assert!(held.matches(&new_port, false));

    // The knob exists for deployments that pin the port
    assert!(!held.matches(&new_port, true));

    // Identity fields always participate
    let mut renamed = held.clone();
    renamed.name = "other".to_string();
    assert!(!held.matches(&renamed, false));

    let mut moved = held.clone();
    moved.search_host = "elsewhere".to_string();
    assert!(!held.matches(&moved, false));

    let mut rebound = held.clone();
    rebound.search_port = 9091;
    assert!(!held.matches(&rebound, false));
}

/// WHY: a released path carries no trace of the previous holder
/// BREAKS: phantom "stale lock" takeovers signalling recycled pids
#[test]
fn release_leaves_nothing_behind() {
    let temp = TempDir::new().unwrap();
    let lock = LockFile::new(temp.path().join("torrentd"));

    lock.acquire(&LockRecord::new(1, fingerprint())).unwrap();
    lock.release().unwrap();

    assert!(!lock.is_locked());
    assert!(lock.read().unwrap().is_none());
    assert_eq!(lock.age_seconds(), 0.0);
}

/// WHY: break_lock is the takeover path and must tolerate the owner
/// having released (or died and been cleaned up) in between
#[test]
fn break_lock_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let lock = LockFile::new(temp.path().join("torrentd"));

    lock.break_lock();
    lock.acquire(&LockRecord::new(1, fingerprint())).unwrap();
    lock.break_lock();
    lock.break_lock();

    assert!(!lock.is_locked());
}

/// WHY: the record must carry the holder pid and the full fingerprint;
/// staleness decisions read both back from disk
#[test]
fn record_round_trips_owner_and_fingerprint() {
    let temp = TempDir::new().unwrap();
    let lock = LockFile::new(temp.path().join("torrentd"));

    let record = LockRecord::new(4000, fingerprint());
    lock.acquire(&record).unwrap();

    let loaded = lock.read().unwrap().unwrap();
    assert_eq!(loaded.owner_pid, 4000);
    assert_eq!(loaded.fingerprint, fingerprint());
    assert!(!loaded.acquired_at.is_empty());
}

/// WHY: the guard contract never fails; even an unusable lock file
/// resolves toward running the callback exactly once
#[test]
fn unusable_lock_never_blocks_startup() {
    let temp = TempDir::new().unwrap();
    let base = temp.path().join("torrentd");
    let lock = LockFile::new(&base);

    std::fs::write(lock.record_path(), "\0\0garbage\0").unwrap();

    let guard = InstanceGuard::new(&base);
    let ran = AtomicUsize::new(0);
    let outcome = guard.ensure_single_instance(&fingerprint(), || {
        ran.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(outcome, GuardOutcome::Started);
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}
