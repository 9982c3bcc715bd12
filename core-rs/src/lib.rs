//! # torrentd-core - OS helpers for the torrentd download daemon
//!
//! Operating-system plumbing for a torrent-downloading daemon: YAML
//! settings with fallback to defaults, free-port and interface
//! discovery, process liveness checks, and the piece everything else
//! leans on, single-instance supervision through a lock file that
//! records which configuration the running daemon serves.
//!
//! ## Core Principle
//!
//! **One lock path, one daemon**: a launch either becomes the sole
//! holder of the lock for its configuration fingerprint, or defers to
//! the live instance that already serves it. Stale and mismatched
//! holders are quit-signalled and replaced.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │        <lock path>.lock (record)       │
//! │   owner pid + configuration fingerprint│
//! └────────────────────────────────────────┘
//!            ▲                  ▲
//!            │                  │
//!     ┌──────┴───────┐   ┌──────┴───────┐
//!     │ holder       │   │ new launch   │
//!     │ (serving)    │   │ (inspecting) │
//!     └──────────────┘   └──────────────┘
//! ```

pub mod errors;
pub mod guard;
pub mod net;
pub mod process;
pub mod settings;

pub use errors::TorrentdError;
pub use guard::{Fingerprint, GuardOutcome, InstanceGuard, LockFile, LockRecord};
pub use net::{get_free_port, get_interface, is_port_free};
pub use process::{is_process_alive, ProcessControl, SystemProcessControl};
pub use settings::{
    default_config_dir, DaemonSettings, SearchSettings, Settings, StorageSettings,
};

/// Crate version
pub const VERSION: &str = "0.1.0";

/// Default lock file base path; the record lives in the `.lock` companion
pub const DEFAULT_LOCK_PATH: &str = "/tmp/torrentd";
