//! Parser for torrentd settings files (YAML format)
//!
//! Format:
//! ```yaml
//! daemon:
//!   name: torrentd
//!   port: 0
//! search:
//!   host: 127.0.0.1
//!   port: 9010
//! storage:
//!   download_dir: downloads
//!   keep_files: false
//! ```
//!
//! Merge rule: a key present in the file overrides the built-in
//! default; a missing key falls back per-field. A missing or unreadable
//! file falls back to the full defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::errors::{Result, TorrentdError};
use crate::guard::Fingerprint;

/// Settings file name inside the config directory
pub const SETTINGS_FILE: &str = "settings.yaml";

/// Typed settings document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Settings {
    pub daemon: DaemonSettings,
    pub search: SearchSettings,
    pub storage: StorageSettings,
}

/// Daemon identity and service endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonSettings {
    /// Instance name recorded in the lock fingerprint
    pub name: String,
    /// Service port; 0 means pick a free port at startup
    pub port: u16,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        DaemonSettings {
            name: "torrentd".to_string(),
            port: 0,
        }
    }
}

/// Search endpoint the daemon queries for torrents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchSettings {
    pub host: String,
    pub port: u16,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            host: "127.0.0.1".to_string(),
            port: 9010,
        }
    }
}

/// Download storage behavior
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageSettings {
    pub download_dir: PathBuf,
    /// Keep downloaded files after the daemon exits
    pub keep_files: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            download_dir: PathBuf::from("downloads"),
            keep_files: false,
        }
    }
}

impl Settings {
    /// Load settings from the specified path
    ///
    /// # Arguments
    /// * `path` - Path to a settings YAML file
    ///
    /// # Example
    /// ```no_run
    /// use torrentd_core::Settings;
    ///
    /// let settings = Settings::load("settings.yaml").unwrap();
    /// assert!(!settings.daemon.name.is_empty());
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(TorrentdError::FileNotFound(
                path.to_string_lossy().to_string(),
            ));
        }

        let content = fs::read_to_string(path)?;

        let settings: Settings = serde_yaml::from_str(&content)
            .map_err(|e| TorrentdError::ParseError(format!("Invalid settings YAML: {}", e)))?;

        settings.validate()?;

        Ok(settings)
    }

    /// Load settings, falling back to the defaults on any failure
    ///
    /// The fallback is logged, never surfaced; the daemon is meant to
    /// come up with its built-in configuration when the file is absent.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(
                    path = %path.as_ref().display(),
                    "Falling back to default settings: {}", e
                );
                Settings::default()
            }
        }
    }

    /// Validate the settings document
    ///
    /// Ensures:
    /// - daemon.name is non-empty
    /// - search.host is non-empty
    /// - search.port is non-zero
    pub fn validate(&self) -> Result<()> {
        if self.daemon.name.is_empty() {
            return Err(TorrentdError::ValidationError(
                "daemon.name cannot be empty".to_string(),
            ));
        }

        if self.search.host.is_empty() {
            return Err(TorrentdError::ValidationError(
                "search.host cannot be empty".to_string(),
            ));
        }

        if self.search.port == 0 {
            return Err(TorrentdError::ValidationError(
                "search.port cannot be 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Save settings to file
    ///
    /// # Arguments
    /// * `path` - Path where to save the settings YAML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path.as_ref(), yaml)?;
        Ok(())
    }

    /// Create the config directory and seed the default settings file
    ///
    /// Returns the path of the settings file inside `dir`. An existing
    /// file is left untouched.
    pub fn init_config_dir<P: AsRef<Path>>(dir: P) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let settings_path = dir.join(SETTINGS_FILE);
        if !settings_path.exists() {
            Settings::default().save(&settings_path)?;
        }

        Ok(settings_path)
    }

    /// Assemble the instance fingerprint for these settings
    ///
    /// # Arguments
    /// * `service_port` - The resolved service port (settings value or a
    ///   freshly picked free port when the settings say 0)
    pub fn fingerprint(&self, service_port: u16) -> Fingerprint {
        Fingerprint::new(
            &self.daemon.name,
            &self.search.host,
            self.search.port,
            service_port,
        )
    }
}

/// Default config directory (`$HOME/.torrentd`)
pub fn default_config_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".torrentd")
}
