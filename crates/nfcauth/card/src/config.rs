//! Configuration for the emulated card

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use figment::{Figment, providers::Serialized};
use serde::{Deserialize, Serialize};

use crate::{
    Result, pending::FilePendingStore, registry::JsonFileRegistry, signer::SoftwareSigner,
};

/// Timing of the registration confirmation hand-off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Interval between checks for the reader collecting the registration
    pub poll_interval_ms: u64,
    /// Bound on the wait for the reader
    pub timeout_secs: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            timeout_secs: 120,
        }
    }
}

impl ConfirmationConfig {
    /// Poll interval as a duration
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Timeout as a duration
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration options for the emulated card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    /// Directory holding the key, the reader registry and the pending
    /// registration
    pub data_dir: PathBuf,
    /// Registration confirmation timing
    pub confirmation: ConfirmationConfig,
}

impl Default for CardConfig {
    fn default() -> Self {
        let data_dir = std::env::var_os("HOME")
            .map_or_else(|| PathBuf::from(".nfcauth"), |home| PathBuf::from(home).join(".nfcauth"));
        Self {
            data_dir,
            confirmation: ConfirmationConfig::default(),
        }
    }
}

impl CardConfig {
    /// Table holding these options in a configuration file
    pub const KEY: &'static str = "card";

    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract the `[card]` table from `figment`, over the defaults
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        Ok(Figment::from(Serialized::default(Self::KEY, Self::default()))
            .merge(figment.clone())
            .extract_inner(Self::KEY)?)
    }

    /// Set the data directory
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Set the confirmation timing
    pub const fn with_confirmation(mut self, confirmation: ConfirmationConfig) -> Self {
        self.confirmation = confirmation;
        self
    }

    /// Create the data directory if needed
    pub fn ensure_data_dir(&self) -> Result<&Path> {
        fs::create_dir_all(&self.data_dir)?;
        Ok(&self.data_dir)
    }

    /// Where the card key is stored
    pub fn key_path(&self) -> PathBuf {
        self.data_dir.join(SoftwareSigner::KEY_FILE_NAME)
    }

    /// Where the reader registry is stored
    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join(JsonFileRegistry::FILE_NAME)
    }

    /// Where the pending registration is stored
    pub fn pending_path(&self) -> PathBuf {
        self.data_dir.join(FilePendingStore::FILE_NAME)
    }
}
