use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::core::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage_path: PathBuf,

    // Shard lifecycle
    pub idle_timeout_secs: u64,                 // Deactivate a shard after this much silence
    pub flush_interval_secs: u64,               // Periodic snapshot of dirty shards

    // Snapshot save retry
    pub save_retry_initial_backoff_ms: u64,
    pub save_retry_max_backoff_ms: u64,
    pub save_retry_max_attempts: u32,           // Only bounds flushes on deactivation

    // Query limits
    pub max_page_size: usize,

    // Indexing
    pub max_token_length: usize,
    pub parallel_analysis_threshold: usize,     // Batch size from which fields are analyzed on rayon
    pub applied_batch_history: usize,           // Batch ids remembered for redelivery detection
    pub compress_snapshots: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_path: PathBuf::from("./data"),
            idle_timeout_secs: 300,
            flush_interval_secs: 30,
            save_retry_initial_backoff_ms: 100,
            save_retry_max_backoff_ms: 30_000,
            save_retry_max_attempts: 5,
            max_page_size: 1000,
            max_token_length: 255,
            parallel_analysis_threshold: 256,
            applied_batch_history: 1024,
            compress_snapshots: true,
        }
    }
}

impl Config {
    /// Default configuration rooted at `storage_path`.
    pub fn in_dir(storage_path: impl Into<PathBuf>) -> Self {
        Config {
            storage_path: storage_path.into(),
            ..Config::default()
        }
    }

    /// Read a JSON config file; missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs.max(1))
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs.max(1))
    }

    /// Backoff before save attempt number `failures + 1`.
    pub fn save_backoff(&self, failures: u32) -> Duration {
        let factor = 1u64.checked_shl(failures.saturating_sub(1)).unwrap_or(u64::MAX);
        let millis = self
            .save_retry_initial_backoff_ms
            .saturating_mul(factor)
            .min(self.save_retry_max_backoff_ms);
        Duration::from_millis(millis)
    }
}
