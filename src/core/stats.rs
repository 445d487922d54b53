use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use crate::core::types::TenantKey;

/// Point-in-time statistics of one active shard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardStats {
    pub tenant: TenantKey,
    pub generation: u64,
    pub activated_at: DateTime<Utc>,
    pub restored_from_snapshot: bool,

    // Index metrics
    pub document_count: usize,
    pub term_count: usize,

    // Traffic metrics
    pub batches_applied: u64,
    pub searches_executed: u64,
    pub searches_cancelled: u64,

    // Durability
    pub dirty: bool,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub consecutive_save_failures: u32,
    pub last_save_error: Option<String>,
    pub load_warning: Option<String>,   // Set when activation fell back to an empty index

    pub health: HealthStatus,
}

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    /// Serving always continues from memory; only durability is graded.
    pub fn assess(consecutive_save_failures: u32, max_attempts: u32, load_warning: Option<&str>) -> Self {
        if consecutive_save_failures >= max_attempts.max(1) {
            HealthStatus::Unhealthy(format!(
                "{} consecutive snapshot saves failed",
                consecutive_save_failures
            ))
        } else if consecutive_save_failures > 0 {
            HealthStatus::Degraded("snapshot saves are failing, retrying with backoff".to_string())
        } else if let Some(warning) = load_warning {
            HealthStatus::Degraded(format!("started empty after snapshot load failure: {}", warning))
        } else {
            HealthStatus::Healthy
        }
    }
}
