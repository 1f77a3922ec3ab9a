//! Cache configuration.

use std::fmt;
use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

pub(crate) const DEFAULT_MEMORY_CAPACITY: usize = 10_000;
pub(crate) const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 250;
pub(crate) const DEFAULT_AUTO_CONSUME_INTERVAL_MS: u64 = 1000;
pub(crate) const DEFAULT_CONSUME_BATCH_LIMIT: usize = 100;
pub(crate) const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub(crate) const DEFAULT_QUEUE_LIMIT: usize = 10_000;
pub(crate) const DEFAULT_DEAD_LETTER_CAPACITY: usize = 1000;
pub(crate) const DEFAULT_REDRIVE_SCHEDULE: &str = "0 */5 * * * *";

/// Which key/value backend holds cached entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
}

impl CacheBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheBackend::Memory => "memory",
            CacheBackend::Redis => "redis",
        }
    }
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When false reads go straight to the store and no events are published.
    pub enabled: bool,
    pub backend: CacheBackend,
    /// Required when `backend` is `redis`.
    pub redis_url: Option<String>,
    /// Maximum entries held by the in-process backend.
    pub memory_capacity: usize,
    /// Deadline for every cache backend call.
    pub operation_timeout_ms: u64,
    /// Populate on read-miss in a spawned task instead of before returning.
    pub background_populate: bool,
    /// Apply invalidations on the write path right after the commit.
    pub invalidate_inline: bool,
    /// Auto-consume interval (ms) for events left on the queue.
    pub auto_consume_interval_ms: u64,
    /// Maximum events per consumption batch.
    pub consume_batch_limit: usize,
    /// Attempts before an event is moved to the dead-letter log.
    pub max_attempts: u32,
    /// Pending events before the queue collapses into a flush.
    pub queue_limit: usize,
    pub dead_letter_capacity: usize,
    pub warm_on_startup: bool,
    /// Cron expression (with seconds) for the dead-letter redrive job.
    pub redrive_schedule: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::Memory,
            redis_url: None,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
            background_populate: false,
            invalidate_inline: true,
            auto_consume_interval_ms: DEFAULT_AUTO_CONSUME_INTERVAL_MS,
            consume_batch_limit: DEFAULT_CONSUME_BATCH_LIMIT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            queue_limit: DEFAULT_QUEUE_LIMIT,
            dead_letter_capacity: DEFAULT_DEAD_LETTER_CAPACITY,
            warm_on_startup: false,
            redrive_schedule: DEFAULT_REDRIVE_SCHEDULE.to_string(),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            backend: settings.backend,
            redis_url: settings.redis_url.clone(),
            memory_capacity: settings.memory_capacity,
            operation_timeout_ms: settings.operation_timeout_ms,
            background_populate: settings.background_populate,
            invalidate_inline: settings.invalidate_inline,
            auto_consume_interval_ms: settings.auto_consume_interval_ms,
            consume_batch_limit: settings.consume_batch_limit,
            max_attempts: settings.max_attempts,
            queue_limit: settings.queue_limit,
            dead_letter_capacity: settings.dead_letter_capacity,
            warm_on_startup: settings.warm_on_startup,
            redrive_schedule: settings.redrive_schedule.clone(),
        }
    }
}

impl CacheConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Memory capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn memory_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms.max(1))
    }

    pub fn auto_consume_interval(&self) -> Duration {
        Duration::from_millis(self.auto_consume_interval_ms.max(1))
    }

    pub fn max_attempts_non_zero(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.backend, CacheBackend::Memory);
        assert!(config.redis_url.is_none());
        assert_eq!(config.memory_capacity, 10_000);
        assert_eq!(config.operation_timeout_ms, 250);
        assert!(!config.background_populate);
        assert!(config.invalidate_inline);
        assert_eq!(config.consume_batch_limit, 100);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.redrive_schedule, "0 */5 * * * *");
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            memory_capacity: 0,
            max_attempts: 0,
            operation_timeout_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.memory_capacity_non_zero().get(), 1);
        assert_eq!(config.max_attempts_non_zero(), 1);
        assert_eq!(config.operation_timeout(), Duration::from_millis(1));
    }

    #[test]
    fn backend_deserializes_lowercase() {
        let backend: CacheBackend = serde_json::from_str("\"redis\"").expect("backend");
        assert_eq!(backend, CacheBackend::Redis);
        assert_eq!(backend.to_string(), "redis");
    }

    #[test]
    fn is_disabled_when_off() {
        let config = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(!config.is_enabled());
    }
}
