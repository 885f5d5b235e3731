//! Dispatcher configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default elicitation deadline in milliseconds (five minutes).
pub const DEFAULT_ELICITATION_TIMEOUT_MS: u64 = 300_000;

/// Default number of blocking workers.
pub const DEFAULT_BLOCKING_WORKERS: usize = 4;

/// Default maximum inbound line length (16 MiB).
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

/// Runtime knobs for the dispatcher and connection runtime.
///
/// Deserializes from a partial table; missing keys take their defaults.
///
/// ```rust
/// use dispatchkit_server::DispatcherConfig;
///
/// let config: DispatcherConfig =
///     serde_json::from_str(r#"{ "elicitation_timeout_ms": 30000 }"#).unwrap();
/// assert_eq!(config.elicitation_timeout().as_secs(), 30);
/// assert_eq!(config.blocking_workers, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Milliseconds an elicitation may await a response before resolving as
    /// cancelled.
    pub elicitation_timeout_ms: u64,
    /// Maximum concurrent blocking tasks. Values below 1 are treated as 1.
    pub blocking_workers: usize,
    /// Longest inbound line the connection runtime accepts.
    pub max_message_bytes: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            elicitation_timeout_ms: DEFAULT_ELICITATION_TIMEOUT_MS,
            blocking_workers: DEFAULT_BLOCKING_WORKERS,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

impl DispatcherConfig {
    /// Set the elicitation deadline. Sub-millisecond remainders round up.
    #[must_use]
    pub fn with_elicitation_timeout(mut self, timeout: Duration) -> Self {
        self.elicitation_timeout_ms =
            u64::try_from(timeout.as_micros().div_ceil(1000)).unwrap_or(u64::MAX);
        self
    }

    /// Set the blocking pool size.
    #[must_use]
    pub const fn with_blocking_workers(mut self, workers: usize) -> Self {
        self.blocking_workers = workers;
        self
    }

    /// Set the inbound line limit.
    #[must_use]
    pub const fn with_max_message_bytes(mut self, bytes: usize) -> Self {
        self.max_message_bytes = bytes;
        self
    }

    /// The elicitation deadline.
    #[must_use]
    pub const fn elicitation_timeout(&self) -> Duration {
        Duration::from_millis(self.elicitation_timeout_ms)
    }

    /// The effective blocking pool size.
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        self.blocking_workers.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DispatcherConfig::default();
        assert_eq!(config.elicitation_timeout(), Duration::from_secs(300));
        assert_eq!(config.max_message_bytes, 16 * 1024 * 1024);
    }

    #[test]
    fn test_sub_second_timeout_kept() {
        let config = DispatcherConfig::default().with_elicitation_timeout(Duration::from_millis(500));
        assert_eq!(config.elicitation_timeout(), Duration::from_millis(500));

        let config = DispatcherConfig::default().with_elicitation_timeout(Duration::from_micros(1));
        assert_eq!(config.elicitation_timeout(), Duration::from_millis(1));
    }

    #[test]
    fn test_zero_workers_clamped() {
        let config = DispatcherConfig::default().with_blocking_workers(0);
        assert_eq!(config.effective_workers(), 1);
    }
}
