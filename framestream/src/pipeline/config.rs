//! Pipeline configuration.

use std::time::Duration;

use super::channel::DEFAULT_CHANNEL_CAPACITY;
use crate::progress::DEFAULT_POLL_INTERVAL;

/// Rows written between periodic flushes.
pub const DEFAULT_FLUSH_EVERY: u64 = 1000;

/// Absolute deadline for one pipeline run (30 minutes).
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30 * 60);

/// Shortest deadline accepted; a zero deadline would fail every run.
pub const MIN_DEADLINE: Duration = Duration::from_secs(1);

/// Tuning knobs for a [`ReportPipeline`](super::ReportPipeline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Measurement channel capacity.
    pub channel_capacity: usize,

    /// Flush the report every this many rows.
    pub flush_every: u64,

    /// How often the progress reporter polls.
    pub poll_interval: Duration,

    /// Absolute deadline shared by producer, writer and reporter.
    pub deadline: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            flush_every: DEFAULT_FLUSH_EVERY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            deadline: DEFAULT_DEADLINE,
        }
    }
}

impl PipelineConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the channel capacity (minimum 1).
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Set the flush cadence in rows (minimum 1).
    pub fn with_flush_every(mut self, rows: u64) -> Self {
        self.flush_every = rows.max(1);
        self
    }

    /// Set the progress polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Set the absolute deadline (minimum [`MIN_DEADLINE`]).
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline.max(MIN_DEADLINE);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.channel_capacity, 100);
        assert_eq!(config.flush_every, 1000);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.deadline, Duration::from_secs(1800));
    }

    #[test]
    fn test_builder_pattern() {
        let config = PipelineConfig::new()
            .with_channel_capacity(8)
            .with_flush_every(10)
            .with_poll_interval(Duration::from_millis(100))
            .with_deadline(Duration::from_secs(60));

        assert_eq!(config.channel_capacity, 8);
        assert_eq!(config.flush_every, 10);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.deadline, Duration::from_secs(60));
    }

    #[test]
    fn test_builder_clamps_zero_values() {
        let config = PipelineConfig::new()
            .with_channel_capacity(0)
            .with_flush_every(0)
            .with_poll_interval(Duration::ZERO)
            .with_deadline(Duration::ZERO);

        assert_eq!(config.channel_capacity, 1);
        assert_eq!(config.flush_every, 1);
        assert_eq!(config.poll_interval, Duration::from_millis(1));
        assert_eq!(config.deadline, MIN_DEADLINE);
    }
}
