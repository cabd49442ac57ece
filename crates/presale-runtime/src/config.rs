//! Runtime configuration.

use std::time::Duration;

use presale_core::RelaySettings;

/// Timing and retry knobs for one task run.
///
/// The overall timeout, polling interval, per-attempt download timeout and
/// download attempt count are independent of each other.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Time between status checks.
    pub poll_interval: Duration,
    /// Wall-clock budget for the poll loop.
    pub task_timeout: Duration,
    /// Bound on each individual download attempt.
    pub download_timeout: Duration,
    /// Download attempts per file.
    pub download_max_attempts: u32,
    /// First backoff delay; attempt `i` waits `backoff_base * 2^i`.
    pub backoff_base: Duration,
    /// Bound on each task API request.
    pub request_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            task_timeout: Duration::from_secs(1500),
            download_timeout: Duration::from_secs(300),
            download_max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl RuntimeConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the overall task timeout.
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// Sets the per-attempt download timeout.
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    /// Sets the number of download attempts (at least one).
    pub fn with_download_max_attempts(mut self, attempts: u32) -> Self {
        self.download_max_attempts = attempts.max(1);
        self
    }

    /// Sets the first backoff delay.
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Sets the task API request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl From<&RelaySettings> for RuntimeConfig {
    fn from(settings: &RelaySettings) -> Self {
        Self::default()
            .with_poll_interval(settings.polling_interval)
            .with_task_timeout(settings.task_timeout)
            .with_download_timeout(settings.download_timeout)
            .with_download_max_attempts(settings.download_max_attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();

        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.task_timeout, Duration::from_secs(1500));
        assert_eq!(config.download_timeout, Duration::from_secs(300));
        assert_eq!(config.download_max_attempts, 3);
        assert_eq!(config.backoff_base, Duration::from_secs(1));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_config_builder() {
        let config = RuntimeConfig::new()
            .with_poll_interval(Duration::from_millis(100))
            .with_task_timeout(Duration::from_secs(5))
            .with_download_timeout(Duration::from_secs(7))
            .with_download_max_attempts(0)
            .with_backoff_base(Duration::from_millis(10))
            .with_request_timeout(Duration::from_secs(2));

        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.task_timeout, Duration::from_secs(5));
        assert_eq!(config.download_timeout, Duration::from_secs(7));
        assert_eq!(config.download_max_attempts, 1);
        assert_eq!(config.backoff_base, Duration::from_millis(10));
        assert_eq!(config.request_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_from_settings() {
        let settings = RelaySettings::from_lookup(|key| match key {
            "MANUS_API_KEY" => Some("k".into()),
            "MANUS_PROJECT_ID" => Some("p".into()),
            "TASK_TIMEOUT" => Some("60".into()),
            "POLLING_INTERVAL" => Some("3".into()),
            "DOWNLOAD_MAX_ATTEMPTS" => Some("4".into()),
            _ => None,
        })
        .unwrap();

        let config = RuntimeConfig::from(&settings);
        assert_eq!(config.task_timeout, Duration::from_secs(60));
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.download_max_attempts, 4);
        assert_eq!(config.download_timeout, Duration::from_secs(300));
    }
}
