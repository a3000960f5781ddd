//! Event source configuration.

use std::time::Duration;

/// Configuration for an [`EventSource`](crate::EventSource).
///
/// Uses the same chainable builder style as the request template. Every field
/// is optional; unset values fall back to the built-in behaviour.
#[derive(Clone, Debug, Default)]
pub struct EventSourceConfig {
    /// Delay between reconnection attempts until the server sends a `retry`
    /// directive. Falls back to one second when unset.
    pub default_retry_interval: Option<Duration>,
    /// Upper bound for a single connection attempt. An attempt that times out
    /// is retried like any other transport failure.
    pub connect_timeout: Option<Duration>,
}

impl EventSourceConfig {
    /// Create a configuration with all defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default reconnection delay.
    #[must_use]
    pub fn default_retry_interval(mut self, interval: Duration) -> Self {
        self.default_retry_interval = Some(interval);
        self
    }

    /// Set the per-attempt connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error message string if any field has an invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_retry_interval.is_some_and(|d| d.is_zero()) {
            return Err("Default retry interval must be > 0".to_string());
        }
        if self.connect_timeout.is_some_and(|d| d.is_zero()) {
            return Err("Connect timeout must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EventSourceConfig::default();
        assert!(config.default_retry_interval.is_none());
        assert!(config.connect_timeout.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = EventSourceConfig::new()
            .default_retry_interval(Duration::from_millis(100))
            .connect_timeout(Duration::from_secs(5));

        assert_eq!(
            config.default_retry_interval,
            Some(Duration::from_millis(100))
        );
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(5)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_retry_interval() {
        let config = EventSourceConfig::new().default_retry_interval(Duration::ZERO);
        assert_eq!(
            config.validate().expect_err("should fail"),
            "Default retry interval must be > 0"
        );
    }

    #[test]
    fn test_validation_zero_connect_timeout() {
        let config = EventSourceConfig::new().connect_timeout(Duration::ZERO);
        assert_eq!(
            config.validate().expect_err("should fail"),
            "Connect timeout must be > 0"
        );
    }
}
