//! Engine settings passed explicitly into each component.

use std::time::Duration;

/// Default lifetime of a grant.
pub const DEFAULT_GRANT_DURATION_HOURS: u32 = 2;

/// Default pause between attempts after a policy conflict.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Settings shared by the authorizer and the grant manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Requestors and approvers must have an address in this domain.
    pub trusted_domain: String,
    /// How long a granted binding stays active.
    pub grant_duration_hours: u32,
    /// Fixed backoff after a conflict from the IAM backend.
    pub retry_interval: Duration,
}

impl EngineConfig {
    /// Settings for `trusted_domain` with default duration and backoff.
    #[must_use]
    pub fn new(trusted_domain: impl Into<String>) -> Self {
        Self {
            trusted_domain: trusted_domain.into(),
            grant_duration_hours: DEFAULT_GRANT_DURATION_HOURS,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }

    /// Set the grant duration.
    #[must_use]
    pub fn with_grant_duration_hours(mut self, hours: u32) -> Self {
        self.grant_duration_hours = hours;
        self
    }

    /// Set the conflict backoff.
    #[must_use]
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// The grant duration as a signed duration for timestamp arithmetic.
    #[must_use]
    pub fn grant_duration(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.grant_duration_hours))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::new("example.com");
        assert_eq!(config.trusted_domain, "example.com");
        assert_eq!(config.grant_duration_hours, 2);
        assert_eq!(config.retry_interval, Duration::from_secs(5));
        assert_eq!(config.grant_duration(), chrono::Duration::hours(2));
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::new("example.com")
            .with_grant_duration_hours(8)
            .with_retry_interval(Duration::from_millis(10));
        assert_eq!(config.grant_duration_hours, 8);
        assert_eq!(config.retry_interval, Duration::from_millis(10));
    }
}
