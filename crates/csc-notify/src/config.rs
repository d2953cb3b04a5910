//! Dispatcher configuration.
//!
//! Defaults: retries after 10 s, 60 s and 300 s; deactivation after three
//! consecutive exhausted cycles; at most eight concurrent deliveries per
//! event; 30 s per request. Tests construct alternate schedules directly.

use std::time::Duration;

use crate::error::ConfigError;

/// Configuration for [`NotificationDispatcher`](crate::NotificationDispatcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Delay before each retry. The number of entries is the number of retries.
    pub retry_delays: Vec<Duration>,
    /// Consecutive exhausted cycles after which a subscription is deactivated.
    pub unhealthy_threshold: u32,
    /// Upper bound on concurrent deliveries for one event.
    pub max_concurrency: usize,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            retry_delays: vec![
                Duration::from_secs(10),
                Duration::from_secs(60),
                Duration::from_secs(300),
            ],
            unhealthy_threshold: 3,
            max_concurrency: 8,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl DispatcherConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CSC_WEBHOOK_RETRY_DELAYS_SECS` comma-separated seconds (default: `10,60,300`)
    /// - `CSC_WEBHOOK_UNHEALTHY_THRESHOLD` (default: 3)
    /// - `CSC_WEBHOOK_MAX_CONCURRENCY` (default: 8)
    /// - `CSC_WEBHOOK_TIMEOUT_SECS` (default: 30)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unparseable or zero values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("CSC_WEBHOOK_RETRY_DELAYS_SECS") {
            config.retry_delays = parse_delays(&raw)?;
        }
        if let Ok(raw) = std::env::var("CSC_WEBHOOK_UNHEALTHY_THRESHOLD") {
            config.unhealthy_threshold = parse_positive("CSC_WEBHOOK_UNHEALTHY_THRESHOLD", &raw)?;
        }
        if let Ok(raw) = std::env::var("CSC_WEBHOOK_MAX_CONCURRENCY") {
            config.max_concurrency = parse_positive("CSC_WEBHOOK_MAX_CONCURRENCY", &raw)?;
        }
        if let Ok(raw) = std::env::var("CSC_WEBHOOK_TIMEOUT_SECS") {
            let secs: u64 = parse_positive("CSC_WEBHOOK_TIMEOUT_SECS", &raw)?;
            config.request_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Total attempts per delivery cycle: the initial one plus every retry.
    pub fn attempts_per_cycle(&self) -> usize {
        self.retry_delays.len() + 1
    }
}

/// Parse a comma-separated list of whole seconds. An empty string means no retries.
pub fn parse_delays(raw: &str) -> Result<Vec<Duration>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| ConfigError::InvalidValue {
                    var: "CSC_WEBHOOK_RETRY_DELAYS_SECS",
                    value: raw.to_string(),
                    reason: e.to_string(),
                })
        })
        .collect()
}

fn parse_positive<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialEq + Default,
    T::Err: std::fmt::Display,
{
    let invalid = |reason: String| ConfigError::InvalidValue {
        var,
        value: raw.to_string(),
        reason,
    };
    let value = raw.trim().parse::<T>().map_err(|e| invalid(e.to_string()))?;
    if value == T::default() {
        return Err(invalid("must be greater than zero".to_string()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_retry_schedule() {
        let config = DispatcherConfig::default();
        assert_eq!(
            config.retry_delays,
            vec![
                Duration::from_secs(10),
                Duration::from_secs(60),
                Duration::from_secs(300)
            ]
        );
        assert_eq!(config.attempts_per_cycle(), 4);
        assert_eq!(config.unhealthy_threshold, 3);
    }

    #[test]
    fn delays_parse_from_csv() {
        assert_eq!(
            parse_delays("1, 2,3").unwrap(),
            vec![Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(3)]
        );
        assert!(parse_delays("").unwrap().is_empty());
        assert!(parse_delays("10,soon").is_err());
    }

    #[test]
    fn zero_is_rejected() {
        assert!(parse_positive::<u32>("CSC_WEBHOOK_UNHEALTHY_THRESHOLD", "0").is_err());
        assert_eq!(parse_positive::<usize>("CSC_WEBHOOK_MAX_CONCURRENCY", " 4 ").unwrap(), 4);
    }
}
