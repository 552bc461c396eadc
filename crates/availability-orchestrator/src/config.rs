// Availability test configuration
//
// Loaded once before an orchestration starts and read-only afterwards.
// Values come from environment variables with built-in defaults.

use std::env;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Longest wait or poll interval `validate` accepts (30 days)
pub const MAX_WAIT_SECONDS: u64 = 30 * 24 * 60 * 60;

/// Errors from configuration validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A polling interval of zero would never advance logical time
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),

    /// A wait shorter than one poll interval never polls
    #[error("{name} ({wait}s) is shorter than the poll interval ({interval}s)")]
    WaitShorterThanInterval {
        name: &'static str,
        wait: u64,
        interval: u64,
    },

    /// A wait or interval too long to schedule a timer for
    #[error("{name} ({value}s) exceeds the maximum of {max}s")]
    WaitTooLong {
        name: &'static str,
        value: u64,
        max: u64,
    },

    /// A required value is empty
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Configuration for the availability test orchestration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AvailabilityTestConfig {
    /// Page submitted for scanning
    pub url_to_scan: String,

    /// Delay between status polls
    pub scan_wait_interval_in_seconds: u64,

    /// Upper bound for the base scan to finish
    pub max_scan_wait_time_in_seconds: u64,

    /// Upper bound for a deep scan to finish
    pub max_deep_scan_wait_time_in_seconds: u64,

    /// Upper bound for the completion notification to be delivered
    pub max_scan_completion_notification_wait_time_in_seconds: u64,

    /// Environment name passed to functional test groups
    pub environment_definition: String,

    /// Priority used when a scenario does not set one
    pub default_scan_priority: i32,

    /// Notification endpoint; enables the notification scenario
    pub scan_notify_api_endpoint: Option<String>,

    /// Pages added to deep scan requests
    pub deep_scan_known_pages: Vec<String>,

    /// Release identifier stamped on telemetry when the web API reports none
    pub release_id: Option<String>,
}

impl Default for AvailabilityTestConfig {
    fn default() -> Self {
        Self {
            url_to_scan: "https://www.bing.com".to_string(),
            scan_wait_interval_in_seconds: 30,
            max_scan_wait_time_in_seconds: 3600,
            max_deep_scan_wait_time_in_seconds: 7200,
            max_scan_completion_notification_wait_time_in_seconds: 7200,
            environment_definition: "canary".to_string(),
            default_scan_priority: 1000,
            scan_notify_api_endpoint: None,
            deep_scan_known_pages: Vec::new(),
            release_id: None,
        }
    }
}

impl AvailabilityTestConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `AVAILABILITY_URL_TO_SCAN`
    /// - `AVAILABILITY_SCAN_WAIT_INTERVAL_SECONDS`
    /// - `AVAILABILITY_MAX_SCAN_WAIT_SECONDS`
    /// - `AVAILABILITY_MAX_DEEP_SCAN_WAIT_SECONDS`
    /// - `AVAILABILITY_MAX_NOTIFICATION_WAIT_SECONDS`
    /// - `AVAILABILITY_ENVIRONMENT`
    /// - `AVAILABILITY_DEFAULT_SCAN_PRIORITY`
    /// - `AVAILABILITY_SCAN_NOTIFY_API_ENDPOINT`
    /// - `AVAILABILITY_DEEP_SCAN_KNOWN_PAGES` (comma separated)
    /// - `AVAILABILITY_RELEASE_ID`
    ///
    /// Unset or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            url_to_scan: env::var("AVAILABILITY_URL_TO_SCAN").unwrap_or(defaults.url_to_scan),
            scan_wait_interval_in_seconds: parse_env(
                "AVAILABILITY_SCAN_WAIT_INTERVAL_SECONDS",
                defaults.scan_wait_interval_in_seconds,
            ),
            max_scan_wait_time_in_seconds: parse_env(
                "AVAILABILITY_MAX_SCAN_WAIT_SECONDS",
                defaults.max_scan_wait_time_in_seconds,
            ),
            max_deep_scan_wait_time_in_seconds: parse_env(
                "AVAILABILITY_MAX_DEEP_SCAN_WAIT_SECONDS",
                defaults.max_deep_scan_wait_time_in_seconds,
            ),
            max_scan_completion_notification_wait_time_in_seconds: parse_env(
                "AVAILABILITY_MAX_NOTIFICATION_WAIT_SECONDS",
                defaults.max_scan_completion_notification_wait_time_in_seconds,
            ),
            environment_definition: env::var("AVAILABILITY_ENVIRONMENT")
                .unwrap_or(defaults.environment_definition),
            default_scan_priority: parse_env(
                "AVAILABILITY_DEFAULT_SCAN_PRIORITY",
                defaults.default_scan_priority,
            ),
            scan_notify_api_endpoint: env::var("AVAILABILITY_SCAN_NOTIFY_API_ENDPOINT")
                .ok()
                .filter(|v| !v.is_empty()),
            deep_scan_known_pages: env::var("AVAILABILITY_DEEP_SCAN_KNOWN_PAGES")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.deep_scan_known_pages),
            release_id: env::var("AVAILABILITY_RELEASE_ID")
                .ok()
                .filter(|v| !v.is_empty()),
        }
    }

    /// Check that every wait can make progress
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url_to_scan.trim().is_empty() {
            return Err(ConfigError::Empty("urlToScan"));
        }
        if self.scan_wait_interval_in_seconds == 0 {
            return Err(ConfigError::ZeroInterval("scanWaitIntervalInSeconds"));
        }

        let interval = self.scan_wait_interval_in_seconds;
        let waits = [
            ("scanWaitIntervalInSeconds", interval),
            ("maxScanWaitTimeInSeconds", self.max_scan_wait_time_in_seconds),
            (
                "maxDeepScanWaitTimeInSeconds",
                self.max_deep_scan_wait_time_in_seconds,
            ),
            (
                "maxScanCompletionNotificationWaitTimeInSeconds",
                self.max_scan_completion_notification_wait_time_in_seconds,
            ),
        ];
        for (name, wait) in waits {
            if wait > MAX_WAIT_SECONDS {
                return Err(ConfigError::WaitTooLong {
                    name,
                    value: wait,
                    max: MAX_WAIT_SECONDS,
                });
            }
            if wait < interval {
                return Err(ConfigError::WaitShorterThanInterval {
                    name,
                    wait,
                    interval,
                });
            }
        }

        Ok(())
    }

    pub fn scan_wait_interval(&self) -> Duration {
        seconds(self.scan_wait_interval_in_seconds)
    }

    pub fn max_scan_wait_time(&self) -> Duration {
        seconds(self.max_scan_wait_time_in_seconds)
    }

    pub fn max_deep_scan_wait_time(&self) -> Duration {
        seconds(self.max_deep_scan_wait_time_in_seconds)
    }

    pub fn max_scan_completion_notification_wait_time(&self) -> Duration {
        seconds(self.max_scan_completion_notification_wait_time_in_seconds)
    }
}

/// Configuration for the in-process replay host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Base URL of the activity executor
    pub activity_executor_url: String,

    /// Maximum turns per instance (for safety)
    pub max_turns: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            activity_executor_url: "http://localhost:7071".to_string(),
            max_turns: 10_000,
        }
    }
}

impl HostConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `AVAILABILITY_ACTIVITY_EXECUTOR_URL`
    /// - `AVAILABILITY_MAX_TURNS`
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            activity_executor_url: env::var("AVAILABILITY_ACTIVITY_EXECUTOR_URL")
                .unwrap_or(defaults.activity_executor_url),
            max_turns: parse_env("AVAILABILITY_MAX_TURNS", defaults.max_turns),
        }
    }
}

fn parse_env<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// Saturates instead of panicking; out-of-range waits are rejected by `validate`
// and by the wait loop itself.
fn seconds(value: u64) -> Duration {
    i64::try_from(value)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}
