//! Orchestration error type

use crate::activity::ActivityKind;

/// Errors raised while running orchestration logic
///
/// Two variants are *control* errors rather than failures:
/// [`Suspended`](Self::Suspended) marks the point where a turn stops and hands a
/// pending action to the host, and [`NonDeterminism`](Self::NonDeterminism)
/// means the recorded history no longer matches the code. Neither may be caught
/// and swallowed by step or scenario code; see [`is_control`](Self::is_control).
///
/// All other variants are step failures. They are escalated (telemetry) at the
/// point of detection before being returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrchestrationError {
    /// The turn reached a suspension point with no recorded result
    #[error("orchestration suspended awaiting host")]
    Suspended,

    /// Recorded history does not match the action requested at this position
    #[error("non-deterministic replay at history index {index}: {message}")]
    NonDeterminism { index: usize, message: String },

    /// The host recorded a failure for an activity (or a fan-out batch)
    #[error("activity {activity} failed: {message}")]
    ActivityFailed {
        activity: ActivityKind,
        message: String,
    },

    /// A web activity returned a status code outside `[200, 300)`
    #[error("activity {activity} returned unsuccessful status code {status_code}")]
    UnsuccessfulStatusCode {
        activity: ActivityKind,
        status_code: u16,
    },

    /// The scan API did not accept the scan request
    #[error("scan request for {url} was rejected: {message}")]
    ScanRequestRejected { url: String, message: String },

    /// The status payload for a scan carried a service-level error
    #[error("scan {scan_id} status reported an error: {message}")]
    ScanStatusError { scan_id: String, message: String },

    /// A wait condition reported a terminal failure
    #[error("{activity_label} failed for scan {scan_id} after {elapsed_seconds}s")]
    WaitFailed {
        activity_label: String,
        scan_id: String,
        elapsed_seconds: i64,
    },

    /// A wait loop ran out of time without completing
    #[error("{activity_label} timed out for scan {scan_id} after {elapsed_seconds}s")]
    WaitTimedOut {
        activity_label: String,
        scan_id: String,
        elapsed_seconds: i64,
    },

    /// A web activity succeeded but its body did not have the expected shape
    #[error("{activity_label} returned an unexpected response: {message}")]
    UnexpectedResponse {
        activity_label: String,
        message: String,
    },

    /// The scan was accepted but its submission state is not valid
    #[error("scan {scan_id} submission state is invalid: {message}")]
    ScanSubmissionInvalid { scan_id: String, message: String },

    /// The notification wait succeeded without a notification block
    #[error("scan {scan_id} completed without notification details")]
    MissingNotification { scan_id: String },

    /// Wait parameters that would never make progress
    #[error("invalid wait for {activity_label}: {message}")]
    InvalidWait {
        activity_label: String,
        message: String,
    },

    /// A payload or result did not have the expected shape
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl OrchestrationError {
    /// Whether this error controls the replay itself and must be propagated
    pub fn is_control(&self) -> bool {
        matches!(self, Self::Suspended | Self::NonDeterminism { .. })
    }
}

impl From<serde_json::Error> for OrchestrationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
