//! Scan API data model as seen by the orchestrator
//!
//! These values are produced by the external scan service and are read-only
//! here. Every sub-field is optional so that a partially populated status
//! keeps a wait loop polling instead of failing to decode.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a scan run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RunState {
    Pending,
    Accepted,
    Queued,
    Running,
    Retrying,
    Report,
    Completed,
    Failed,
    Unscannable,
    #[serde(other)]
    Unknown,
}

/// Accessibility verdict of a finished scan
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ScanState {
    Pending,
    Pass,
    Fail,
    #[serde(other)]
    Unknown,
}

/// Delivery state of the scan-completion notification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NotificationState {
    Pending,
    Queued,
    QueueFailed,
    Sending,
    Sent,
    SendFailed,
    #[serde(other)]
    Unknown,
}

/// Error reported by the scan service
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_id: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ServiceError {
    /// Best available description of the error
    pub fn describe(&self) -> String {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => format!("{code}: {message}"),
            (None, Some(message)) => message.clone(),
            (Some(code), None) => code.clone(),
            (None, None) => "unspecified service error".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<RunState>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanResultInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ScanState>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_count: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<NotificationState>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_notify_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_code: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceError>,
}

/// A generated report attached to a scan
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<serde_json::Value>,
}

/// Polled status of a scan
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<RunInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_result: Option<ScanResultInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep_scan_result: Option<Vec<serde_json::Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reports: Option<Vec<ScanReport>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceError>,
}

impl ScanStatus {
    pub fn run_state(&self) -> Option<RunState> {
        self.run.as_ref().and_then(|run| run.state)
    }

    pub fn scan_state(&self) -> Option<ScanState> {
        self.scan_result.as_ref().and_then(|result| result.state)
    }

    pub fn notification_state(&self) -> Option<NotificationState> {
        self.notification.as_ref().and_then(|n| n.state)
    }

    /// Id of the first generated report, if any
    pub fn first_report_id(&self) -> Option<&str> {
        self.reports
            .as_ref()
            .and_then(|reports| reports.first())
            .and_then(|report| report.report_id.as_deref())
    }
}

/// Caller-supplied options for a scan request
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequestOptions {
    /// Overrides the configured default priority
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,

    /// Crawl and scan the site, not just the page
    #[serde(default)]
    pub deep_scan: bool,

    /// Endpoint the scan service notifies on completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_notification_url: Option<String>,

    /// Pages to include in a deep scan
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub known_pages: Vec<String>,
}

impl ScanRequestOptions {
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_deep_scan(mut self, known_pages: Vec<String>) -> Self {
        self.deep_scan = true;
        self.known_pages = known_pages;
        self
    }

    pub fn with_notification_url(mut self, url: impl Into<String>) -> Self {
        self.scan_notification_url = Some(url.into());
        self
    }
}

/// One element of the scan-submission response array
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanSubmission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceError>,
}
