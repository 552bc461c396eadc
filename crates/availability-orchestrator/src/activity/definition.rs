//! Activity kinds, requests and responses

use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// The closed set of activities the orchestration can dispatch
///
/// The serialized names are the wire names understood by the activity
/// executor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    #[serde(rename = "getHealthStatus")]
    HealthCheck,

    #[serde(rename = "createScanRequest")]
    SubmitScan,

    #[serde(rename = "getScanResult")]
    GetScanStatus,

    #[serde(rename = "getScanReport")]
    GetScanReport,

    #[serde(rename = "runFunctionalTestGroup")]
    RunFunctionalTestGroup,

    #[serde(rename = "logTestRunStart")]
    LogTestRunStart,

    #[serde(rename = "trackAvailability")]
    TrackAvailability,

    #[serde(rename = "getWebApiConfig")]
    GetWebApiConfig,
}

impl ActivityKind {
    /// Wire name of the activity
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HealthCheck => "getHealthStatus",
            Self::SubmitScan => "createScanRequest",
            Self::GetScanStatus => "getScanResult",
            Self::GetScanReport => "getScanReport",
            Self::RunFunctionalTestGroup => "runFunctionalTestGroup",
            Self::LogTestRunStart => "logTestRunStart",
            Self::TrackAvailability => "trackAvailability",
            Self::GetWebApiConfig => "getWebApiConfig",
        }
    }

    /// Whether the activity models an HTTP call and returns a [`WebApiResponse`]
    pub fn is_web(&self) -> bool {
        match self {
            Self::HealthCheck | Self::SubmitScan | Self::GetScanStatus | Self::GetScanReport => {
                true
            }
            Self::RunFunctionalTestGroup
            | Self::LogTestRunStart
            | Self::TrackAvailability
            | Self::GetWebApiConfig => false,
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed activity input
///
/// Each payload type is bound to exactly one [`ActivityKind`], so the shape of
/// a request's `data` is determined by its name.
pub trait ActivityPayload: Serialize {
    /// The activity this payload belongs to
    const KIND: ActivityKind;
}

/// A single request handed to the activity executor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRequest {
    /// Which activity to run
    pub activity_name: ActivityKind,

    /// Activity input (JSON)
    pub data: serde_json::Value,
}

impl ActivityRequest {
    /// Build a request from a typed payload
    pub fn from_payload<P: ActivityPayload>(payload: &P) -> Result<Self, serde_json::Error> {
        Ok(Self {
            activity_name: P::KIND,
            data: serde_json::to_value(payload)?,
        })
    }
}

/// Result of a web activity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebApiResponse {
    /// HTTP-like status code
    pub status_code: u16,

    /// Response body (JSON)
    #[serde(default)]
    pub body: serde_json::Value,
}

impl WebApiResponse {
    /// Whether the status code is in `[200, 300)`
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Decode the body into a typed value
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body.clone())
    }
}

/// Failure recorded by the host for an activity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityFailure {
    /// Error message
    pub message: String,

    /// Error type/code for programmatic handling
    pub error_type: Option<String>,

    /// Additional error details (for debugging)
    pub details: Option<serde_json::Value>,
}

impl ActivityFailure {
    /// Create a failure with a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: None,
            details: None,
        }
    }

    /// Set the error type
    pub fn with_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }

    /// Add error details
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl fmt::Display for ActivityFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ActivityFailure {}
