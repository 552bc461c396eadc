//! Typed activity inputs

use serde::{Deserialize, Serialize};

use super::{ActivityKind, ActivityPayload};
use crate::scenario::{TestContextData, TestGroupName, TestIdentifier};
use crate::telemetry::AvailabilityTelemetry;

/// Input of the health-check call
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HealthCheckData {}

impl ActivityPayload for HealthCheckData {
    const KIND: ActivityKind = ActivityKind::HealthCheck;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteData {
    pub known_pages: Vec<String>,
}

/// Input of the scan submission
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateScanRequestData {
    pub scan_url: String,

    pub priority: i32,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deep_scan: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_notify_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<SiteData>,
}

impl ActivityPayload for CreateScanRequestData {
    const KIND: ActivityKind = ActivityKind::SubmitScan;
}

/// Input of the status check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GetScanResultData {
    pub scan_id: String,
}

impl ActivityPayload for GetScanResultData {
    const KIND: ActivityKind = ActivityKind::GetScanStatus;
}

/// Input of the report download
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GetScanReportData {
    pub scan_id: String,
    pub report_id: String,
}

impl ActivityPayload for GetScanReportData {
    const KIND: ActivityKind = ActivityKind::GetScanReport;
}

/// Input of one functional test group run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunFunctionalTestGroupData {
    /// Workflow instance that owns the run
    pub run_id: String,
    pub test_group_name: TestGroupName,
    pub test_context_data: TestContextData,
    pub environment: String,
}

impl ActivityPayload for RunFunctionalTestGroupData {
    const KIND: ActivityKind = ActivityKind::RunFunctionalTestGroup;
}

/// Input of the test-run start log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogTestRunStartData {
    pub test_data: Vec<TestIdentifier>,
}

impl ActivityPayload for LogTestRunStartData {
    const KIND: ActivityKind = ActivityKind::LogTestRunStart;
}

/// Input of the availability telemetry record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackAvailabilityData {
    pub name: String,
    pub telemetry: AvailabilityTelemetry,
}

impl ActivityPayload for TrackAvailabilityData {
    const KIND: ActivityKind = ActivityKind::TrackAvailability;
}

/// Input of the web API configuration lookup
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GetWebApiConfigData {}

impl ActivityPayload for GetWebApiConfigData {
    const KIND: ActivityKind = ActivityKind::GetWebApiConfig;
}

/// Result of the web API configuration lookup
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebApiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_id: Option<String>,
}
