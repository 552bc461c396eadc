//! Static scenario table

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::AvailabilityTestConfig;
use crate::scan::ScanRequestOptions;

/// Functional test groups the activity executor knows how to run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TestGroupName {
    PostScan,
    ScanStatus,
    ScanQueueing,
    ScanPreProcessing,
    ScanReports,
    ConsolidatedScanReports,
    DeepScanStatusConsistency,
    DeepScanPostScan,
    DeepScanReports,
    ScanCompletionNotification,
    FailedScanNotification,
}

impl TestGroupName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PostScan => "PostScan",
            Self::ScanStatus => "ScanStatus",
            Self::ScanQueueing => "ScanQueueing",
            Self::ScanPreProcessing => "ScanPreProcessing",
            Self::ScanReports => "ScanReports",
            Self::ConsolidatedScanReports => "ConsolidatedScanReports",
            Self::DeepScanStatusConsistency => "DeepScanStatusConsistency",
            Self::DeepScanPostScan => "DeepScanPostScan",
            Self::DeepScanReports => "DeepScanReports",
            Self::ScanCompletionNotification => "ScanCompletionNotification",
            Self::FailedScanNotification => "FailedScanNotification",
        }
    }
}

impl fmt::Display for TestGroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one test group of one scenario in the test-run log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestIdentifier {
    /// Scenario the group belongs to
    pub test_container: String,

    /// The test group
    pub test_name: TestGroupName,
}

/// Data shared with every functional test group of a scenario
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestContextData {
    pub scan_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_id: Option<String>,
}

impl TestContextData {
    pub fn new(scan_url: impl Into<String>) -> Self {
        Self {
            scan_url: scan_url.into(),
            scan_id: None,
            report_id: None,
        }
    }
}

/// Test groups to run after each phase of a scenario
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioTestGroups {
    #[serde(default)]
    pub post_scan_submission: Vec<TestGroupName>,

    #[serde(default)]
    pub post_scan_completion: Vec<TestGroupName>,

    #[serde(default)]
    pub scan_reports: Vec<TestGroupName>,

    #[serde(default)]
    pub post_deep_scan_completion: Vec<TestGroupName>,

    #[serde(default)]
    pub post_scan_completion_notification: Vec<TestGroupName>,
}

impl ScenarioTestGroups {
    /// Every configured group, in phase order
    pub fn all(&self) -> impl Iterator<Item = TestGroupName> + '_ {
        self.post_scan_submission
            .iter()
            .chain(&self.post_scan_completion)
            .chain(&self.scan_reports)
            .chain(&self.post_deep_scan_completion)
            .chain(&self.post_scan_completion_notification)
            .copied()
    }
}

/// Immutable description of one end-to-end scenario
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDefinition {
    /// Scenario name, used as the test container
    pub name: String,

    /// Page to scan
    pub scan_url: String,

    /// Options for the scan request
    pub scan_options: ScanRequestOptions,

    /// Test groups per phase
    pub test_groups: ScenarioTestGroups,
}

impl ScenarioDefinition {
    /// Identifiers of every test group this scenario runs
    pub fn test_identifiers(&self) -> Vec<TestIdentifier> {
        self.test_groups
            .all()
            .map(|test_name| TestIdentifier {
                test_container: self.name.clone(),
                test_name,
            })
            .collect()
    }
}

/// The scenarios an availability test run executes
///
/// The notification scenario is only included when a notify endpoint is
/// configured.
pub fn default_scenarios(config: &AvailabilityTestConfig) -> Vec<ScenarioDefinition> {
    let mut scenarios = vec![ScenarioDefinition {
        name: "ScanWithoutNotification".to_string(),
        scan_url: config.url_to_scan.clone(),
        scan_options: ScanRequestOptions::default(),
        test_groups: ScenarioTestGroups {
            post_scan_submission: vec![TestGroupName::PostScan, TestGroupName::ScanStatus],
            post_scan_completion: vec![
                TestGroupName::ScanQueueing,
                TestGroupName::ScanPreProcessing,
            ],
            scan_reports: vec![TestGroupName::ScanReports],
            ..Default::default()
        },
    }];

    if let Some(endpoint) = &config.scan_notify_api_endpoint {
        scenarios.push(ScenarioDefinition {
            name: "ScanWithNotification".to_string(),
            scan_url: config.url_to_scan.clone(),
            scan_options: ScanRequestOptions::default().with_notification_url(endpoint.clone()),
            test_groups: ScenarioTestGroups {
                post_scan_submission: vec![TestGroupName::PostScan],
                post_scan_completion: vec![TestGroupName::ScanStatus],
                scan_reports: vec![TestGroupName::ScanReports],
                post_scan_completion_notification: vec![TestGroupName::ScanCompletionNotification],
                ..Default::default()
            },
        });
    }

    scenarios.push(ScenarioDefinition {
        name: "DeepScan".to_string(),
        scan_url: config.url_to_scan.clone(),
        scan_options: ScanRequestOptions::default()
            .with_deep_scan(config.deep_scan_known_pages.clone()),
        test_groups: ScenarioTestGroups {
            post_scan_submission: vec![TestGroupName::PostScan],
            post_scan_completion: vec![TestGroupName::ScanStatus],
            post_deep_scan_completion: vec![
                TestGroupName::DeepScanStatusConsistency,
                TestGroupName::DeepScanPostScan,
                TestGroupName::DeepScanReports,
            ],
            ..Default::default()
        },
    });

    scenarios
}
