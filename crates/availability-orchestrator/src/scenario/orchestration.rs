//! Top-level availability test orchestration

use serde::{Deserialize, Serialize};

use super::{ScenarioDefinition, ScenarioSummary, SingleScanScenario};
use crate::config::AvailabilityTestConfig;
use crate::steps::OrchestrationSteps;
use crate::telemetry::{OrchestrationLogger, TelemetryProperties};
use crate::workflow::{OrchestrationContext, OrchestrationError};

/// Outcome of one availability test run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityTestSummary {
    pub instance_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_id: Option<String>,

    pub health_check_passed: bool,

    pub scenarios: Vec<ScenarioSummary>,
}

impl AvailabilityTestSummary {
    /// Health check passed and no scenario hit an error
    pub fn succeeded(&self) -> bool {
        self.health_check_passed && self.scenarios.iter().all(|s| !s.encountered_error)
    }
}

/// Run every scenario end to end
///
/// Each phase runs across all scenarios before the next phase starts, so
/// the scans progress on the service side while earlier scenarios wait. A
/// failed health check is escalated and recorded in the summary; the
/// scenarios still run.
pub fn availability_test_orchestration(
    ctx: &mut OrchestrationContext,
    config: &AvailabilityTestConfig,
    scenarios: &[ScenarioDefinition],
) -> Result<AvailabilityTestSummary, OrchestrationError> {
    let mut steps = OrchestrationSteps::new(config, OrchestrationLogger::new());

    let release_id = match steps.get_web_api_config(ctx) {
        Ok(web_api_config) => web_api_config.release_id,
        Err(err) if err.is_control() => return Err(err),
        Err(err) => {
            steps.logger().log_warning(
                ctx,
                &format!("Unable to read web API configuration: {err}"),
                None,
            );
            None
        }
    }
    .or_else(|| config.release_id.clone());

    if let Some(release_id) = &release_id {
        steps = steps.with_logger_property("releaseId", release_id);
    }

    let test_data = scenarios
        .iter()
        .flat_map(ScenarioDefinition::test_identifiers)
        .collect();
    let properties = TelemetryProperties::new()
        .with("scanUrl", config.url_to_scan.as_str())
        .with("environment", config.environment_definition.as_str())
        .with("scenarioCount", scenarios.len().to_string());
    steps
        .logger()
        .log_step(ctx, "Starting availability test run", Some(&properties));
    steps.log_test_run_start(ctx, test_data)?;

    let health_check_passed = match steps.invoke_health_check_rest_api(ctx) {
        Ok(_) => true,
        Err(err) if err.is_control() => return Err(err),
        Err(err) => {
            steps
                .logger()
                .log_error(ctx, &format!("Health check failed: {err}"), None);
            false
        }
    };

    let mut drivers: Vec<SingleScanScenario> = scenarios
        .iter()
        .cloned()
        .map(SingleScanScenario::new)
        .collect();

    for driver in &mut drivers {
        driver.submit_scan_phase(&steps, ctx)?;
    }
    for driver in &mut drivers {
        driver.wait_for_scan_completion_phase(&steps, ctx)?;
    }
    for driver in &mut drivers {
        driver.after_scan_completed_phase(&steps, ctx)?;
    }

    let summary = AvailabilityTestSummary {
        instance_id: ctx.instance_id().to_string(),
        release_id,
        health_check_passed,
        scenarios: drivers.iter().map(SingleScanScenario::summary).collect(),
    };

    let properties = TelemetryProperties::new().with("succeeded", summary.succeeded().to_string());
    steps
        .logger()
        .log_step(ctx, "Availability test run finished", Some(&properties));

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{ActivityKind, ActivityRequest};
    use crate::scenario::default_scenarios;
    use crate::workflow::{run_turn, HistoryEvent, PendingAction, TurnOutcome};
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn recorded(kind: ActivityKind, result: serde_json::Value) -> HistoryEvent {
        HistoryEvent::activity_completed(
            PendingAction::activity(ActivityRequest {
                activity_name: kind,
                data: json!({}),
            }),
            result,
            start(),
        )
    }

    fn turn(history: &[HistoryEvent]) -> TurnOutcome<AvailabilityTestSummary> {
        let config = AvailabilityTestConfig::default();
        let scenarios = default_scenarios(&config);
        run_turn("inst-1", start(), history, |ctx| {
            availability_test_orchestration(ctx, &config, &scenarios)
        })
    }

    #[test]
    fn test_first_action_reads_web_api_config() {
        let outcome = turn(&[]);

        let TurnOutcome::Suspended(PendingAction::CallActivity { request }) = outcome else {
            panic!("expected getWebApiConfig, got {outcome:?}");
        };
        assert_eq!(request.activity_name, ActivityKind::GetWebApiConfig);
    }

    #[test]
    fn test_logs_every_test_identifier() {
        let history = vec![recorded(ActivityKind::GetWebApiConfig, json!({"releaseId": "r1"}))];

        let outcome = turn(&history);

        let TurnOutcome::Suspended(PendingAction::CallActivity { request }) = outcome else {
            panic!("expected logTestRunStart, got {outcome:?}");
        };
        assert_eq!(request.activity_name, ActivityKind::LogTestRunStart);
        // ScanWithoutNotification has 5 groups, DeepScan has 5.
        assert_eq!(request.data["testData"].as_array().unwrap().len(), 10);
    }

    #[test]
    fn test_health_check_failure_does_not_stop_scenarios() {
        let history = vec![
            recorded(ActivityKind::GetWebApiConfig, json!({"releaseId": "r1"})),
            recorded(ActivityKind::LogTestRunStart, json!(null)),
            recorded(ActivityKind::HealthCheck, json!({"statusCode": 503, "body": null})),
            recorded(ActivityKind::TrackAvailability, json!(null)),
        ];

        let outcome = turn(&history);

        let TurnOutcome::Suspended(PendingAction::CallActivity { request }) = outcome else {
            panic!("expected the first submission, got {outcome:?}");
        };
        assert_eq!(request.activity_name, ActivityKind::SubmitScan);
    }

    #[test]
    fn test_release_id_is_stamped_on_telemetry() {
        let history = vec![
            recorded(ActivityKind::GetWebApiConfig, json!({"releaseId": "r1"})),
            recorded(ActivityKind::LogTestRunStart, json!(null)),
            recorded(ActivityKind::HealthCheck, json!({"statusCode": 503, "body": null})),
        ];

        let outcome = turn(&history);

        let TurnOutcome::Suspended(PendingAction::CallActivity { request }) = outcome else {
            panic!("expected trackAvailability, got {outcome:?}");
        };
        assert_eq!(request.data["telemetry"]["properties"]["releaseId"], json!("r1"));
    }

    #[test]
    fn test_summary_success() {
        let summary = AvailabilityTestSummary {
            instance_id: "inst-1".to_string(),
            release_id: None,
            health_check_passed: true,
            scenarios: vec![ScenarioSummary {
                name: "S1".to_string(),
                scan_id: Some("scan-1".to_string()),
                encountered_error: false,
            }],
        };
        assert!(summary.succeeded());

        let failed = AvailabilityTestSummary {
            health_check_passed: false,
            ..summary
        };
        assert!(!failed.succeeded());
    }
}
