//! Orchestration steps
//!
//! The vocabulary a scenario driver is written in. Every step is a thin,
//! named composition over the dispatchers and the wait loop; none of them
//! catch errors. Escalation (error log plus a failed availability record)
//! happens once, where the failure is detected, before the error is returned.

use crate::activity::payload::{
    CreateScanRequestData, GetScanReportData, GetScanResultData, GetWebApiConfigData,
    HealthCheckData, LogTestRunStartData, RunFunctionalTestGroupData, SiteData, WebApiConfig,
};
use crate::activity::{
    ActivityDispatcher, ActivityKind, ActivityRequest, ParallelDispatcher, WebApiResponse,
};
use crate::config::AvailabilityTestConfig;
use crate::scan::{NotificationInfo, RunState, ScanRequestOptions, ScanStatus, ScanSubmission};
use crate::scenario::{TestContextData, TestGroupName, TestIdentifier};
use crate::telemetry::{OrchestrationLogger, TelemetryProperties};
use crate::wait::{ScanWaitCondition, WaitOrchestrator, WaitTimeouts};
use crate::workflow::{OrchestrationContext, OrchestrationError};

/// Steps available to an availability test orchestration
#[derive(Debug, Clone)]
pub struct OrchestrationSteps<'a> {
    config: &'a AvailabilityTestConfig,
    logger: OrchestrationLogger,
    dispatcher: ActivityDispatcher,
    parallel: ParallelDispatcher,
    waiter: WaitOrchestrator,
}

impl<'a> OrchestrationSteps<'a> {
    /// Create steps reading `config` and logging through `logger`
    pub fn new(config: &'a AvailabilityTestConfig, logger: OrchestrationLogger) -> Self {
        let dispatcher = ActivityDispatcher::new(logger.clone());
        Self {
            config,
            parallel: ParallelDispatcher::new(logger.clone()),
            waiter: WaitOrchestrator::new(dispatcher.clone()),
            dispatcher,
            logger,
        }
    }

    /// Same steps with `key` stamped on every log line and telemetry record
    pub fn with_logger_property(self, key: &str, value: &str) -> Self {
        let logger = self.logger.with_property(key, value);
        Self::new(self.config, logger)
    }

    pub fn logger(&self) -> &OrchestrationLogger {
        &self.logger
    }

    pub fn config(&self) -> &AvailabilityTestConfig {
        self.config
    }

    pub fn invoke_health_check_rest_api(
        &self,
        ctx: &mut OrchestrationContext,
    ) -> Result<WebApiResponse, OrchestrationError> {
        self.dispatcher
            .call_web_request_activity(ctx, &HealthCheckData {})
    }

    /// Deployment information of the scan service under test
    pub fn get_web_api_config(
        &self,
        ctx: &mut OrchestrationContext,
    ) -> Result<WebApiConfig, OrchestrationError> {
        let result = self.dispatcher.call_activity(ctx, &GetWebApiConfigData {})?;
        if result.is_null() {
            return Ok(WebApiConfig::default());
        }
        Ok(serde_json::from_value(result)?)
    }

    /// Submit a scan request and return the new scan id
    ///
    /// The configured default priority applies unless `options` sets one.
    /// The id is taken from the first element of the response array; an
    /// element carrying `error`, an empty array, or a missing id is escalated
    /// and rejected.
    pub fn invoke_submit_scan_request_rest_api(
        &self,
        ctx: &mut OrchestrationContext,
        url: &str,
        options: &ScanRequestOptions,
    ) -> Result<String, OrchestrationError> {
        let data = CreateScanRequestData {
            scan_url: url.to_string(),
            priority: options.priority.unwrap_or(self.config.default_scan_priority),
            deep_scan: options.deep_scan,
            scan_notify_url: options.scan_notification_url.clone(),
            site: options.deep_scan.then(|| SiteData {
                known_pages: options.known_pages.clone(),
            }),
        };

        let response = self.dispatcher.call_web_request_activity(ctx, &data)?;
        let submissions: Vec<ScanSubmission> = if response.body.is_null() {
            Vec::new()
        } else {
            self.dispatcher
                .decode_web_body(ctx, ActivityKind::SubmitScan.as_str(), &response)?
        };

        let rejection = match submissions.into_iter().next() {
            Some(ScanSubmission {
                scan_id: Some(scan_id),
                error: None,
                ..
            }) => {
                let properties = TelemetryProperties::new()
                    .with("scanUrl", url)
                    .with("scanId", scan_id.as_str());
                self.logger
                    .log_step(ctx, "Scan request submitted", Some(&properties));
                return Ok(scan_id);
            }
            Some(ScanSubmission {
                error: Some(error), ..
            }) => error.describe(),
            Some(_) => "scan request response carried no scan id".to_string(),
            None => "scan request response was empty".to_string(),
        };

        let properties = TelemetryProperties::new()
            .with("activityName", ActivityKind::SubmitScan.as_str())
            .with("requestResponse", serde_json::to_string(&response)?);
        self.logger.log_error(
            ctx,
            &format!("Scan request for {url} was rejected: {rejection}"),
            Some(&properties),
        );
        self.dispatcher.track_availability(ctx, false, properties)?;

        Err(OrchestrationError::ScanRequestRejected {
            url: url.to_string(),
            message: rejection,
        })
    }

    pub fn invoke_get_scan_report_rest_api(
        &self,
        ctx: &mut OrchestrationContext,
        scan_id: &str,
        report_id: &str,
    ) -> Result<WebApiResponse, OrchestrationError> {
        self.dispatcher.call_web_request_activity(
            ctx,
            &GetScanReportData {
                scan_id: scan_id.to_string(),
                report_id: report_id.to_string(),
            },
        )
    }

    /// Check once that a freshly submitted scan was accepted
    ///
    /// A service error, a `failed` run or an `unscannable` run is escalated
    /// and returned as [`OrchestrationError::ScanSubmissionInvalid`].
    pub fn validate_scan_request_submission_state(
        &self,
        ctx: &mut OrchestrationContext,
        scan_id: &str,
    ) -> Result<ScanStatus, OrchestrationError> {
        let response = self.dispatcher.call_web_request_activity(
            ctx,
            &GetScanResultData {
                scan_id: scan_id.to_string(),
            },
        )?;
        let status: ScanStatus = self.dispatcher.decode_web_body(
            ctx,
            "validateScanRequestSubmissionState",
            &response,
        )?;

        let problem = match (&status.error, status.run_state()) {
            (Some(error), _) => Some(error.describe()),
            (None, Some(RunState::Failed)) => Some("scan run failed".to_string()),
            (None, Some(RunState::Unscannable)) => Some("url is unscannable".to_string()),
            _ => None,
        };

        let Some(message) = problem else {
            return Ok(status);
        };

        let properties = TelemetryProperties::new()
            .with("activityName", "validateScanRequestSubmissionState")
            .with("scanId", scan_id)
            .with("requestResponse", serde_json::to_string(&response)?);
        self.logger.log_error(
            ctx,
            &format!("Scan {scan_id} is in an invalid state: {message}"),
            Some(&properties),
        );
        self.dispatcher.track_availability(ctx, false, properties)?;

        Err(OrchestrationError::ScanSubmissionInvalid {
            scan_id: scan_id.to_string(),
            message,
        })
    }

    pub fn wait_for_base_scan_completion(
        &self,
        ctx: &mut OrchestrationContext,
        scan_id: &str,
    ) -> Result<ScanStatus, OrchestrationError> {
        self.waiter.wait_for(
            ctx,
            scan_id,
            "waitForBaseScanCompletion",
            WaitTimeouts::new(
                self.config.max_scan_wait_time(),
                self.config.scan_wait_interval(),
            ),
            &ScanWaitCondition::BaseScan,
        )
    }

    pub fn wait_for_deep_scan_completion(
        &self,
        ctx: &mut OrchestrationContext,
        scan_id: &str,
    ) -> Result<ScanStatus, OrchestrationError> {
        self.waiter.wait_for(
            ctx,
            scan_id,
            "waitForDeepScanCompletion",
            WaitTimeouts::new(
                self.config.max_deep_scan_wait_time(),
                self.config.scan_wait_interval(),
            ),
            &ScanWaitCondition::DeepScan,
        )
    }

    /// Wait for the completion notification and return its delivery record
    pub fn wait_for_scan_completion_notification(
        &self,
        ctx: &mut OrchestrationContext,
        scan_id: &str,
    ) -> Result<NotificationInfo, OrchestrationError> {
        let status = self.waiter.wait_for(
            ctx,
            scan_id,
            "waitForScanCompletionNotification",
            WaitTimeouts::new(
                self.config.max_scan_completion_notification_wait_time(),
                self.config.scan_wait_interval(),
            ),
            &ScanWaitCondition::ScanNotification,
        )?;

        status
            .notification
            .ok_or_else(|| OrchestrationError::MissingNotification {
                scan_id: scan_id.to_string(),
            })
    }

    /// Run test groups as one fan-out; an empty list does nothing
    pub fn run_functional_test_groups(
        &self,
        ctx: &mut OrchestrationContext,
        scenario_name: &str,
        test_context: &TestContextData,
        group_names: &[TestGroupName],
    ) -> Result<(), OrchestrationError> {
        let requests = group_names
            .iter()
            .map(|&test_group_name| {
                ActivityRequest::from_payload(&RunFunctionalTestGroupData {
                    run_id: ctx.instance_id().to_string(),
                    test_group_name,
                    test_context_data: test_context.clone(),
                    environment: self.config.environment_definition.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.parallel.call_activities_in_parallel(
            ctx,
            requests,
            &format!("functional test groups for {scenario_name}"),
        )?;
        Ok(())
    }

    pub fn log_test_run_start(
        &self,
        ctx: &mut OrchestrationContext,
        test_data: Vec<TestIdentifier>,
    ) -> Result<(), OrchestrationError> {
        self.dispatcher
            .call_activity(ctx, &LogTestRunStartData { test_data })?;
        Ok(())
    }

    /// Record a scenario that finished without any error
    pub fn track_scan_request_completed(
        &self,
        ctx: &mut OrchestrationContext,
    ) -> Result<(), OrchestrationError> {
        self.logger.log_step(ctx, "Scan request completed", None);
        self.dispatcher
            .track_availability(ctx, true, TelemetryProperties::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn run<T>(
        history: &[HistoryEvent],
        step: impl FnOnce(&OrchestrationSteps<'_>, &mut OrchestrationContext) -> Result<T, OrchestrationError>,
    ) -> TurnOutcome<T> {
        let config = AvailabilityTestConfig::default();
        let steps = OrchestrationSteps::new(&config, OrchestrationLogger::new());
        run_turn("inst-1", start(), history, |ctx| step(&steps, ctx))
    }

    #[test]
    fn test_submit_uses_default_priority() {
        let outcome = run(&[], |steps, ctx| {
            steps.invoke_submit_scan_request_rest_api(
                ctx,
                "https://example.com",
                &ScanRequestOptions::default(),
            )
        });

        let TurnOutcome::Suspended(PendingAction::CallActivity { request }) = outcome else {
            panic!("expected a submission, got {outcome:?}");
        };
        assert_eq!(request.activity_name, ActivityKind::SubmitScan);
        assert_eq!(request.data["priority"], json!(1000));
        assert_eq!(request.data["scanUrl"], json!("https://example.com"));
        assert!(request.data.get("site").is_none());
    }

    #[test]
    fn test_submit_caller_priority_and_deep_scan_site() {
        let options = ScanRequestOptions::default()
            .with_priority(5)
            .with_deep_scan(vec!["https://example.com/a".to_string()]);

        let outcome = run(&[], |steps, ctx| {
            steps.invoke_submit_scan_request_rest_api(ctx, "https://example.com", &options)
        });

        let TurnOutcome::Suspended(PendingAction::CallActivity { request }) = outcome else {
            panic!("expected a submission, got {outcome:?}");
        };
        assert_eq!(request.data["priority"], json!(5));
        assert_eq!(request.data["deepScan"], json!(true));
        assert_eq!(
            request.data["site"]["knownPages"],
            json!(["https://example.com/a"])
        );
    }

    #[test]
    fn test_submit_returns_first_scan_id() {
        let history = vec![recorded(
            ActivityKind::SubmitScan,
            json!({"statusCode": 202, "body": [{"scanId": "scan-1", "url": "https://example.com"}]}),
        )];

        let outcome = run(&history, |steps, ctx| {
            steps.invoke_submit_scan_request_rest_api(
                ctx,
                "https://example.com",
                &ScanRequestOptions::default(),
            )
        });

        assert_eq!(outcome, TurnOutcome::Completed("scan-1".to_string()));
    }

    #[test]
    fn test_submit_error_element_is_rejected_after_tracking() {
        let history = vec![
            recorded(
                ActivityKind::SubmitScan,
                json!({"statusCode": 202, "body": [{"url": "https://example.com", "error": {"code": "InvalidURL", "message": "bad url"}}]}),
            ),
            recorded(ActivityKind::TrackAvailability, json!(null)),
        ];

        let outcome = run(&history, |steps, ctx| {
            steps.invoke_submit_scan_request_rest_api(
                ctx,
                "https://example.com",
                &ScanRequestOptions::default(),
            )
        });

        assert_eq!(
            outcome,
            TurnOutcome::Failed(OrchestrationError::ScanRequestRejected {
                url: "https://example.com".to_string(),
                message: "InvalidURL: bad url".to_string(),
            })
        );
    }

    #[test]
    fn test_submit_empty_response_is_escalated() {
        let history = vec![recorded(
            ActivityKind::SubmitScan,
            json!({"statusCode": 202, "body": []}),
        )];

        let outcome = run(&history, |steps, ctx| {
            steps.invoke_submit_scan_request_rest_api(
                ctx,
                "https://example.com",
                &ScanRequestOptions::default(),
            )
        });

        let TurnOutcome::Suspended(PendingAction::CallActivity { request }) = outcome else {
            panic!("expected trackAvailability, got {outcome:?}");
        };
        assert_eq!(request.activity_name, ActivityKind::TrackAvailability);
        assert_eq!(request.data["telemetry"]["success"], json!(false));
    }

    #[test]
    fn test_submit_malformed_body_is_escalated() {
        let history = vec![recorded(
            ActivityKind::SubmitScan,
            json!({"statusCode": 202, "body": {"scanId": "scan-1"}}),
        )];

        let outcome = run(&history, |steps, ctx| {
            steps.invoke_submit_scan_request_rest_api(
                ctx,
                "https://example.com",
                &ScanRequestOptions::default(),
            )
        });

        let TurnOutcome::Suspended(PendingAction::CallActivity { request }) = outcome else {
            panic!("expected trackAvailability, got {outcome:?}");
        };
        assert_eq!(request.activity_name, ActivityKind::TrackAvailability);
        assert_eq!(request.data["telemetry"]["success"], json!(false));
        assert_eq!(
            request.data["telemetry"]["properties"]["activityName"],
            json!("createScanRequest")
        );
    }

    #[test]
    fn test_validate_malformed_body_fails_after_tracking() {
        let history = vec![
            recorded(
                ActivityKind::GetScanStatus,
                json!({"statusCode": 200, "body": "service unavailable"}),
            ),
            recorded(ActivityKind::TrackAvailability, json!(null)),
        ];

        let outcome = run(&history, |steps, ctx| {
            steps.validate_scan_request_submission_state(ctx, "scan-1")
        });

        assert!(matches!(
            outcome,
            TurnOutcome::Failed(OrchestrationError::UnexpectedResponse { ref activity_label, .. })
                if activity_label == "validateScanRequestSubmissionState"
        ));
    }

    #[test]
    fn test_validate_rejects_unscannable() {
        let history = vec![
            recorded(
                ActivityKind::GetScanStatus,
                json!({"statusCode": 200, "body": {"run": {"state": "unscannable"}}}),
            ),
            recorded(ActivityKind::TrackAvailability, json!(null)),
        ];

        let outcome = run(&history, |steps, ctx| {
            steps.validate_scan_request_submission_state(ctx, "scan-1")
        });

        assert!(matches!(
            outcome,
            TurnOutcome::Failed(OrchestrationError::ScanSubmissionInvalid { .. })
        ));
    }

    #[test]
    fn test_validate_accepts_queued() {
        let history = vec![recorded(
            ActivityKind::GetScanStatus,
            json!({"statusCode": 200, "body": {"run": {"state": "queued"}}}),
        )];

        let outcome = run(&history, |steps, ctx| {
            steps.validate_scan_request_submission_state(ctx, "scan-1")
        });

        assert!(matches!(outcome, TurnOutcome::Completed(_)));
    }

    #[test]
    fn test_functional_test_groups_fan_out_one_request_per_group() {
        let context = TestContextData {
            scan_id: Some("scan-1".to_string()),
            ..TestContextData::new("https://example.com")
        };

        let outcome = run(&[], |steps, ctx| {
            steps.run_functional_test_groups(
                ctx,
                "S1",
                &context,
                &[TestGroupName::PostScan, TestGroupName::ScanStatus],
            )
        });

        let TurnOutcome::Suspended(PendingAction::CallActivities { requests }) = outcome else {
            panic!("expected a fan-out, got {outcome:?}");
        };
        assert_eq!(requests.len(), 2);
        assert!(requests
            .iter()
            .all(|r| r.activity_name == ActivityKind::RunFunctionalTestGroup));
        assert_eq!(requests[0].data["testGroupName"], json!("PostScan"));
        assert_eq!(requests[1].data["testGroupName"], json!("ScanStatus"));
        assert_eq!(requests[0].data["runId"], json!("inst-1"));
        assert_eq!(requests[0].data["environment"], json!("canary"));
        assert_eq!(
            requests[1].data["testContextData"]["scanId"],
            json!("scan-1")
        );
    }

    #[test]
    fn test_functional_test_groups_empty_is_noop() {
        let outcome = run(&[], |steps, ctx| {
            steps.run_functional_test_groups(ctx, "S1", &TestContextData::default(), &[])
        });

        assert_eq!(outcome, TurnOutcome::Completed(()));
    }

    #[test]
    fn test_notification_wait_projects_notification() {
        let history = vec![
            HistoryEvent::timer_fired(
                PendingAction::timer(start() + chrono::Duration::seconds(30)),
                start() + chrono::Duration::seconds(30),
            ),
            recorded(
                ActivityKind::GetScanStatus,
                json!({"statusCode": 200, "body": {"notification": {"state": "sendFailed", "responseCode": 500}}}),
            ),
        ];

        let outcome = run(&history, |steps, ctx| {
            steps.wait_for_scan_completion_notification(ctx, "scan-1")
        });

        let TurnOutcome::Completed(notification) = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(notification.response_code, Some(500));
    }

    #[test]
    fn test_get_scan_report_returns_raw_response() {
        let history = vec![recorded(
            ActivityKind::GetScanReport,
            json!({"statusCode": 200, "body": {"runs": []}}),
        )];

        let outcome = run(&history, |steps, ctx| {
            steps.invoke_get_scan_report_rest_api(ctx, "scan-1", "report-1")
        });

        let TurnOutcome::Completed(response) = outcome else {
            panic!("expected the report, got {outcome:?}");
        };
        assert_eq!(response.body, json!({"runs": []}));
    }

    #[test]
    fn test_web_api_config_release_id() {
        let history = vec![recorded(
            ActivityKind::GetWebApiConfig,
            json!({"releaseId": "2024.01.1"}),
        )];

        let outcome = run(&history, |steps, ctx| steps.get_web_api_config(ctx));

        assert_eq!(
            outcome,
            TurnOutcome::Completed(WebApiConfig {
                release_id: Some("2024.01.1".to_string()),
            })
        );
    }
}
