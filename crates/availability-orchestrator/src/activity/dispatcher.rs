//! Single-activity dispatch with failure escalation

use serde::de::DeserializeOwned;

use super::{ActivityPayload, ActivityRequest, WebApiResponse};
use crate::activity::payload::TrackAvailabilityData;
use crate::telemetry::{
    AvailabilityTelemetry, OrchestrationLogger, TelemetryProperties, AVAILABILITY_TEST_NAME,
};
use crate::workflow::{OrchestrationContext, OrchestrationError};

/// Issues single activity calls through the orchestration context
///
/// Nothing is retried locally: a failure recorded by the host comes back as
/// [`OrchestrationError::ActivityFailed`]. Web activities additionally have
/// their status code checked, and an unsuccessful one is escalated exactly once
/// (error log plus a failed availability record) before the error is returned.
#[derive(Debug, Clone, Default)]
pub struct ActivityDispatcher {
    logger: OrchestrationLogger,
}

impl ActivityDispatcher {
    /// Create a dispatcher that logs through `logger`
    pub fn new(logger: OrchestrationLogger) -> Self {
        Self { logger }
    }

    /// The logger used for escalation
    pub fn logger(&self) -> &OrchestrationLogger {
        &self.logger
    }

    /// Run one activity and return its raw result
    pub fn call_activity<P: ActivityPayload>(
        &self,
        ctx: &mut OrchestrationContext,
        payload: &P,
    ) -> Result<serde_json::Value, OrchestrationError> {
        let request = ActivityRequest::from_payload(payload)?;
        ctx.schedule_activity(request)
    }

    /// Run one web activity and require a status code in `[200, 300)`
    pub fn call_web_request_activity<P: ActivityPayload>(
        &self,
        ctx: &mut OrchestrationContext,
        payload: &P,
    ) -> Result<WebApiResponse, OrchestrationError> {
        let activity = P::KIND;
        let result = self.call_activity(ctx, payload)?;

        let response: WebApiResponse = match serde_json::from_value(result.clone()) {
            Ok(response) => response,
            Err(err) => {
                self.escalate(
                    ctx,
                    activity.as_str(),
                    result.to_string(),
                    &format!("The {activity} activity returned a malformed result"),
                )?;
                return Err(OrchestrationError::UnexpectedResponse {
                    activity_label: activity.as_str().to_string(),
                    message: err.to_string(),
                });
            }
        };

        if !response.is_success() {
            self.escalate(
                ctx,
                activity.as_str(),
                serde_json::to_string(&response)?,
                &format!("The {activity} activity failed"),
            )?;
            return Err(OrchestrationError::UnsuccessfulStatusCode {
                activity,
                status_code: response.status_code,
            });
        }

        Ok(response)
    }

    /// Decode the body of a successful web response
    ///
    /// A body of the wrong shape is escalated under `activity_label` the same
    /// way an unsuccessful status code is.
    pub fn decode_web_body<T: DeserializeOwned>(
        &self,
        ctx: &mut OrchestrationContext,
        activity_label: &str,
        response: &WebApiResponse,
    ) -> Result<T, OrchestrationError> {
        match response.body_as() {
            Ok(body) => Ok(body),
            Err(err) => {
                self.escalate(
                    ctx,
                    activity_label,
                    serde_json::to_string(response)?,
                    &format!("{activity_label} returned an unexpected response body"),
                )?;
                Err(OrchestrationError::UnexpectedResponse {
                    activity_label: activity_label.to_string(),
                    message: err.to_string(),
                })
            }
        }
    }

    /// Log `message` as an error and emit one failed availability record
    fn escalate(
        &self,
        ctx: &mut OrchestrationContext,
        activity_label: &str,
        request_response: String,
        message: &str,
    ) -> Result<(), OrchestrationError> {
        let properties = TelemetryProperties::new()
            .with("activityName", activity_label)
            .with("requestResponse", request_response);
        self.logger.log_error(ctx, message, Some(&properties));
        self.track_availability(ctx, false, properties)
    }

    /// Emit an availability record
    ///
    /// Only replay control errors propagate; a failure to record telemetry is
    /// logged and otherwise ignored.
    pub fn track_availability(
        &self,
        ctx: &mut OrchestrationContext,
        success: bool,
        properties: TelemetryProperties,
    ) -> Result<(), OrchestrationError> {
        let data = TrackAvailabilityData {
            name: AVAILABILITY_TEST_NAME.to_string(),
            telemetry: AvailabilityTelemetry {
                success,
                properties: self.logger.default_properties(ctx).merged(&properties),
            },
        };

        let result = ActivityRequest::from_payload(&data)
            .map_err(OrchestrationError::from)
            .and_then(|request| ctx.schedule_activity(request));

        match result {
            Ok(_) => Ok(()),
            Err(err) if err.is_control() => Err(err),
            Err(err) => {
                self.logger.log_warning(
                    ctx,
                    &format!("Failed to track availability: {err}"),
                    None,
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::payload::GetScanResultData;
    use crate::activity::{ActivityFailure, ActivityKind};
    use crate::workflow::{ActionOutcome, HistoryEvent, PendingAction};
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn status_payload() -> GetScanResultData {
        GetScanResultData {
            scan_id: "scan-1".to_string(),
        }
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

    #[test]
    fn test_successful_web_call_emits_no_telemetry() {
        let history = vec![recorded(
            ActivityKind::GetScanStatus,
            json!({"statusCode": 200, "body": {"scanId": "scan-1"}}),
        )];
        let mut ctx = OrchestrationContext::new("inst-1", start(), history);
        let dispatcher = ActivityDispatcher::default();

        let response = dispatcher
            .call_web_request_activity(&mut ctx, &status_payload())
            .unwrap();

        assert_eq!(response.status_code, 200);
        // Nothing else was requested.
        assert!(ctx.pending_action().is_none());
    }

    #[test]
    fn test_unsuccessful_status_tracks_availability_before_failing() {
        let history = vec![
            recorded(
                ActivityKind::GetScanStatus,
                json!({"statusCode": 500, "body": {"message": "boom"}}),
            ),
            recorded(ActivityKind::TrackAvailability, json!(null)),
        ];
        let mut ctx = OrchestrationContext::new("inst-1", start(), history);
        let dispatcher = ActivityDispatcher::default();

        let result = dispatcher.call_web_request_activity(&mut ctx, &status_payload());

        assert_eq!(
            result,
            Err(OrchestrationError::UnsuccessfulStatusCode {
                activity: ActivityKind::GetScanStatus,
                status_code: 500,
            })
        );
        assert_eq!(ctx.position(), 2);
    }

    #[test]
    fn test_unsuccessful_status_requests_failure_record() {
        let history = vec![recorded(
            ActivityKind::GetScanStatus,
            json!({"statusCode": 404, "body": null}),
        )];
        let mut ctx = OrchestrationContext::new("inst-1", start(), history);
        let dispatcher = ActivityDispatcher::default();

        let result = dispatcher.call_web_request_activity(&mut ctx, &status_payload());
        assert_eq!(result, Err(OrchestrationError::Suspended));

        let Some(PendingAction::CallActivity { request }) = ctx.take_pending_action() else {
            panic!("expected a pending trackAvailability call");
        };
        assert_eq!(request.activity_name, ActivityKind::TrackAvailability);
        assert_eq!(request.data["name"], json!("workerAvailabilityTest"));
        assert_eq!(request.data["telemetry"]["success"], json!(false));

        let properties = &request.data["telemetry"]["properties"];
        assert_eq!(properties["activityName"], json!("getScanResult"));
        assert_eq!(properties["instanceId"], json!("inst-1"));
        assert_eq!(properties["isReplaying"], json!("false"));
        let serialized = properties["requestResponse"].as_str().unwrap();
        assert!(serialized.contains("\"statusCode\":404"));
    }

    #[test]
    fn test_track_availability_swallows_activity_failure() {
        let history = vec![HistoryEvent {
            action: PendingAction::activity(ActivityRequest {
                activity_name: ActivityKind::TrackAvailability,
                data: json!({}),
            }),
            outcome: ActionOutcome::ActivityFailed {
                activity: ActivityKind::TrackAvailability,
                failure: ActivityFailure::new("telemetry sink down"),
            },
            recorded_at: start(),
        }];
        let mut ctx = OrchestrationContext::new("inst-1", start(), history);
        let dispatcher = ActivityDispatcher::default();

        let result = dispatcher.track_availability(&mut ctx, true, TelemetryProperties::new());

        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_host_failure_is_not_escalated() {
        let history = vec![HistoryEvent::activity_failed(
            PendingAction::activity(ActivityRequest {
                activity_name: ActivityKind::GetScanStatus,
                data: json!({}),
            }),
            ActivityKind::GetScanStatus,
            ActivityFailure::new("executor crashed"),
            start(),
        )];
        let mut ctx = OrchestrationContext::new("inst-1", start(), history);
        let dispatcher = ActivityDispatcher::default();

        let result = dispatcher.call_web_request_activity(&mut ctx, &status_payload());

        assert!(matches!(
            result,
            Err(OrchestrationError::ActivityFailed { .. })
        ));
        assert!(ctx.pending_action().is_none());
    }

    #[test]
    fn test_malformed_result_is_escalated() {
        let history = vec![recorded(ActivityKind::GetScanStatus, json!("not a response"))];
        let mut ctx = OrchestrationContext::new("inst-1", start(), history);
        let dispatcher = ActivityDispatcher::default();

        let result = dispatcher.call_web_request_activity(&mut ctx, &status_payload());
        assert_eq!(result, Err(OrchestrationError::Suspended));

        let Some(PendingAction::CallActivity { request }) = ctx.take_pending_action() else {
            panic!("expected a pending trackAvailability call");
        };
        assert_eq!(request.activity_name, ActivityKind::TrackAvailability);
        assert_eq!(request.data["telemetry"]["success"], json!(false));
        assert_eq!(
            request.data["telemetry"]["properties"]["requestResponse"],
            json!("\"not a response\"")
        );
    }

    #[test]
    fn test_undecodable_body_fails_after_tracking() {
        let history = vec![
            recorded(
                ActivityKind::GetScanStatus,
                json!({"statusCode": 200, "body": {"run": "not an object"}}),
            ),
            recorded(ActivityKind::TrackAvailability, json!(null)),
        ];
        let mut ctx = OrchestrationContext::new("inst-1", start(), history);
        let dispatcher = ActivityDispatcher::default();

        let result = dispatcher
            .call_web_request_activity(&mut ctx, &status_payload())
            .and_then(|response| {
                dispatcher.decode_web_body::<crate::scan::ScanStatus>(
                    &mut ctx,
                    "getScanResult",
                    &response,
                )
            });

        assert!(matches!(
            result,
            Err(OrchestrationError::UnexpectedResponse { ref activity_label, .. })
                if activity_label == "getScanResult"
        ));
        assert_eq!(ctx.position(), 2);
    }
}
