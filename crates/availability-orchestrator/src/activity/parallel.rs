//! Fan-out dispatch with a single join point

use super::ActivityRequest;
use crate::telemetry::{OrchestrationLogger, TelemetryProperties};
use crate::workflow::{OrchestrationContext, OrchestrationError};

/// Issues a batch of activities and suspends once on their conjunction
///
/// The host runs the batch concurrently and resumes the orchestration only
/// once every request has finished, so a partial fan-out is never observed.
#[derive(Debug, Clone, Default)]
pub struct ParallelDispatcher {
    logger: OrchestrationLogger,
}

impl ParallelDispatcher {
    /// Create a dispatcher that logs through `logger`
    pub fn new(logger: OrchestrationLogger) -> Self {
        Self { logger }
    }

    /// Run every request; an empty batch returns immediately without dispatching
    ///
    /// Results come back in request order.
    pub fn call_activities_in_parallel(
        &self,
        ctx: &mut OrchestrationContext,
        requests: Vec<ActivityRequest>,
        task_label: &str,
    ) -> Result<Vec<serde_json::Value>, OrchestrationError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let properties = TelemetryProperties::new()
            .with("taskLabel", task_label)
            .with("taskCount", requests.len().to_string());
        self.logger
            .log_step(ctx, &format!("Starting {task_label}"), Some(&properties));

        match ctx.schedule_activities(requests) {
            Err(err) if !err.is_control() => {
                self.logger.log_error(
                    ctx,
                    &format!("{task_label} failed: {err}"),
                    Some(&properties),
                );
                Err(err)
            }
            result => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityKind;
    use crate::workflow::{HistoryEvent, PendingAction};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn group_request(name: &str) -> ActivityRequest {
        ActivityRequest {
            activity_name: ActivityKind::RunFunctionalTestGroup,
            data: json!({"testGroupName": name}),
        }
    }

    #[test]
    fn test_empty_batch_dispatches_nothing() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut ctx = OrchestrationContext::new("inst-1", start, vec![]);
        let dispatcher = ParallelDispatcher::default();

        let results = dispatcher
            .call_activities_in_parallel(&mut ctx, vec![], "empty")
            .unwrap();

        assert!(results.is_empty());
        assert!(ctx.pending_action().is_none());
        assert_eq!(ctx.position(), 0);
    }

    #[test]
    fn test_batch_suspends_once_with_all_requests() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut ctx = OrchestrationContext::new("inst-1", start, vec![]);
        let dispatcher = ParallelDispatcher::default();

        let result = dispatcher.call_activities_in_parallel(
            &mut ctx,
            vec![group_request("PostScan"), group_request("ScanStatus")],
            "test groups",
        );

        assert_eq!(result, Err(OrchestrationError::Suspended));
        let Some(PendingAction::CallActivities { requests }) = ctx.take_pending_action() else {
            panic!("expected a fan-out");
        };
        assert_eq!(requests.len(), 2);
    }

    #[test]
    fn test_batch_resumes_with_results_in_order() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let requests = vec![group_request("PostScan"), group_request("ScanStatus")];
        let history = vec![HistoryEvent::activities_completed(
            PendingAction::activities(requests.clone()),
            vec![json!("first"), json!("second")],
            start,
        )];
        let mut ctx = OrchestrationContext::new("inst-1", start, history);
        let dispatcher = ParallelDispatcher::default();

        let results = dispatcher
            .call_activities_in_parallel(&mut ctx, requests, "test groups")
            .unwrap();

        assert_eq!(results, vec![json!("first"), json!("second")]);
    }
}
