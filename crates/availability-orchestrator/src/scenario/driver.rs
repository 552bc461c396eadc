//! Single-scan scenario driver

use serde::{Deserialize, Serialize};

use super::{ScenarioDefinition, TestContextData, TestGroupName};
use crate::steps::OrchestrationSteps;
use crate::telemetry::TelemetryProperties;
use crate::workflow::{OrchestrationContext, OrchestrationError};

/// Drives one scenario through its three phases
///
/// The driver is the only layer that catches step errors. A caught failure
/// sets `encountered_error`, after which no further wait is attempted; every
/// configured test-group batch still runs exactly once so the functional
/// tests can observe and report the failure. Control errors are always
/// re-raised.
#[derive(Debug, Clone)]
pub struct SingleScanScenario {
    definition: ScenarioDefinition,
    test_context: TestContextData,
    encountered_error: bool,
}

/// Final state of one scenario
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSummary {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_id: Option<String>,

    pub encountered_error: bool,
}

impl SingleScanScenario {
    pub fn new(definition: ScenarioDefinition) -> Self {
        let test_context = TestContextData::new(definition.scan_url.clone());
        Self {
            definition,
            test_context,
            encountered_error: false,
        }
    }

    pub fn definition(&self) -> &ScenarioDefinition {
        &self.definition
    }

    pub fn test_context(&self) -> &TestContextData {
        &self.test_context
    }

    pub fn encountered_error(&self) -> bool {
        self.encountered_error
    }

    pub fn scan_id(&self) -> Option<&str> {
        self.test_context.scan_id.as_deref()
    }

    pub fn summary(&self) -> ScenarioSummary {
        ScenarioSummary {
            name: self.definition.name.clone(),
            scan_id: self.test_context.scan_id.clone(),
            encountered_error: self.encountered_error,
        }
    }

    /// Submit the scan, run post-submission groups, validate the submission
    pub fn submit_scan_phase(
        &mut self,
        steps: &OrchestrationSteps<'_>,
        ctx: &mut OrchestrationContext,
    ) -> Result<(), OrchestrationError> {
        let submitted = steps.invoke_submit_scan_request_rest_api(
            ctx,
            &self.definition.scan_url,
            &self.definition.scan_options,
        );
        match submitted {
            Ok(scan_id) => self.test_context.scan_id = Some(scan_id),
            Err(err) => self.handle_step_error(steps, ctx, "invokeSubmitScanRequestRestApi", err)?,
        }

        let groups = self.definition.test_groups.post_scan_submission.clone();
        self.run_test_groups(steps, ctx, &groups)?;

        if let Some(scan_id) = self.pending_scan_id() {
            if let Err(err) = steps.validate_scan_request_submission_state(ctx, &scan_id) {
                self.handle_step_error(steps, ctx, "validateScanRequestSubmissionState", err)?;
            }
        }

        Ok(())
    }

    /// Wait for the base scan, then run post-completion and report groups
    pub fn wait_for_scan_completion_phase(
        &mut self,
        steps: &OrchestrationSteps<'_>,
        ctx: &mut OrchestrationContext,
    ) -> Result<(), OrchestrationError> {
        if let Some(scan_id) = self.pending_scan_id() {
            match steps.wait_for_base_scan_completion(ctx, &scan_id) {
                Ok(status) => {
                    if let Some(report_id) = status.first_report_id() {
                        self.test_context.report_id = Some(report_id.to_string());
                    }
                }
                Err(err) => self.handle_step_error(steps, ctx, "waitForBaseScanCompletion", err)?,
            }
        }

        let groups = self.definition.test_groups.post_scan_completion.clone();
        self.run_test_groups(steps, ctx, &groups)?;

        let groups = self.definition.test_groups.scan_reports.clone();
        self.run_test_groups(steps, ctx, &groups)
    }

    /// Optional deep-scan and notification waits, then overall completion
    pub fn after_scan_completed_phase(
        &mut self,
        steps: &OrchestrationSteps<'_>,
        ctx: &mut OrchestrationContext,
    ) -> Result<(), OrchestrationError> {
        if self.definition.scan_options.deep_scan {
            if let Some(scan_id) = self.pending_scan_id() {
                if let Err(err) = steps.wait_for_deep_scan_completion(ctx, &scan_id) {
                    self.handle_step_error(steps, ctx, "waitForDeepScanCompletion", err)?;
                }
            }

            let groups = self.definition.test_groups.post_deep_scan_completion.clone();
            self.run_test_groups(steps, ctx, &groups)?;
        }

        if self.definition.scan_options.scan_notification_url.is_some() {
            if let Some(scan_id) = self.pending_scan_id() {
                if let Err(err) = steps.wait_for_scan_completion_notification(ctx, &scan_id) {
                    self.handle_step_error(steps, ctx, "waitForScanCompletionNotification", err)?;
                }
            }

            let groups = self
                .definition
                .test_groups
                .post_scan_completion_notification
                .clone();
            self.run_test_groups(steps, ctx, &groups)?;
        }

        if !self.encountered_error {
            steps.track_scan_request_completed(ctx)?;
        }

        Ok(())
    }

    /// Scan id to wait on, unless an earlier step already failed
    fn pending_scan_id(&self) -> Option<String> {
        if self.encountered_error {
            return None;
        }
        self.test_context.scan_id.clone()
    }

    fn run_test_groups(
        &mut self,
        steps: &OrchestrationSteps<'_>,
        ctx: &mut OrchestrationContext,
        groups: &[TestGroupName],
    ) -> Result<(), OrchestrationError> {
        let result =
            steps.run_functional_test_groups(ctx, &self.definition.name, &self.test_context, groups);
        match result {
            Ok(()) => Ok(()),
            Err(err) => self.handle_step_error(steps, ctx, "runFunctionalTestGroups", err),
        }
    }

    fn handle_step_error(
        &mut self,
        steps: &OrchestrationSteps<'_>,
        ctx: &OrchestrationContext,
        step: &str,
        err: OrchestrationError,
    ) -> Result<(), OrchestrationError> {
        if err.is_control() {
            return Err(err);
        }

        self.encountered_error = true;
        let properties = TelemetryProperties::new()
            .with("scenario", self.definition.name.as_str())
            .with("step", step);
        steps.logger().log_error(
            ctx,
            &format!("Scenario {} step {step} failed: {err}", self.definition.name),
            Some(&properties),
        );
        Ok(())
    }
}
