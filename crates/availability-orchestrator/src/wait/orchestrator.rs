//! Bounded-time polling loop over durable timers

use chrono::{DateTime, Duration, Utc};

use super::WaitCondition;
use crate::activity::payload::GetScanResultData;
use crate::activity::ActivityDispatcher;
use crate::scan::ScanStatus;
use crate::telemetry::TelemetryProperties;
use crate::workflow::{OrchestrationContext, OrchestrationError};

/// Time bounds for one wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTimeouts {
    /// Total time allowed before the wait times out
    pub max_wait: Duration,

    /// Delay between status polls
    pub poll_interval: Duration,
}

impl WaitTimeouts {
    /// Bounds from a maximum wait and a poll interval
    pub fn new(max_wait: Duration, poll_interval: Duration) -> Self {
        Self {
            max_wait,
            poll_interval,
        }
    }

    /// Bounds from whole seconds
    ///
    /// Values beyond the representable range saturate; `wait_for` then
    /// rejects them as an invalid wait.
    pub fn from_seconds(max_wait: i64, poll_interval: i64) -> Self {
        Self::new(saturating_seconds(max_wait), saturating_seconds(poll_interval))
    }
}

/// Generic wait loop shared by every scan wait
///
/// One shape serves base-scan completion, deep-scan completion and the
/// completion notification; only the [`WaitCondition`] and the
/// [`WaitTimeouts`] differ.
#[derive(Debug, Clone, Default)]
pub struct WaitOrchestrator {
    dispatcher: ActivityDispatcher,
}

impl WaitOrchestrator {
    /// Create a wait loop that polls and escalates through `dispatcher`
    pub fn new(dispatcher: ActivityDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Poll `scan_id` until `condition` succeeds, fails, or time runs out
    ///
    /// Each iteration suspends on a durable timer at `now + poll_interval`,
    /// then checks the status. All time reads come from the context's logical
    /// clock. Returns the status on success. On a failed condition (which
    /// takes precedence when both predicates hold) or on timeout, emits one
    /// failed availability record carrying the last observed status and
    /// returns an error.
    pub fn wait_for<C: WaitCondition + ?Sized>(
        &self,
        ctx: &mut OrchestrationContext,
        scan_id: &str,
        activity_label: &str,
        timeouts: WaitTimeouts,
        condition: &C,
    ) -> Result<ScanStatus, OrchestrationError> {
        if timeouts.poll_interval <= Duration::zero() {
            return Err(OrchestrationError::InvalidWait {
                activity_label: activity_label.to_string(),
                message: "poll interval must be positive".to_string(),
            });
        }

        let wait_start = ctx.current_utc_date_time();
        let wait_end = offset(wait_start, timeouts.max_wait, activity_label)?;
        let mut completed = false;
        let mut last_status: Option<ScanStatus> = None;

        self.dispatcher.logger().log_step(
            ctx,
            &format!("Starting {activity_label}"),
            Some(&timing_properties(scan_id, wait_start, wait_end)),
        );

        while !completed && ctx.current_utc_date_time() < wait_end {
            let fire_at = offset(
                ctx.current_utc_date_time(),
                timeouts.poll_interval,
                activity_label,
            )?;
            ctx.create_timer(fire_at)?;

            let status = self.get_scan_status(ctx, scan_id, activity_label)?;
            completed = condition.is_succeeded(&status) || condition.is_failed(&status);
            last_status = Some(status);
        }

        let elapsed_seconds = (ctx.current_utc_date_time() - wait_start).num_seconds();
        let properties = timing_properties(scan_id, wait_start, wait_end)
            .with("activityName", activity_label)
            .with("totalWaitTimeInSeconds", elapsed_seconds.to_string());

        match last_status {
            Some(status) if completed && !condition.is_failed(&status) => {
                self.dispatcher.logger().log_step(
                    ctx,
                    &format!("{activity_label} succeeded"),
                    Some(&properties),
                );
                Ok(status)
            }
            last_status => {
                let properties = properties
                    .with("requestResponse", serde_json::to_string(&last_status)?);
                self.dispatcher.logger().log_error(
                    ctx,
                    &format!("{activity_label} failed after {elapsed_seconds}s"),
                    Some(&properties),
                );
                self.dispatcher.track_availability(ctx, false, properties)?;

                let activity_label = activity_label.to_string();
                let scan_id = scan_id.to_string();
                Err(if completed {
                    OrchestrationError::WaitFailed {
                        activity_label,
                        scan_id,
                        elapsed_seconds,
                    }
                } else {
                    OrchestrationError::WaitTimedOut {
                        activity_label,
                        scan_id,
                        elapsed_seconds,
                    }
                })
            }
        }
    }

    /// Fetch the current status of a scan
    ///
    /// An unsuccessful status code or a body that does not decode is escalated
    /// by the dispatcher. A status that carries a service-level error is
    /// escalated here.
    pub fn get_scan_status(
        &self,
        ctx: &mut OrchestrationContext,
        scan_id: &str,
        activity_label: &str,
    ) -> Result<ScanStatus, OrchestrationError> {
        let response = self.dispatcher.call_web_request_activity(
            ctx,
            &GetScanResultData {
                scan_id: scan_id.to_string(),
            },
        )?;
        let status: ScanStatus = self
            .dispatcher
            .decode_web_body(ctx, activity_label, &response)?;

        if let Some(error) = &status.error {
            let properties = TelemetryProperties::new()
                .with("activityName", activity_label)
                .with("scanId", scan_id)
                .with("requestResponse", serde_json::to_string(&response)?);
            self.dispatcher.logger().log_error(
                ctx,
                &format!("Scan status for {scan_id} reported an error"),
                Some(&properties),
            );
            self.dispatcher.track_availability(ctx, false, properties)?;

            return Err(OrchestrationError::ScanStatusError {
                scan_id: scan_id.to_string(),
                message: error.describe(),
            });
        }

        Ok(status)
    }
}

fn saturating_seconds(seconds: i64) -> Duration {
    Duration::try_seconds(seconds).unwrap_or(if seconds < 0 {
        Duration::MIN
    } else {
        Duration::MAX
    })
}

fn offset(
    at: DateTime<Utc>,
    by: Duration,
    activity_label: &str,
) -> Result<DateTime<Utc>, OrchestrationError> {
    at.checked_add_signed(by)
        .ok_or_else(|| OrchestrationError::InvalidWait {
            activity_label: activity_label.to_string(),
            message: format!("{by} past {at} is out of range"),
        })
}

fn timing_properties(
    scan_id: &str,
    wait_start: DateTime<Utc>,
    wait_end: DateTime<Utc>,
) -> TelemetryProperties {
    TelemetryProperties::new()
        .with("scanId", scan_id)
        .with("waitStartTime", wait_start.to_rfc3339())
        .with("waitEndTime", wait_end.to_rfc3339())
}
