//! Recorded history for replay

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PendingAction;
use crate::activity::{ActivityFailure, ActivityKind};

/// Outcome of one pending action as recorded by the host
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// A single activity returned a result
    ActivityCompleted {
        /// Result returned by the activity
        result: serde_json::Value,
    },

    /// Every activity of a fan-out returned a result, in request order
    ActivitiesCompleted {
        /// Results in the same order as the requests
        results: Vec<serde_json::Value>,
    },

    /// An activity failed; for a fan-out this fails the whole batch
    ActivityFailed {
        /// The activity that failed
        activity: ActivityKind,

        /// Failure details
        failure: ActivityFailure,
    },

    /// The timer reached its deadline
    TimerFired,
}

/// One entry of an instance's append-only history
///
/// There is exactly one entry per suspension point the orchestration has
/// passed. On every turn the orchestration runs again from the start and
/// consumes these entries in order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEvent {
    /// The action the orchestration requested
    pub action: PendingAction,

    /// What the host observed when performing it
    pub outcome: ActionOutcome,

    /// Host logical time at which the outcome was recorded
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEvent {
    /// Record a completed single activity
    pub fn activity_completed(
        action: PendingAction,
        result: serde_json::Value,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            action,
            outcome: ActionOutcome::ActivityCompleted { result },
            recorded_at,
        }
    }

    /// Record a completed fan-out
    pub fn activities_completed(
        action: PendingAction,
        results: Vec<serde_json::Value>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            action,
            outcome: ActionOutcome::ActivitiesCompleted { results },
            recorded_at,
        }
    }

    /// Record a failed activity or fan-out
    pub fn activity_failed(
        action: PendingAction,
        activity: ActivityKind,
        failure: ActivityFailure,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            action,
            outcome: ActionOutcome::ActivityFailed { activity, failure },
            recorded_at,
        }
    }

    /// Record a fired timer
    pub fn timer_fired(action: PendingAction, recorded_at: DateTime<Utc>) -> Self {
        Self {
            action,
            outcome: ActionOutcome::TimerFired,
            recorded_at,
        }
    }

    /// Check if this entry records a failure
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, ActionOutcome::ActivityFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityRequest;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_history_event_serialization() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 10).unwrap();
        let event = HistoryEvent::timer_fired(PendingAction::timer(at), at);

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"timer_fired\""));

        let parsed: HistoryEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, parsed);
    }

    #[test]
    fn test_is_failure() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let action = PendingAction::activity(ActivityRequest {
            activity_name: ActivityKind::HealthCheck,
            data: json!({}),
        });

        let failed = HistoryEvent::activity_failed(
            action.clone(),
            ActivityKind::HealthCheck,
            ActivityFailure::new("unreachable"),
            at,
        );
        let completed = HistoryEvent::activity_completed(action, json!({"statusCode": 200}), at);

        assert!(failed.is_failure());
        assert!(!completed.is_failure());
    }
}
