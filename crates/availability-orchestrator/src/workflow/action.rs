//! Pending actions produced at suspension points

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::activity::{ActivityKind, ActivityRequest};

/// The side effect a turn is waiting on
///
/// A turn stops at the first suspension point without a recorded result and
/// hands one of these to the host. The host performs it and appends the
/// outcome to the history as a [`HistoryEvent`](super::HistoryEvent).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PendingAction {
    /// Run a single activity
    CallActivity {
        /// The request to send to the activity executor
        request: ActivityRequest,
    },

    /// Run all activities and resume once every one has finished
    CallActivities {
        /// Requests with no ordering relative to each other
        requests: Vec<ActivityRequest>,
    },

    /// Resume once the host's logical time reaches `fire_at`
    CreateTimer {
        /// Logical time at which the timer fires
        fire_at: DateTime<Utc>,
    },
}

impl PendingAction {
    /// Create a single activity action
    pub fn activity(request: ActivityRequest) -> Self {
        Self::CallActivity { request }
    }

    /// Create a fan-out action
    pub fn activities(requests: Vec<ActivityRequest>) -> Self {
        Self::CallActivities { requests }
    }

    /// Create a durable timer action
    pub fn timer(fire_at: DateTime<Utc>) -> Self {
        Self::CreateTimer { fire_at }
    }

    /// Activity names carried by this action, in order
    pub fn activity_names(&self) -> Vec<ActivityKind> {
        match self {
            Self::CallActivity { request } => vec![request.activity_name],
            Self::CallActivities { requests } => {
                requests.iter().map(|r| r.activity_name).collect()
            }
            Self::CreateTimer { .. } => vec![],
        }
    }

    /// Whether `other` is the same kind of action over the same activities
    ///
    /// Payloads and timer deadlines are not compared; telemetry payloads
    /// legitimately differ between the first execution and a replay.
    pub fn same_shape(&self, other: &PendingAction) -> bool {
        match (self, other) {
            (Self::CallActivity { .. }, Self::CallActivity { .. })
            | (Self::CallActivities { .. }, Self::CallActivities { .. }) => {
                self.activity_names() == other.activity_names()
            }
            (Self::CreateTimer { .. }, Self::CreateTimer { .. }) => true,
            _ => false,
        }
    }

    /// Short human readable description for logs and error messages
    pub fn describe(&self) -> String {
        match self {
            Self::CallActivity { request } => format!("activity {}", request.activity_name),
            Self::CallActivities { requests } => {
                format!("{} parallel activities", requests.len())
            }
            Self::CreateTimer { fire_at } => format!("timer at {}", fire_at.to_rfc3339()),
        }
    }
}
