//! Orchestration context: the replay cursor behind every suspension point

use chrono::{DateTime, Utc};

use super::{ActionOutcome, HistoryEvent, OrchestrationError, PendingAction};
use crate::activity::ActivityRequest;

/// Execution context handed to orchestration code on every turn
///
/// The context owns the instance's recorded history and a cursor into it.
/// Each suspension point ([`schedule_activity`](Self::schedule_activity),
/// [`schedule_activities`](Self::schedule_activities),
/// [`create_timer`](Self::create_timer)) either returns the outcome recorded at
/// the cursor, or, once the history is exhausted, stores the requested action
/// and returns [`OrchestrationError::Suspended`].
///
/// All time reads in orchestration code must go through
/// [`current_utc_date_time`](Self::current_utc_date_time). It starts at the
/// instance start time and advances to the `recorded_at` of each consumed
/// history entry, so it is identical on every replay.
#[derive(Debug)]
pub struct OrchestrationContext {
    instance_id: String,
    start_time: DateTime<Utc>,
    current_time: DateTime<Utc>,
    history: Vec<HistoryEvent>,
    cursor: usize,
    pending: Option<PendingAction>,
}

impl OrchestrationContext {
    /// Create a context positioned at the start of `history`
    pub fn new(
        instance_id: impl Into<String>,
        start_time: DateTime<Utc>,
        history: Vec<HistoryEvent>,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            start_time,
            current_time: start_time,
            history,
            cursor: 0,
            pending: None,
        }
    }

    /// Workflow instance identifier
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Time the instance started
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Deterministic logical time of the host
    pub fn current_utc_date_time(&self) -> DateTime<Utc> {
        self.current_time
    }

    /// Whether the code is currently re-executing already recorded steps
    pub fn is_replaying(&self) -> bool {
        self.cursor < self.history.len()
    }

    /// Number of history entries consumed so far this turn
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Number of recorded entries this turn started with
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// The action this turn suspended on, if any
    pub fn pending_action(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    /// Take the action this turn suspended on
    pub fn take_pending_action(&mut self) -> Option<PendingAction> {
        self.pending.take()
    }

    /// Suspension point: run one activity and resume with its result
    pub fn schedule_activity(
        &mut self,
        request: ActivityRequest,
    ) -> Result<serde_json::Value, OrchestrationError> {
        let activity = request.activity_name;
        match self.next_outcome(PendingAction::activity(request))? {
            ActionOutcome::ActivityCompleted { result } => Ok(result),
            ActionOutcome::ActivityFailed { failure, .. } => {
                Err(OrchestrationError::ActivityFailed {
                    activity,
                    message: failure.message,
                })
            }
            other => Err(self.outcome_mismatch("activity result", &other)),
        }
    }

    /// Suspension point: run all activities and resume once with every result
    ///
    /// Results come back in request order. A failure of any one request fails
    /// the whole batch; partial results are never observed.
    pub fn schedule_activities(
        &mut self,
        requests: Vec<ActivityRequest>,
    ) -> Result<Vec<serde_json::Value>, OrchestrationError> {
        let expected = requests.len();
        match self.next_outcome(PendingAction::activities(requests))? {
            ActionOutcome::ActivitiesCompleted { results } if results.len() == expected => {
                Ok(results)
            }
            ActionOutcome::ActivityFailed { activity, failure } => {
                Err(OrchestrationError::ActivityFailed {
                    activity,
                    message: failure.message,
                })
            }
            other => Err(self.outcome_mismatch("fan-out results", &other)),
        }
    }

    /// Suspension point: durable timer firing at `fire_at`
    pub fn create_timer(&mut self, fire_at: DateTime<Utc>) -> Result<(), OrchestrationError> {
        match self.next_outcome(PendingAction::timer(fire_at))? {
            ActionOutcome::TimerFired => Ok(()),
            other => Err(self.outcome_mismatch("timer fired", &other)),
        }
    }

    fn next_outcome(&mut self, action: PendingAction) -> Result<ActionOutcome, OrchestrationError> {
        // A turn suspends at most once; code that swallowed the first
        // suspension keeps getting it.
        if self.pending.is_some() {
            return Err(OrchestrationError::Suspended);
        }

        let Some(event) = self.history.get(self.cursor) else {
            self.pending = Some(action);
            return Err(OrchestrationError::Suspended);
        };

        if !event.action.same_shape(&action) {
            return Err(OrchestrationError::NonDeterminism {
                index: self.cursor,
                message: format!(
                    "recorded {} but orchestration requested {}",
                    event.action.describe(),
                    action.describe()
                ),
            });
        }

        if event.recorded_at > self.current_time {
            self.current_time = event.recorded_at;
        }
        let outcome = event.outcome.clone();
        self.cursor += 1;

        Ok(outcome)
    }

    fn outcome_mismatch(&self, expected: &str, found: &ActionOutcome) -> OrchestrationError {
        OrchestrationError::NonDeterminism {
            index: self.cursor.saturating_sub(1),
            message: format!("expected {expected}, history recorded {found:?}"),
        }
    }
}
