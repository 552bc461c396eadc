//! The pure step function that drives one replay turn

use chrono::{DateTime, Utc};

use super::{HistoryEvent, OrchestrationContext, OrchestrationError, PendingAction};

/// Result of running an orchestration once over its recorded history
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome<T> {
    /// The orchestration needs the host to perform this action
    Suspended(PendingAction),

    /// The orchestration returned normally
    Completed(T),

    /// The orchestration returned an error, or replay diverged
    Failed(OrchestrationError),
}

/// Run `orchestration` from the start over `history`
///
/// This is a pure function of its inputs: the same history always yields the
/// same outcome and the same pending action. A terminal outcome that leaves
/// recorded entries unconsumed is reported as non-determinism, since the code
/// no longer takes the path the history was recorded on.
pub fn run_turn<T, F>(
    instance_id: &str,
    start_time: DateTime<Utc>,
    history: &[HistoryEvent],
    orchestration: F,
) -> TurnOutcome<T>
where
    F: FnOnce(&mut OrchestrationContext) -> Result<T, OrchestrationError>,
{
    let mut ctx = OrchestrationContext::new(instance_id, start_time, history.to_vec());
    let result = orchestration(&mut ctx);

    if let Some(action) = ctx.take_pending_action() {
        // Code may have turned the suspension into another error; the pending
        // action still wins.
        return match result {
            Err(OrchestrationError::NonDeterminism { index, message }) => {
                TurnOutcome::Failed(OrchestrationError::NonDeterminism { index, message })
            }
            _ => TurnOutcome::Suspended(action),
        };
    }

    match result {
        Err(OrchestrationError::Suspended) => {
            TurnOutcome::Failed(OrchestrationError::NonDeterminism {
                index: ctx.position(),
                message: "suspended without a pending action".to_string(),
            })
        }
        _ if ctx.position() < ctx.history_len() => {
            TurnOutcome::Failed(OrchestrationError::NonDeterminism {
                index: ctx.position(),
                message: format!(
                    "orchestration finished after {} of {} recorded steps",
                    ctx.position(),
                    ctx.history_len()
                ),
            })
        }
        Ok(value) => TurnOutcome::Completed(value),
        Err(error) => TurnOutcome::Failed(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{ActivityKind, ActivityRequest};
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn health_request() -> ActivityRequest {
        ActivityRequest {
            activity_name: ActivityKind::HealthCheck,
            data: json!({}),
        }
    }

    fn sleep_then_check(ctx: &mut OrchestrationContext) -> Result<String, OrchestrationError> {
        let fire_at = ctx.current_utc_date_time() + Duration::seconds(10);
        ctx.create_timer(fire_at)?;
        let result = ctx.schedule_activity(health_request())?;
        Ok(result["status"].as_str().unwrap_or_default().to_string())
    }

    #[test]
    fn test_first_turn_suspends_on_timer() {
        let outcome = run_turn("inst-1", start(), &[], sleep_then_check);

        assert_eq!(
            outcome,
            TurnOutcome::Suspended(PendingAction::timer(start() + Duration::seconds(10)))
        );
    }

    #[test]
    fn test_turn_completes_with_full_history() {
        let fire_at = start() + Duration::seconds(10);
        let history = vec![
            HistoryEvent::timer_fired(PendingAction::timer(fire_at), fire_at),
            HistoryEvent::activity_completed(
                PendingAction::activity(health_request()),
                json!({"status": "healthy"}),
                fire_at,
            ),
        ];

        let outcome = run_turn("inst-1", start(), &history, sleep_then_check);

        assert_eq!(outcome, TurnOutcome::Completed("healthy".to_string()));
    }

    #[test]
    fn test_unconsumed_history_is_non_deterministic() {
        let history = vec![HistoryEvent::activity_completed(
            PendingAction::activity(health_request()),
            json!({}),
            start(),
        )];

        let outcome = run_turn("inst-1", start(), &history, |_ctx| Ok(()));

        assert!(matches!(
            outcome,
            TurnOutcome::Failed(OrchestrationError::NonDeterminism { index: 0, .. })
        ));
    }

    #[test]
    fn test_swallowed_suspension_still_suspends() {
        let outcome = run_turn("inst-1", start(), &[], |ctx| {
            let _ = ctx.schedule_activity(health_request());
            Ok(())
        });

        assert!(matches!(outcome, TurnOutcome::Suspended(_)));
    }

    #[test]
    fn test_failure_is_terminal() {
        let outcome: TurnOutcome<()> = run_turn("inst-1", start(), &[], |_ctx| {
            Err(OrchestrationError::Serialization("bad".to_string()))
        });

        assert!(matches!(
            outcome,
            TurnOutcome::Failed(OrchestrationError::Serialization(_))
        ));
    }
}
