//! In-process replay host
//!
//! The `ReplayHost` drives one orchestration instance to completion:
//! - Runs a turn over the recorded history
//! - Performs the pending action (activity, fan-out or timer)
//! - Appends the outcome and runs the next turn
//!
//! History lives in memory only; a crashed run starts over.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, error, info, instrument, warn};

use super::{ActivityExecutor, LogicalClock};
use crate::config::HostConfig;
use crate::workflow::{
    run_turn, HistoryEvent, OrchestrationContext, OrchestrationError, PendingAction, TurnOutcome,
};

/// Errors from driving an instance
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Replay diverged from the recorded history
    #[error("replay error: {0}")]
    Replay(OrchestrationError),

    /// Too many turns
    #[error("instance {instance_id} exceeded {max_turns} turns")]
    TooManyTurns { instance_id: String, max_turns: usize },
}

/// A finished instance
#[derive(Debug, Clone)]
pub struct OrchestrationRun<T> {
    pub instance_id: String,

    /// Host time the instance started at
    pub start_time: DateTime<Utc>,

    /// Orchestration result
    pub output: Result<T, OrchestrationError>,

    /// Every recorded action, in order
    pub history: Vec<HistoryEvent>,

    /// Number of turns run
    pub turns: usize,
}

impl<T> OrchestrationRun<T> {
    /// Check if the orchestration returned normally
    pub fn is_success(&self) -> bool {
        self.output.is_ok()
    }
}

/// Replay host
///
/// # Example
///
/// ```ignore
/// let host = ReplayHost::new(HttpActivityExecutor::new(url), SystemClock);
/// let run = host
///     .run("instance-1", |ctx| availability_test_orchestration(ctx, &config, &scenarios))
///     .await?;
/// ```
pub struct ReplayHost<E: ActivityExecutor, C: LogicalClock> {
    executor: E,
    clock: C,
    config: HostConfig,
}

impl<E: ActivityExecutor, C: LogicalClock> ReplayHost<E, C> {
    /// Create a host with the default turn limit
    pub fn new(executor: E, clock: C) -> Self {
        Self::with_config(executor, clock, HostConfig::default())
    }

    pub fn with_config(executor: E, clock: C, config: HostConfig) -> Self {
        Self {
            executor,
            clock,
            config,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Drive `orchestration` until it completes or fails
    ///
    /// A failed orchestration is returned as a run with an `Err` output;
    /// only replay divergence and the turn limit are host errors.
    #[instrument(skip(self, orchestration))]
    pub async fn run<T, F>(
        &self,
        instance_id: &str,
        orchestration: F,
    ) -> Result<OrchestrationRun<T>, HostError>
    where
        F: Fn(&mut OrchestrationContext) -> Result<T, OrchestrationError>,
    {
        let start_time = self.clock.now();
        let mut history: Vec<HistoryEvent> = Vec::new();

        info!(%start_time, "starting orchestration");

        for turn in 1..=self.config.max_turns {
            match run_turn(instance_id, start_time, &history, &orchestration) {
                TurnOutcome::Suspended(action) => {
                    debug!(turn, action = %action.describe(), "performing pending action");
                    let event = self.perform(action).await;
                    if event.is_failure() {
                        warn!(turn, "activity failed");
                    }
                    history.push(event);
                }
                TurnOutcome::Completed(output) => {
                    info!(turn, events = history.len(), "orchestration completed");
                    return Ok(OrchestrationRun {
                        instance_id: instance_id.to_string(),
                        start_time,
                        output: Ok(output),
                        history,
                        turns: turn,
                    });
                }
                TurnOutcome::Failed(err) if err.is_control() => {
                    error!(turn, error = %err, "replay diverged");
                    return Err(HostError::Replay(err));
                }
                TurnOutcome::Failed(err) => {
                    warn!(turn, error = %err, "orchestration failed");
                    return Ok(OrchestrationRun {
                        instance_id: instance_id.to_string(),
                        start_time,
                        output: Err(err),
                        history,
                        turns: turn,
                    });
                }
            }
        }

        error!(max_turns = self.config.max_turns, "turn limit reached");
        Err(HostError::TooManyTurns {
            instance_id: instance_id.to_string(),
            max_turns: self.config.max_turns,
        })
    }

    /// Perform one action and record its outcome
    async fn perform(&self, action: PendingAction) -> HistoryEvent {
        match &action {
            PendingAction::CallActivity { request } => {
                let result = self.executor.execute(request).await;
                let activity = request.activity_name;
                match result {
                    Ok(value) => HistoryEvent::activity_completed(action, value, self.clock.now()),
                    Err(failure) => {
                        HistoryEvent::activity_failed(action, activity, failure, self.clock.now())
                    }
                }
            }
            PendingAction::CallActivities { requests } => {
                let results =
                    join_all(requests.iter().map(|request| self.executor.execute(request))).await;

                // All-or-nothing: the first failure fails the batch.
                let mut values = Vec::with_capacity(results.len());
                let mut failed = None;
                for (request, result) in requests.iter().zip(results) {
                    match result {
                        Ok(value) => values.push(value),
                        Err(failure) => {
                            failed = Some((request.activity_name, failure));
                            break;
                        }
                    }
                }

                match failed {
                    Some((activity, failure)) => {
                        HistoryEvent::activity_failed(action, activity, failure, self.clock.now())
                    }
                    None => HistoryEvent::activities_completed(action, values, self.clock.now()),
                }
            }
            PendingAction::CreateTimer { fire_at } => {
                let fire_at = *fire_at;
                self.clock.sleep_until(fire_at).await;
                HistoryEvent::timer_fired(action, self.clock.now().max(fire_at))
            }
        }
    }
}
