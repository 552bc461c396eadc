//! # Availability Test Orchestrator
//!
//! Replay-driven orchestration of end-to-end availability tests against an
//! accessibility scan service.
//!
//! ## Features
//!
//! - **Replay model**: orchestration code is an ordinary function re-run from the start on
//!   every turn over an ordered history of recorded results
//! - **Activity dispatch**: single calls and joined fan-outs, with status-code checks and
//!   exactly-once failure escalation
//! - **Durable waits**: one bounded polling loop over logical-time timers, parameterized by
//!   wait conditions
//! - **Scenarios**: phase-by-phase drivers that keep running functional test groups after a
//!   step fails
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │          scenario (drivers, top-level orchestration)        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │        steps  ──►  wait  ──►  activity (dispatchers)        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │   workflow (OrchestrationContext, run_turn, history)        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │   host (ReplayHost, ActivityExecutor, LogicalClock)         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use availability_orchestrator::prelude::*;
//!
//! let config = AvailabilityTestConfig::from_env();
//! let scenarios = default_scenarios(&config);
//! let host = ReplayHost::new(HttpActivityExecutor::new(url), SystemClock);
//!
//! let run = host
//!     .run("instance-1", |ctx| availability_test_orchestration(ctx, &config, &scenarios))
//!     .await?;
//! ```

pub mod activity;
pub mod config;
pub mod host;
pub mod scan;
pub mod scenario;
pub mod steps;
pub mod telemetry;
pub mod wait;
pub mod workflow;

/// Prelude for common imports
pub mod prelude {
    pub use crate::activity::{
        ActivityDispatcher, ActivityFailure, ActivityKind, ActivityRequest, ParallelDispatcher,
        WebApiResponse,
    };
    pub use crate::config::{AvailabilityTestConfig, ConfigError, HostConfig};
    pub use crate::host::{
        ActivityExecutor, HostError, HttpActivityExecutor, LogicalClock, OrchestrationRun,
        ReplayHost, SystemClock, VirtualClock,
    };
    pub use crate::scan::{ScanRequestOptions, ScanStatus};
    pub use crate::scenario::{
        availability_test_orchestration, default_scenarios, AvailabilityTestSummary,
        ScenarioDefinition, SingleScanScenario,
    };
    pub use crate::steps::OrchestrationSteps;
    pub use crate::telemetry::{OrchestrationLogger, TelemetryProperties};
    pub use crate::wait::{ScanWaitCondition, WaitCondition, WaitOrchestrator, WaitTimeouts};
    pub use crate::workflow::{
        run_turn, HistoryEvent, OrchestrationContext, OrchestrationError, PendingAction,
        TurnOutcome,
    };
}

// Re-export commonly used types at crate root
pub use config::AvailabilityTestConfig;
pub use host::ReplayHost;
pub use scenario::{availability_test_orchestration, AvailabilityTestSummary};
pub use workflow::{OrchestrationContext, OrchestrationError};
