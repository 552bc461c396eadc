//! Scenarios
//!
//! A scenario is a statically configured end-to-end run against the scan
//! service: submit one scan, wait for it, and run functional test groups
//! after each phase.

mod definition;
mod driver;
mod orchestration;

pub use definition::{
    default_scenarios, ScenarioDefinition, ScenarioTestGroups, TestContextData, TestGroupName,
    TestIdentifier,
};
pub use driver::{ScenarioSummary, SingleScanScenario};
pub use orchestration::{availability_test_orchestration, AvailabilityTestSummary};
