//! Replay host
//!
//! The host module provides the `ReplayHost` which drives an orchestration
//! through repeated turns, performing each pending action with an
//! [`ActivityExecutor`] and a [`LogicalClock`].

mod clock;
mod driver;
mod executor;

pub use clock::{LogicalClock, SystemClock, VirtualClock};
pub use driver::{HostError, OrchestrationRun, ReplayHost};
pub use executor::{ActivityExecutor, HttpActivityExecutor};
