//! Polling waits
//!
//! - [`WaitCondition`] predicate pairs over a polled [`ScanStatus`](crate::scan::ScanStatus)
//! - [`ScanWaitCondition`], the three conditions used by the availability test
//! - [`WaitOrchestrator`], the single bounded-time polling loop

mod condition;
mod orchestrator;

pub use condition::{ScanWaitCondition, WaitCondition};
pub use orchestrator::{WaitOrchestrator, WaitTimeouts};
