//! Replay primitives
//!
//! This module contains the deterministic core every orchestration runs on:
//! - [`OrchestrationContext`] with the three suspension points
//! - [`PendingAction`] handed to the host when a turn suspends
//! - [`HistoryEvent`] entries recorded by the host
//! - [`run_turn`], the pure step function over a history

mod action;
mod context;
mod error;
mod event;
mod turn;

pub use action::PendingAction;
pub use context::OrchestrationContext;
pub use error::OrchestrationError;
pub use event::{ActionOutcome, HistoryEvent};
pub use turn::{run_turn, TurnOutcome};
