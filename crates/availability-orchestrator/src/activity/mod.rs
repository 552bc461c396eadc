//! Activity dispatch
//!
//! Activities are the only side effects an orchestration performs. They:
//! - Are identified by a closed [`ActivityKind`]
//! - Carry a typed payload bound to that kind ([`ActivityPayload`])
//! - Are issued one at a time ([`ActivityDispatcher`]) or as a joined
//!   fan-out ([`ParallelDispatcher`])

mod definition;
mod dispatcher;
mod parallel;
pub mod payload;

pub use definition::{ActivityFailure, ActivityKind, ActivityPayload, ActivityRequest, WebApiResponse};
pub use dispatcher::ActivityDispatcher;
pub use parallel::ParallelDispatcher;
