//! Wait conditions over a polled scan status

use crate::scan::{NotificationState, RunState, ScanState, ScanStatus};

/// A pair of pure predicates that parameterize the wait loop
///
/// Missing sub-fields must make both predicates return `false`, so an
/// incomplete status keeps the loop polling.
pub trait WaitCondition {
    /// The awaited state has been reached
    fn is_succeeded(&self, status: &ScanStatus) -> bool;

    /// A terminal failure state has been reached
    fn is_failed(&self, status: &ScanStatus) -> bool;
}

/// The conditions used by the availability test waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanWaitCondition {
    /// The base scan produced a verdict
    BaseScan,

    /// The deep scan run completed
    DeepScan,

    /// The completion notification reached a terminal delivery state
    ScanNotification,
}

impl WaitCondition for ScanWaitCondition {
    fn is_succeeded(&self, status: &ScanStatus) -> bool {
        match self {
            Self::BaseScan => matches!(
                status.scan_state(),
                Some(ScanState::Pass | ScanState::Fail)
            ),
            Self::DeepScan => status.run_state() == Some(RunState::Completed),
            // sendFailed is terminal: it is the expected outcome when the
            // notify endpoint under test rejects the call.
            Self::ScanNotification => matches!(
                status.notification_state(),
                Some(NotificationState::Sent | NotificationState::SendFailed)
            ),
        }
    }

    fn is_failed(&self, status: &ScanStatus) -> bool {
        match self {
            Self::BaseScan | Self::DeepScan => status.run_state() == Some(RunState::Failed),
            Self::ScanNotification => {
                status.notification_state() == Some(NotificationState::QueueFailed)
            }
        }
    }
}
