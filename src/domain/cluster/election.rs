//! Master staleness rule shared by the election caller and the in-memory
//! implementation of the atomic master claim.

use crate::domain::foundation::Timestamp;

/// Returns true when the current master has missed its check-in window.
///
/// A cluster without any master counts as stale so the first heartbeat
/// after bootstrap can claim the role.
pub fn master_is_stale(master_check_in: Option<Timestamp>, now: Timestamp, missing_after_secs: i64) -> bool {
    match master_check_in {
        None => true,
        Some(check_in) => now.is_after(&check_in.plus_secs(missing_after_secs)),
    }
}

/// Outcome of one atomic master claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterClaim {
    /// The requester is now master; role events were queued for every node.
    Granted,
    /// The master was fresh by the time the claim was validated.
    Rejected,
}

impl MasterClaim {
    /// Maps the status code returned by `master_role_request`.
    pub fn from_status(status: i32) -> Self {
        if status == 1 {
            MasterClaim::Granted
        } else {
            MasterClaim::Rejected
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, MasterClaim::Granted)
    }
}
