//! Master election.
//!
//! Liveness is judged solely by check-ins visible in the shared database.
//! When the current master looks stale, this node asks the database to
//! hand it the role; the database procedure re-checks staleness under row
//! locks so concurrent claims produce exactly one winner. The local master
//! flag only changes when the resulting `masterAssigned` event is applied.

use crate::domain::cluster::{master_is_stale, MasterClaim};
use crate::domain::foundation::{DomainError, Timestamp};

use super::AppContext;

/// Claims the master role if the current master is missing.
///
/// Returns `None` when the master is fresh (no claim attempted), otherwise
/// the outcome of the claim.
pub async fn check_master(ctx: &AppContext) -> Result<Option<MasterClaim>, DomainError> {
    let missing_after = ctx.cluster.master_missing_after();
    let master_check_in = ctx.nodes.master_check_in().await?;

    if !master_is_stale(master_check_in, Timestamp::now(), missing_after) {
        return Ok(None);
    }

    tracing::warn!(
        node_id = %ctx.node_id,
        last_master_check_in = ?master_check_in.map(|t| t.as_unix_secs()),
        "Master missing, requesting master role"
    );

    let claim = ctx.nodes.request_master_role(&ctx.node_id, missing_after).await?;
    match claim {
        MasterClaim::Granted => tracing::info!(node_id = %ctx.node_id, "Master role granted"),
        MasterClaim::Rejected => {
            tracing::debug!(node_id = %ctx.node_id, "Master role request rejected, master is alive")
        }
    }
    Ok(Some(claim))
}
