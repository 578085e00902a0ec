//! Mailbox consumer: applies this node's pending node events.
//!
//! Rows are applied strictly in id order. A decode or handler error stops
//! the cycle: the rows applied so far are deleted, the failed row and
//! everything after it stay queued for the next poll. Effects already
//! applied are not rolled back, so every handler has to tolerate seeing
//! the same event twice.

use serde_json::json;

use crate::domain::cluster::{ClusterEvent, ClusterEventContent, EventTarget, NodeEventContent};
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::MailboxRow;

use super::AppContext;

/// Runs one poll cycle. Returns the number of events applied.
pub async fn process_events(ctx: &AppContext) -> Result<usize, DomainError> {
    let rows = ctx.mailbox.fetch_pending(&ctx.node_id).await?;
    if rows.is_empty() {
        return Ok(0);
    }

    let mut applied = Vec::with_capacity(rows.len());
    let mut failure = None;

    for row in &rows {
        match apply_row(ctx, row).await {
            Ok(()) => applied.push(row.id),
            Err(e) => {
                tracing::error!(
                    node_id = %ctx.node_id,
                    event_id = row.id,
                    content = %row.content,
                    error = %e,
                    remaining = rows.len() - applied.len(),
                    "Node event failed, retrying next cycle"
                );
                failure = Some(e);
                break;
            }
        }
    }

    if !applied.is_empty() {
        ctx.mailbox.delete(&applied).await?;
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(applied.len()),
    }
}

async fn apply_row(ctx: &AppContext, row: &MailboxRow) -> Result<(), DomainError> {
    let content = NodeEventContent::decode(&row.content, &row.payload).map_err(|e| {
        DomainError::new(ErrorCode::EventDecodeFailed, e.to_string())
            .with_detail("event_id", row.id.to_string())
    })?;

    tracing::debug!(node_id = %ctx.node_id, event_id = row.id, content = %row.content, "Applying node event");
    apply_event(ctx, &content).await
}

/// Applies one node event to local state.
///
/// Also used by producers that apply a change locally instead of mailing it
/// to themselves.
pub async fn apply_event(ctx: &AppContext, content: &NodeEventContent) -> Result<(), DomainError> {
    match content {
        NodeEventContent::ConfigChanged(p) => {
            let settings = ctx.settings.load().await?;
            ctx.rate_limiter.apply_limits(settings.login_limits).await;
            ctx.state.set_maintenance(settings.maintenance_mode);

            ctx.hub
                .publish(
                    ClusterEvent::new(ClusterEventContent::ConfigChanged, EventTarget::all())
                        .with_payload(json!({ "maintenanceMode": settings.maintenance_mode })),
                )
                .await;
            if p.switch_to_maintenance {
                ctx.hub.publish(ClusterEvent::kick_non_admins()).await;
            }
        }

        NodeEventContent::SchemaChanged(p) => {
            let payload = json!({ "newVersion": p.new_version, "moduleIds": p.module_ids });
            ctx.hub
                .publish(
                    ClusterEvent::new(ClusterEventContent::SchemaLoading, EventTarget::all())
                        .with_payload(payload.clone()),
                )
                .await;

            ctx.schema.reload(&p.module_ids, p.new_version).await?;
            ctx.access.renew(None).await?;

            ctx.hub
                .publish(
                    ClusterEvent::new(ClusterEventContent::SchemaLoaded, EventTarget::all())
                        .with_payload(payload),
                )
                .await;
            ctx.hub.publish(ClusterEvent::renew_all()).await;
        }

        NodeEventContent::LoginDisabled(p) => {
            if !p.login_id.is_none() {
                ctx.hub.publish(ClusterEvent::kick_login(p.login_id)).await;
            }
        }

        NodeEventContent::LoginReauthorized(p) => {
            if !p.login_id.is_none() {
                ctx.access.renew(Some(p.login_id)).await?;
                ctx.hub
                    .publish(ClusterEvent::new(
                        ClusterEventContent::Reauthorized,
                        EventTarget::login(p.login_id),
                    ))
                    .await;
            }
        }

        NodeEventContent::LoginReauthorizedAll => {
            ctx.access.renew(None).await?;
            ctx.hub
                .publish(ClusterEvent::new(ClusterEventContent::Reauthorized, EventTarget::all()))
                .await;
        }

        NodeEventContent::MasterAssigned(p) => {
            let was_master = ctx.state.set_master(p.state);
            if was_master != p.state {
                tracing::info!(node_id = %ctx.node_id, is_master = p.state, "Master role changed");
            }
            ctx.scheduler.restart();
        }

        NodeEventContent::TasksChanged => ctx.scheduler.restart(),

        NodeEventContent::CollectionUpdated(p) => {
            let payload = json!({ "collectionId": p.collection_id });
            if p.login_ids.is_empty() {
                ctx.hub
                    .publish(
                        ClusterEvent::new(ClusterEventContent::CollectionChanged, EventTarget::all())
                            .with_payload(payload),
                    )
                    .await;
            } else {
                for login_id in p.login_ids.iter().filter(|id| !id.is_none()) {
                    ctx.hub
                        .publish(
                            ClusterEvent::new(
                                ClusterEventContent::CollectionChanged,
                                EventTarget::login(*login_id),
                            )
                            .with_payload(payload.clone()),
                        )
                        .await;
                }
            }
        }

        NodeEventContent::ShutdownTriggered => {
            tracing::warn!(node_id = %ctx.node_id, "Shutdown requested by cluster event");
            ctx.shutdown.trigger();
        }
    }

    Ok(())
}
