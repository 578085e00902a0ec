//! Node event producers.
//!
//! A cluster-wide change is announced by inserting one mailbox row per
//! running node. Each node, the producer included, then applies the change
//! when it polls its mailbox.

use uuid::Uuid;

use crate::domain::cluster::{
    CollectionUpdatedPayload, ConfigChangedPayload, LoginPayload, NodeEventContent,
    SchemaChangedPayload,
};
use crate::domain::foundation::{DomainError, LoginId, ModuleId, NodeId};

use super::event_processor::apply_event;
use super::AppContext;

/// Which nodes receive a published event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    /// Every running node, this one included, via the mailbox.
    #[default]
    AllNodes,
    /// Every other running node via the mailbox; applied here immediately.
    OthersApplyLocally,
}

/// Enqueue `content` for the running nodes selected by `delivery`.
pub async fn publish(ctx: &AppContext, content: NodeEventContent, delivery: Delivery) -> Result<(), DomainError> {
    let targets: Vec<NodeId> = ctx
        .nodes
        .list()
        .await?
        .into_iter()
        .filter(|n| n.running)
        .filter(|n| delivery == Delivery::AllNodes || n.id != ctx.node_id)
        .map(|n| n.id)
        .collect();

    ctx.mailbox.enqueue(&targets, &content).await?;
    tracing::debug!(
        node_id = %ctx.node_id,
        content = %content.tag(),
        targets = targets.len(),
        "Node event published"
    );

    if delivery == Delivery::OthersApplyLocally {
        apply_event(ctx, &content).await?;
    }
    Ok(())
}

pub async fn config_changed(ctx: &AppContext, switch_to_maintenance: bool) -> Result<(), DomainError> {
    let content = NodeEventContent::ConfigChanged(ConfigChangedPayload { switch_to_maintenance });
    publish(ctx, content, Delivery::AllNodes).await
}

pub async fn schema_changed(ctx: &AppContext, new_version: bool, module_ids: Vec<ModuleId>) -> Result<(), DomainError> {
    let content = NodeEventContent::SchemaChanged(SchemaChangedPayload { new_version, module_ids });
    publish(ctx, content, Delivery::AllNodes).await
}

pub async fn login_disabled(ctx: &AppContext, login_id: LoginId) -> Result<(), DomainError> {
    publish(ctx, NodeEventContent::LoginDisabled(LoginPayload { login_id }), Delivery::AllNodes).await
}

pub async fn login_reauthorized(ctx: &AppContext, login_id: LoginId) -> Result<(), DomainError> {
    publish(ctx, NodeEventContent::LoginReauthorized(LoginPayload { login_id }), Delivery::AllNodes).await
}

pub async fn login_reauthorized_all(ctx: &AppContext) -> Result<(), DomainError> {
    publish(ctx, NodeEventContent::LoginReauthorizedAll, Delivery::AllNodes).await
}

pub async fn tasks_changed(ctx: &AppContext) -> Result<(), DomainError> {
    publish(ctx, NodeEventContent::TasksChanged, Delivery::AllNodes).await
}

/// Notify logins that a collection changed; empty `login_ids` means everyone.
pub async fn collection_updated(ctx: &AppContext, collection_id: Uuid, login_ids: Vec<LoginId>) -> Result<(), DomainError> {
    let content = NodeEventContent::CollectionUpdated(CollectionUpdatedPayload { collection_id, login_ids });
    publish(ctx, content, Delivery::AllNodes).await
}

/// Ask every node to shut down gracefully.
pub async fn shutdown_triggered(ctx: &AppContext) -> Result<(), DomainError> {
    publish(ctx, NodeEventContent::ShutdownTriggered, Delivery::AllNodes).await
}
