//! Integration tests for master election across several nodes sharing one
//! cluster store.

use std::sync::Arc;

use futures::future::join_all;

use cluster_hub::adapters::memory::InMemoryClusterStore;
use cluster_hub::adapters::storage::InMemoryNodeIdStore;
use cluster_hub::application::{
    check_in_node, check_master, event_bus, process_events, setup_node, AppContext, NodeSweepJob,
    ScheduledJob,
};
use cluster_hub::domain::cluster::{LoginPayload, MasterClaim, NodeCheckIn, NodeEventContent};
use cluster_hub::domain::foundation::{LoginId, NodeId, Timestamp};
use cluster_hub::ports::{NodeEventStore, NodeRepository};

async fn join(store: &Arc<InMemoryClusterStore>, host: &str) -> Arc<AppContext> {
    let node_id = setup_node(store.as_ref(), &InMemoryNodeIdStore::new(), host)
        .await
        .unwrap();
    AppContext::builder(node_id)
        .hostname(host)
        .cluster_store(store.clone())
        .build()
}

async fn backdate_check_in(store: &InMemoryClusterStore, id: &NodeId, secs: i64) {
    store
        .check_in(
            id,
            &NodeCheckIn {
                hostname: "host".to_string(),
                sessions: 0,
                memory_mb: 0,
                at: Timestamp::now().minus_secs(secs),
            },
        )
        .await
        .unwrap();
}

async fn pending_contents(store: &InMemoryClusterStore, id: &NodeId) -> Vec<NodeEventContent> {
    store
        .fetch_pending(id)
        .await
        .unwrap()
        .into_iter()
        .map(|row| NodeEventContent::decode(&row.content, &row.payload).unwrap())
        .collect()
}

#[tokio::test]
async fn stale_master_is_replaced() {
    let store = Arc::new(InMemoryClusterStore::new());
    let a = join(&store, "host-a").await;
    let b = join(&store, "host-b").await;
    store.set_master(&a.node_id, true).await.unwrap();
    a.state.set_master(true);
    backdate_check_in(&store, &a.node_id, 300).await;

    let claim = check_master(&b).await.unwrap();

    assert_eq!(claim, Some(MasterClaim::Granted));
    assert_eq!(store.masters().await, vec![b.node_id]);
    assert_eq!(
        pending_contents(&store, &a.node_id).await,
        vec![NodeEventContent::master_assigned(false)]
    );
    assert_eq!(
        pending_contents(&store, &b.node_id).await,
        vec![NodeEventContent::master_assigned(true)]
    );

    process_events(&a).await.unwrap();
    process_events(&b).await.unwrap();

    assert!(!a.state.is_master());
    assert!(b.state.is_master());
    assert_eq!(a.scheduler.generation(), 1);
    assert_eq!(b.scheduler.generation(), 1);
}

#[tokio::test]
async fn concurrent_claims_produce_one_winner() {
    let store = Arc::new(InMemoryClusterStore::new());
    let mut nodes = Vec::new();
    for i in 0..5 {
        nodes.push(join(&store, &format!("host-{}", i)).await);
    }
    let old_master = nodes[0].node_id;
    store.set_master(&old_master, true).await.unwrap();
    backdate_check_in(&store, &old_master, 600).await;

    let claims = join_all(nodes[1..].iter().map(|ctx| check_master(ctx))).await;

    let granted = claims
        .iter()
        .filter(|c| matches!(c, Ok(Some(MasterClaim::Granted))))
        .count();
    assert_eq!(granted, 1);
    assert_eq!(store.masters().await.len(), 1);
    assert_ne!(store.masters().await[0], old_master);
}

#[tokio::test]
async fn fresh_master_is_left_alone() {
    let store = Arc::new(InMemoryClusterStore::new());
    let a = join(&store, "host-a").await;
    let b = join(&store, "host-b").await;
    store.set_master(&a.node_id, true).await.unwrap();

    let claim = check_master(&b).await.unwrap();

    assert_eq!(claim, None);
    assert_eq!(store.masters().await, vec![a.node_id]);
    assert_eq!(store.pending_count(&a.node_id).await, 0);
    assert_eq!(store.pending_count(&b.node_id).await, 0);
}

#[tokio::test]
async fn cluster_without_master_elects_first_claimant() {
    let store = Arc::new(InMemoryClusterStore::new());
    let a = join(&store, "host-a").await;

    assert_eq!(check_master(&a).await.unwrap(), Some(MasterClaim::Granted));
    process_events(&a).await.unwrap();

    assert!(a.state.is_master());
}

#[tokio::test]
async fn restarted_node_loses_master_flag_and_stale_mail() {
    let store = Arc::new(InMemoryClusterStore::new());
    let ids = InMemoryNodeIdStore::new();
    let node_id = setup_node(store.as_ref(), &ids, "host-a").await.unwrap();
    store.set_master(&node_id, true).await.unwrap();
    store
        .enqueue(&[node_id], &NodeEventContent::TasksChanged)
        .await
        .unwrap();

    let again = setup_node(store.as_ref(), &ids, "host-a").await.unwrap();

    assert_eq!(again, node_id);
    assert!(store.masters().await.is_empty());
    assert_eq!(store.pending_count(&node_id).await, 0);
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn swept_node_rejoins_event_bus_on_next_check_in() {
    let store = Arc::new(InMemoryClusterStore::new());
    let a = join(&store, "host-a").await;
    let b = join(&store, "host-b").await;
    store.set_master(&a.node_id, true).await.unwrap();
    a.state.set_master(true);
    backdate_check_in(&store, &b.node_id, 600).await;

    NodeSweepJob.run(&a).await.unwrap();
    assert!(!store.find(&b.node_id).await.unwrap().unwrap().running);

    check_in_node(&b).await.unwrap();
    assert!(store.find(&b.node_id).await.unwrap().unwrap().running);

    event_bus::login_disabled(&a, LoginId::new(7)).await.unwrap();

    assert_eq!(
        pending_contents(&store, &b.node_id).await,
        vec![NodeEventContent::LoginDisabled(LoginPayload {
            login_id: LoginId::new(7)
        })]
    );
}
