//! Integration tests for pushing node events out to connected clients.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use cluster_hub::adapters::memory::InMemoryClusterStore;
use cluster_hub::adapters::storage::InMemoryNodeIdStore;
use cluster_hub::application::{event_bus, process_events, setup_node, AppContext, ClientHandle, Outbound};
use cluster_hub::domain::cluster::{ClusterEventContent, DeviceClass};
use cluster_hub::domain::foundation::{Identity, LoginId};

struct Client {
    handle: ClientHandle,
    rx: mpsc::Receiver<Outbound>,
}

impl Client {
    async fn connect(ctx: &AppContext, login: i64) -> Self {
        let (handle, rx) = ClientHandle::new(format!("10.2.0.{}:7000", login), DeviceClass::Browser, 16);
        let handle = handle.authenticated(Identity::new(LoginId::new(login), false, false));
        ctx.hub.register(handle.clone()).await;
        Self { handle, rx }
    }

    async fn next(&mut self) -> Option<Outbound> {
        timeout(Duration::from_millis(200), self.rx.recv()).await.ok().flatten()
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}

async fn single_node() -> Arc<AppContext> {
    let store = Arc::new(InMemoryClusterStore::new());
    let node_id = setup_node(store.as_ref(), &InMemoryNodeIdStore::new(), "host-a")
        .await
        .unwrap();
    AppContext::builder(node_id).cluster_store(store).build()
}

#[tokio::test]
async fn disabled_login_is_kicked_and_others_stay() {
    let ctx = single_node().await;
    let mut seven = Client::connect(&ctx, 7).await;
    let mut nine = Client::connect(&ctx, 9).await;
    settle().await;
    assert_eq!(ctx.hub.session_count(), 2);

    event_bus::login_disabled(&ctx, LoginId::new(7)).await.unwrap();
    process_events(&ctx).await.unwrap();
    settle().await;

    assert!(matches!(seven.next().await, Some(Outbound::Close)));
    assert!(seven.handle.is_cancelled());
    assert!(!nine.handle.is_cancelled());
    assert!(nine.next().await.is_none());
    assert_eq!(ctx.hub.session_count(), 1);
}

#[tokio::test]
async fn reauthorize_all_reaches_every_login() {
    let ctx = single_node().await;
    let mut clients = Vec::new();
    for login in [3, 7, 9] {
        clients.push(Client::connect(&ctx, login).await);
    }
    settle().await;

    event_bus::login_reauthorized_all(&ctx).await.unwrap();
    process_events(&ctx).await.unwrap();

    for client in &mut clients {
        match client.next().await {
            Some(Outbound::Event(event)) => assert_eq!(event.content, ClusterEventContent::Reauthorized),
            other => panic!("expected push, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn same_login_on_two_connections_gets_both_pushes() {
    let ctx = single_node().await;
    let mut first = Client::connect(&ctx, 7).await;
    let mut second = Client::connect(&ctx, 7).await;
    let mut other = Client::connect(&ctx, 8).await;
    settle().await;

    event_bus::login_reauthorized(&ctx, LoginId::new(7)).await.unwrap();
    process_events(&ctx).await.unwrap();

    assert!(matches!(first.next().await, Some(Outbound::Event(_))));
    assert!(matches!(second.next().await, Some(Outbound::Event(_))));
    assert!(other.next().await.is_none());
}
