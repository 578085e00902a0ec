//! In-process client hub.
//!
//! One task owns the registry of live connections. Everything else talks to
//! it through a [`HubHandle`]:
//!
//! ```text
//!   connection tasks ──register/unregister──┐
//!                                           ▼
//!   event processor ──ClusterEvent──────▶ Hub loop ──try_send──▶ client queues
//! ```
//!
//! Because the loop is the only code touching the registry, routing needs no
//! locks, and because delivery is a non-blocking enqueue per client, one
//! stalled connection cannot hold up the others.

mod client;

pub use client::{wait_cancelled, ClientHandle, Outbound, PushOutcome};

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::domain::cluster::{ClusterEvent, ClusterEventContent};
use crate::domain::foundation::ClientId;

/// Sending side of the hub's three inbound channels.
#[derive(Debug, Clone)]
pub struct HubHandle {
    add_tx: mpsc::Sender<ClientHandle>,
    remove_tx: mpsc::Sender<ClientId>,
    event_tx: mpsc::Sender<ClusterEvent>,
    counts: Arc<HubCounts>,
}

#[derive(Debug, Default)]
struct HubCounts {
    clients: AtomicUsize,
    sessions: AtomicUsize,
}

impl HubHandle {
    /// Add a client, or replace its entry (e.g. after authentication).
    pub async fn register(&self, client: ClientHandle) {
        if self.add_tx.send(client).await.is_err() {
            tracing::debug!("Hub stopped; register ignored");
        }
    }

    pub async fn unregister(&self, id: ClientId) {
        if self.remove_tx.send(id).await.is_err() {
            tracing::debug!(client_id = %id, "Hub stopped; unregister ignored");
        }
    }

    /// Route an event to matching clients.
    pub async fn publish(&self, event: ClusterEvent) {
        let content = event.content;
        if self.event_tx.send(event).await.is_err() {
            tracing::debug!(content = %content, "Hub stopped; event dropped");
        }
    }

    /// Number of registered connections (authenticated or not).
    pub fn client_count(&self) -> usize {
        self.counts.clients.load(Ordering::SeqCst)
    }

    /// Number of authenticated connections.
    pub fn session_count(&self) -> usize {
        self.counts.sessions.load(Ordering::SeqCst)
    }
}

/// The hub loop state. Create with [`Hub::new`] and drive with [`Hub::run`].
pub struct Hub {
    clients: HashMap<ClientId, ClientHandle>,
    add_rx: mpsc::Receiver<ClientHandle>,
    remove_rx: mpsc::Receiver<ClientId>,
    event_rx: mpsc::Receiver<ClusterEvent>,
    counts: Arc<HubCounts>,
}

impl Hub {
    pub fn new(channel_capacity: usize) -> (Self, HubHandle) {
        let capacity = channel_capacity.max(1);
        let (add_tx, add_rx) = mpsc::channel(capacity);
        let (remove_tx, remove_rx) = mpsc::channel(capacity);
        let (event_tx, event_rx) = mpsc::channel(capacity);
        let counts = Arc::new(HubCounts::default());

        let hub = Self {
            clients: HashMap::new(),
            add_rx,
            remove_rx,
            event_rx,
            counts: counts.clone(),
        };
        let handle = HubHandle {
            add_tx,
            remove_tx,
            event_tx,
            counts,
        };
        (hub, handle)
    }

    /// Spawn the loop on the current runtime.
    pub fn spawn(channel_capacity: usize, shutdown: watch::Receiver<bool>) -> HubHandle {
        let (hub, handle) = Self::new(channel_capacity);
        tokio::spawn(hub.run(shutdown));
        handle
    }

    /// Run until shutdown, then close every remaining client.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::debug!("Client hub started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                Some(client) = self.add_rx.recv() => self.add(client),
                Some(id) = self.remove_rx.recv() => self.remove(&id),
                Some(event) = self.event_rx.recv() => self.route(event),
                else => break,
            }
        }

        for (_, client) in self.clients.drain() {
            client.close();
        }
        self.update_counts();
        tracing::debug!("Client hub stopped");
    }

    fn add(&mut self, client: ClientHandle) {
        if client.is_cancelled() {
            // Torn down before registration reached us.
            self.remove(&client.id);
            return;
        }
        tracing::debug!(
            client_id = %client.id,
            login_id = %client.login_id(),
            device = %client.device,
            "Client registered"
        );
        self.clients.insert(client.id, client);
        self.update_counts();
    }

    fn remove(&mut self, id: &ClientId) {
        if let Some(client) = self.clients.remove(id) {
            self.update_counts();
            client.close();
            tracing::debug!(client_id = %id, "Client removed");
        }
    }

    fn route(&mut self, event: ClusterEvent) {
        let targets: Vec<ClientId> = self
            .clients
            .values()
            .filter(|c| {
                c.is_authenticated() && event.target.matches(c.login_id(), c.device, &c.address)
            })
            .filter(|c| event.content != ClusterEventContent::KickNonAdmin || !c.is_admin())
            .map(|c| c.id)
            .collect();

        if event.content.is_kick() {
            for id in &targets {
                self.remove(id);
            }
            tracing::info!(content = %event.content, kicked = targets.len(), "Clients kicked");
            return;
        }

        let event = Arc::new(event);
        let mut gone = Vec::new();
        for id in &targets {
            let Some(client) = self.clients.get(id) else { continue };
            match client.push(event.clone()) {
                PushOutcome::Queued => {}
                PushOutcome::Dropped => {
                    tracing::warn!(
                        client_id = %id,
                        content = %event.content,
                        "Outbound queue full, push dropped"
                    );
                }
                PushOutcome::Disconnected => gone.push(*id),
            }
        }
        for id in &gone {
            self.remove(id);
        }

        tracing::trace!(content = %event.content, delivered = targets.len() - gone.len(), "Event routed");
    }

    fn update_counts(&self) {
        let sessions = self.clients.values().filter(|c| c.is_authenticated()).count();
        self.counts.clients.store(self.clients.len(), Ordering::SeqCst);
        self.counts.sessions.store(sessions, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cluster::{DeviceClass, EventTarget};
    use crate::domain::foundation::{Identity, LoginId};
    use std::time::Duration;
    use tokio::time::timeout;

    struct TestClient {
        handle: ClientHandle,
        rx: mpsc::Receiver<Outbound>,
    }

    impl TestClient {
        fn new(login: Option<(i64, bool)>, device: DeviceClass) -> Self {
            let (handle, rx) = ClientHandle::new("10.0.0.1:4000", device, 8);
            let handle = match login {
                Some((id, admin)) => handle.authenticated(Identity::new(LoginId::new(id), admin, false)),
                None => handle,
            };
            Self { handle, rx }
        }

        async fn next(&mut self) -> Option<Outbound> {
            timeout(Duration::from_secs(1), self.rx.recv()).await.ok().flatten()
        }

        fn try_next(&mut self) -> Option<Outbound> {
            self.rx.try_recv().ok()
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    fn start() -> (HubHandle, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        (Hub::spawn(16, rx), tx)
    }

    #[tokio::test]
    async fn login_push_reaches_only_that_login() {
        let (hub, _stop) = start();
        let mut seven = TestClient::new(Some((7, false)), DeviceClass::Browser);
        let mut nine = TestClient::new(Some((9, false)), DeviceClass::Browser);
        hub.register(seven.handle.clone()).await;
        hub.register(nine.handle.clone()).await;

        hub.publish(ClusterEvent::new(
            ClusterEventContent::Reauthorized,
            EventTarget::login(LoginId::new(7)),
        ))
        .await;

        assert!(matches!(seven.next().await, Some(Outbound::Event(e)) if e.content == ClusterEventContent::Reauthorized));
        settle().await;
        assert!(nine.try_next().is_none());
    }

    #[tokio::test]
    async fn unauthenticated_clients_get_no_pushes() {
        let (hub, _stop) = start();
        let mut anon = TestClient::new(None, DeviceClass::Browser);
        let mut user = TestClient::new(Some((1, false)), DeviceClass::Browser);
        hub.register(anon.handle.clone()).await;
        hub.register(user.handle.clone()).await;

        hub.publish(ClusterEvent::renew_all()).await;

        assert!(user.next().await.is_some());
        settle().await;
        assert!(anon.try_next().is_none());
        assert_eq!(hub.client_count(), 2);
        assert_eq!(hub.session_count(), 1);
    }

    #[tokio::test]
    async fn kick_removes_and_closes_matching_clients() {
        let (hub, _stop) = start();
        let mut seven = TestClient::new(Some((7, false)), DeviceClass::Browser);
        let mut nine = TestClient::new(Some((9, false)), DeviceClass::Browser);
        hub.register(seven.handle.clone()).await;
        hub.register(nine.handle.clone()).await;

        hub.publish(ClusterEvent::kick_login(LoginId::new(7))).await;

        assert!(matches!(seven.next().await, Some(Outbound::Close)));
        assert!(seven.handle.is_cancelled());
        assert_eq!(hub.client_count(), 1);
        assert!(nine.try_next().is_none());
        assert!(!nine.handle.is_cancelled());
    }

    #[tokio::test]
    async fn kick_non_admin_spares_admins() {
        let (hub, _stop) = start();
        let mut admin = TestClient::new(Some((1, true)), DeviceClass::Browser);
        let mut user = TestClient::new(Some((2, false)), DeviceClass::FatClient);
        hub.register(admin.handle.clone()).await;
        hub.register(user.handle.clone()).await;

        hub.publish(ClusterEvent::kick_non_admins()).await;

        assert!(matches!(user.next().await, Some(Outbound::Close)));
        settle().await;
        assert!(admin.try_next().is_none());
        assert_eq!(hub.session_count(), 1);
    }

    #[tokio::test]
    async fn device_filter_limits_delivery() {
        let (hub, _stop) = start();
        let mut browser = TestClient::new(Some((3, false)), DeviceClass::Browser);
        let mut fat = TestClient::new(Some((3, false)), DeviceClass::FatClient);
        hub.register(browser.handle.clone()).await;
        hub.register(fat.handle.clone()).await;

        hub.publish(ClusterEvent::new(
            ClusterEventContent::Renew,
            EventTarget::login(LoginId::new(3)).with_device(DeviceClass::FatClient),
        ))
        .await;

        assert!(fat.next().await.is_some());
        settle().await;
        assert!(browser.try_next().is_none());
    }

    #[tokio::test]
    async fn stalled_client_does_not_block_others() {
        let (hub, _stop) = start();
        let (stalled, _stalled_rx) = ClientHandle::new("a", DeviceClass::Browser, 1);
        let stalled = stalled.authenticated(Identity::new(LoginId::new(1), false, false));
        let mut healthy = TestClient::new(Some((2, false)), DeviceClass::Browser);
        hub.register(stalled.clone()).await;
        hub.register(healthy.handle.clone()).await;

        for _ in 0..5 {
            hub.publish(ClusterEvent::renew_all()).await;
        }

        for _ in 0..5 {
            assert!(healthy.next().await.is_some());
        }
        // Dropped pushes do not remove the client.
        assert_eq!(hub.client_count(), 2);
    }

    #[tokio::test]
    async fn re_register_upgrades_entry_to_authenticated() {
        let (hub, _stop) = start();
        let mut client = TestClient::new(None, DeviceClass::Browser);
        hub.register(client.handle.clone()).await;
        settle().await;
        assert_eq!(hub.session_count(), 0);

        let authed = client.handle.authenticated(Identity::new(LoginId::new(5), false, false));
        hub.register(authed).await;
        hub.publish(ClusterEvent::renew_all()).await;

        assert!(client.next().await.is_some());
        assert_eq!(hub.client_count(), 1);
        assert_eq!(hub.session_count(), 1);
    }

    #[tokio::test]
    async fn unregister_cancels_client() {
        let (hub, _stop) = start();
        let client = TestClient::new(Some((1, false)), DeviceClass::Browser);
        hub.register(client.handle.clone()).await;
        hub.unregister(client.handle.id).await;

        wait_cancelled(client.handle.cancelled()).await;
        settle().await;
        assert_eq!(hub.client_count(), 0);
    }

    #[tokio::test]
    async fn shutdown_closes_all_clients() {
        let (hub, stop) = start();
        let mut client = TestClient::new(Some((1, false)), DeviceClass::Browser);
        hub.register(client.handle.clone()).await;
        settle().await;

        stop.send(true).unwrap();

        assert!(matches!(client.next().await, Some(Outbound::Close)));
    }
}
