//! Client handles held by the hub.
//!
//! A handle is the hub's view of one live connection: who is behind it and
//! how to reach its writer task. Cloning a handle is cheap; every clone
//! shares the same outbound queue and cancel signal.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::domain::cluster::{ClusterEvent, DeviceClass};
use crate::domain::foundation::{ClientId, Identity, LoginId};

/// Item on a client's outbound queue, consumed by its single writer task.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// Already-serialized response frame.
    Text(String),
    /// Cluster push, serialized by the writer.
    Event(Arc<ClusterEvent>),
    /// Close the socket.
    Close,
}

/// Outcome of a non-blocking push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// The queue was full; the push was dropped for this client only.
    Dropped,
    /// The writer is gone; the client should be removed.
    Disconnected,
}

#[derive(Debug, Clone)]
pub struct ClientHandle {
    pub id: ClientId,
    /// Remote address as `ip:port`.
    pub address: String,
    pub device: DeviceClass,
    /// Set once the connection authenticated.
    pub identity: Option<Identity>,
    outbound: mpsc::Sender<Outbound>,
    cancel: Arc<watch::Sender<bool>>,
}

impl ClientHandle {
    /// Creates a handle plus the receiving end of its outbound queue.
    pub fn new(
        address: impl Into<String>,
        device: DeviceClass,
        queue_capacity: usize,
    ) -> (Self, mpsc::Receiver<Outbound>) {
        let (outbound, rx) = mpsc::channel(queue_capacity.max(1));
        let (cancel, _) = watch::channel(false);
        let handle = Self {
            id: ClientId::new(),
            address: address.into(),
            device,
            identity: None,
            outbound,
            cancel: Arc::new(cancel),
        };
        (handle, rx)
    }

    /// Copy of this handle carrying the authenticated identity.
    pub fn authenticated(&self, identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            ..self.clone()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Login id, `LoginId::NONE` until authenticated.
    pub fn login_id(&self) -> LoginId {
        self.identity.map(|i| i.login_id).unwrap_or(LoginId::NONE)
    }

    pub fn is_admin(&self) -> bool {
        self.identity.map(|i| i.admin).unwrap_or(false)
    }

    /// Non-blocking enqueue of a push.
    pub fn push(&self, event: Arc<ClusterEvent>) -> PushOutcome {
        match self.outbound.try_send(Outbound::Event(event)) {
            Ok(()) => PushOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => PushOutcome::Dropped,
            Err(mpsc::error::TrySendError::Closed(_)) => PushOutcome::Disconnected,
        }
    }

    /// Enqueue a response frame, waiting for queue space.
    ///
    /// Returns false when the writer is gone.
    pub async fn respond(&self, text: String) -> bool {
        self.outbound.send(Outbound::Text(text)).await.is_ok()
    }

    /// Fire the cancel signal and ask the writer to close the socket.
    pub fn close(&self) {
        self.cancel.send_replace(true);
        // A full queue is fine: the writer also watches the cancel signal.
        let _ = self.outbound.try_send(Outbound::Close);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Receiver that flips to `true` when the client is torn down.
    pub fn cancelled(&self) -> watch::Receiver<bool> {
        self.cancel.subscribe()
    }
}

/// Resolves once `rx` observes cancellation (or its sender is dropped).
pub async fn wait_cancelled(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|cancelled| *cancelled).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cluster::ClusterEvent;

    #[test]
    fn new_client_is_unauthenticated() {
        let (client, _rx) = ClientHandle::new("10.0.0.1:5000", DeviceClass::Browser, 4);
        assert!(!client.is_authenticated());
        assert!(client.login_id().is_none());
        assert!(!client.is_admin());
    }

    #[test]
    fn authenticated_copy_keeps_id_and_queue() {
        let (client, mut rx) = ClientHandle::new("10.0.0.1:5000", DeviceClass::Browser, 4);
        let authed = client.authenticated(Identity::new(LoginId::new(7), true, false));

        assert_eq!(authed.id, client.id);
        assert_eq!(authed.login_id(), LoginId::new(7));
        assert!(authed.is_admin());

        authed.push(Arc::new(ClusterEvent::renew_all()));
        assert!(matches!(rx.try_recv(), Ok(Outbound::Event(_))));
    }

    #[test]
    fn full_queue_drops_push() {
        let (client, _rx) = ClientHandle::new("a", DeviceClass::Browser, 1);
        let event = Arc::new(ClusterEvent::renew_all());

        assert_eq!(client.push(event.clone()), PushOutcome::Queued);
        assert_eq!(client.push(event), PushOutcome::Dropped);
    }

    #[test]
    fn closed_queue_reports_disconnect() {
        let (client, rx) = ClientHandle::new("a", DeviceClass::Browser, 1);
        drop(rx);
        assert_eq!(
            client.push(Arc::new(ClusterEvent::renew_all())),
            PushOutcome::Disconnected
        );
    }

    #[tokio::test]
    async fn close_fires_cancel_for_all_clones() {
        let (client, mut rx) = ClientHandle::new("a", DeviceClass::Browser, 4);
        let clone = client.clone();
        let cancelled = clone.cancelled();

        client.close();

        wait_cancelled(cancelled).await;
        assert!(clone.is_cancelled());
        assert!(matches!(rx.recv().await, Some(Outbound::Close)));
    }
}
