//! Application context.
//!
//! Everything a node needs at runtime is built once at startup and passed
//! around explicitly as an `Arc<AppContext>`.

use std::sync::Arc;

use crate::adapters::auth::MockAuthenticator;
use crate::adapters::memory::{
    InMemoryAccessCache, InMemoryClusterStore, InMemorySchemaCache, InMemorySettingsStore,
};
use crate::adapters::rate_limiter::InMemoryLoginRateLimiter;
use crate::config::ClusterConfig;
use crate::domain::foundation::NodeId;
use crate::ports::{
    AccessCache, Authenticator, LoginRateLimiter, NodeEventStore, NodeRepository, RequestDispatcher,
    SchemaCache, SettingsStore,
};

use super::dispatcher::ClusterRequestDispatcher;
use super::hub::{Hub, HubHandle};
use super::signals::{NodeState, SchedulerSignal, ShutdownSignal};

pub struct AppContext {
    /// Identity of this process in the cluster.
    pub node_id: NodeId,
    pub hostname: String,
    pub cluster: ClusterConfig,

    // Shared state (database)
    pub nodes: Arc<dyn NodeRepository>,
    pub mailbox: Arc<dyn NodeEventStore>,
    pub settings: Arc<dyn SettingsStore>,

    // Local collaborators
    pub schema: Arc<dyn SchemaCache>,
    pub access: Arc<dyn AccessCache>,
    pub authenticator: Arc<dyn Authenticator>,
    pub rate_limiter: Arc<dyn LoginRateLimiter>,
    pub dispatcher: Arc<dyn RequestDispatcher>,

    // Process-local coordination
    pub hub: HubHandle,
    pub state: NodeState,
    pub scheduler: SchedulerSignal,
    pub shutdown: ShutdownSignal,
}

impl AppContext {
    pub fn builder(node_id: NodeId) -> AppContextBuilder {
        AppContextBuilder::new(node_id)
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("node_id", &self.node_id)
            .field("hostname", &self.hostname)
            .field("is_master", &self.state.is_master())
            .finish_non_exhaustive()
    }
}

/// Builder for [`AppContext`].
///
/// Ports left unset fall back to the in-memory adapters, which is what
/// tests and single-process runs want. The node and mailbox defaults share
/// one `InMemoryClusterStore`.
pub struct AppContextBuilder {
    node_id: NodeId,
    hostname: String,
    cluster: ClusterConfig,
    nodes: Option<Arc<dyn NodeRepository>>,
    mailbox: Option<Arc<dyn NodeEventStore>>,
    settings: Option<Arc<dyn SettingsStore>>,
    schema: Option<Arc<dyn SchemaCache>>,
    access: Option<Arc<dyn AccessCache>>,
    authenticator: Option<Arc<dyn Authenticator>>,
    rate_limiter: Option<Arc<dyn LoginRateLimiter>>,
    dispatcher: Option<Arc<dyn RequestDispatcher>>,
    shutdown: Option<ShutdownSignal>,
}

impl AppContextBuilder {
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            hostname: super::node_registry::local_hostname(),
            cluster: ClusterConfig::default(),
            nodes: None,
            mailbox: None,
            settings: None,
            schema: None,
            access: None,
            authenticator: None,
            rate_limiter: None,
            dispatcher: None,
            shutdown: None,
        }
    }

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn cluster(mut self, cluster: ClusterConfig) -> Self {
        self.cluster = cluster;
        self
    }

    /// Use one in-memory store for both node table and mailbox.
    pub fn cluster_store(self, store: Arc<InMemoryClusterStore>) -> Self {
        self.nodes(store.clone()).mailbox(store)
    }

    pub fn nodes(mut self, nodes: Arc<dyn NodeRepository>) -> Self {
        self.nodes = Some(nodes);
        self
    }

    pub fn mailbox(mut self, mailbox: Arc<dyn NodeEventStore>) -> Self {
        self.mailbox = Some(mailbox);
        self
    }

    pub fn settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn schema(mut self, schema: Arc<dyn SchemaCache>) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn access(mut self, access: Arc<dyn AccessCache>) -> Self {
        self.access = Some(access);
        self
    }

    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn rate_limiter(mut self, rate_limiter: Arc<dyn LoginRateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<dyn RequestDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Build the context and spawn its hub task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> Arc<AppContext> {
        let (nodes, mailbox): (Arc<dyn NodeRepository>, Arc<dyn NodeEventStore>) =
            match (self.nodes, self.mailbox) {
                (Some(nodes), Some(mailbox)) => (nodes, mailbox),
                (nodes, mailbox) => {
                    let store = Arc::new(InMemoryClusterStore::new());
                    (
                        nodes.unwrap_or_else(|| store.clone()),
                        mailbox.unwrap_or_else(|| store.clone()),
                    )
                }
            };

        let dispatcher = self
            .dispatcher
            .unwrap_or_else(|| Arc::new(ClusterRequestDispatcher::new(nodes.clone(), self.node_id)));
        let shutdown = self.shutdown.unwrap_or_default();
        let hub = Hub::spawn(self.cluster.hub_channel_capacity, shutdown.subscribe());

        Arc::new(AppContext {
            node_id: self.node_id,
            hostname: self.hostname,
            cluster: self.cluster,
            nodes,
            mailbox,
            settings: self
                .settings
                .unwrap_or_else(|| Arc::new(InMemorySettingsStore::default())),
            schema: self.schema.unwrap_or_else(|| Arc::new(InMemorySchemaCache::new())),
            access: self.access.unwrap_or_else(|| Arc::new(InMemoryAccessCache::new())),
            authenticator: self
                .authenticator
                .unwrap_or_else(|| Arc::new(MockAuthenticator::new())),
            rate_limiter: self
                .rate_limiter
                .unwrap_or_else(|| Arc::new(InMemoryLoginRateLimiter::with_defaults())),
            dispatcher,
            hub,
            state: NodeState::new(),
            scheduler: SchedulerSignal::new(),
            shutdown,
        })
    }
}
