//! cluster-hub server binary.
//!
//! Loads configuration from `CLUSTER_HUB__*` environment variables, joins the
//! cluster through the shared PostgreSQL database and serves client
//! WebSocket connections until Ctrl-C or a cluster-wide shutdown event.

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use http::HeaderName;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use cluster_hub::adapters::postgres::MIGRATOR;
use cluster_hub::adapters::{
    websocket_router, FileNodeIdStore, InMemoryLoginRateLimiter, JwtAuthenticator,
    PostgresNodeEventStore, PostgresNodeRepository, PostgresSettingsStore,
};
use cluster_hub::application::{
    local_hostname, setup_node, shutdown_node, AppContext, ClusterRuntime, Scheduler,
    ShutdownSignal,
};
use cluster_hub::config::AppConfig;
use cluster_hub::ports::{InstanceSettings, SettingsStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        "cluster-hub starting"
    );

    let pool = config.database.connect().await?;
    if config.database.run_migrations {
        MIGRATOR.run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let nodes = Arc::new(PostgresNodeRepository::new(pool.clone()));
    let mailbox = Arc::new(PostgresNodeEventStore::new(pool.clone()));
    let settings = Arc::new(PostgresSettingsStore::new(
        pool.clone(),
        InstanceSettings {
            maintenance_mode: false,
            login_limits: config.auth.login_limits(),
        },
    ));

    let hostname = local_hostname();
    let node_file = FileNodeIdStore::new(&config.cluster.node_file);
    let node_id = setup_node(nodes.as_ref(), &node_file, &hostname).await?;

    let initial = settings.load().await?;
    let shutdown = ShutdownSignal::new();
    let ctx = AppContext::builder(node_id)
        .hostname(hostname)
        .cluster(config.cluster.clone())
        .nodes(nodes)
        .mailbox(mailbox)
        .settings(settings)
        .authenticator(Arc::new(JwtAuthenticator::new(
            config.auth.jwt_secret.clone(),
            config.auth.token_leeway_secs,
        )))
        .rate_limiter(Arc::new(InMemoryLoginRateLimiter::new(initial.login_limits)))
        .shutdown(shutdown.clone())
        .build();
    ctx.state.set_maintenance(initial.maintenance_mode);

    let runtime = tokio::spawn(ClusterRuntime::new(ctx.clone()).run(shutdown.subscribe()));
    let scheduler = tokio::spawn(Scheduler::with_default_jobs(ctx.clone()).run(shutdown.subscribe()));

    let request_id = HeaderName::from_static("x-request-id");
    let app = websocket_router(ctx.clone()).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(config.server.request_timeout()))
            .layer(PropagateRequestIdLayer::new(request_id)),
    );

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, node_id = %node_id, "Listening for client connections");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(wait_for_shutdown(shutdown.clone()))
        .await?;

    shutdown.trigger();
    for (name, task) in [("runtime", runtime), ("scheduler", scheduler)] {
        if let Err(e) = task.await {
            tracing::warn!(task = name, error = %e, "Background task ended abnormally");
        }
    }
    if let Err(e) = shutdown_node(&ctx).await {
        tracing::warn!(error = %e, "Failed to mark node as stopped");
    }

    tracing::info!("cluster-hub stopped");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_new(&config.server.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    if config.is_production() {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

/// Resolves on Ctrl-C or when a `shutdownTriggered` event fires the signal.
async fn wait_for_shutdown(shutdown: ShutdownSignal) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            }
            tracing::info!("Ctrl-C received, shutting down");
        }
        _ = shutdown.wait() => tracing::info!("Cluster shutdown requested"),
    }
    shutdown.trigger();
}
