use std::sync::Arc;
use tenant_gate_authz::{AccessGate, ClusterCredentials, KubeAuthority};
use tenant_gate_server::{AppState, config::ServerConfig, router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    // Cluster credentials are loaded once; in-cluster first, kubeconfig second
    let credentials = ClusterCredentials::load(config.authority.kubeconfig.as_deref())
        .expect("failed to load cluster credentials");

    let authority = KubeAuthority::new(&credentials, config.authority.options())
        .expect("failed to build access-review client");
    tracing::info!(
        reviews_url = %authority.reviews_url(),
        timeout_seconds = config.authority.timeout_seconds,
        "Access-review authority ready"
    );

    let gate = AccessGate::new(Arc::new(authority));
    let app_state = Arc::new(AppState::new(gate, config.identity));
    let app = router(app_state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
