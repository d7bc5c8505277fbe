//! Rally Score Back binary entrypoint wiring storage, the match engine, REST, WebSocket and SSE layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rally_score_back::{
    config::AppConfig,
    dao::{
        match_store::{
            RemoteBackend,
            local::{DeviceStorage, FileDeviceStorage, LocalMatchStore},
        },
        repository::MatchRepository,
    },
    routes,
    services::session_service,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let device: Arc<dyn DeviceStorage> =
        Arc::new(FileDeviceStorage::new(config.local_storage_dir.clone()));
    let repository = MatchRepository::new(
        Arc::new(LocalMatchStore::new(device.clone())),
        connect_remote(),
    );

    let session = session_service::bootstrap_session(&device).await;
    let app_state = AppState::new(config, repository, device, session);

    if let Some(match_id) = session_service::restore_active_match(&app_state).await {
        info!(%match_id, "resuming match in progress");
    }

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state.clone());

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, docs = routes::docs::DOCS_PATH, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    app_state.engine().await.settle().await;
    info!("server stopped");

    Ok(())
}

/// Reach the remote match table when it is configured; otherwise only guest
/// data can be served.
#[cfg(feature = "remote-store")]
fn connect_remote() -> Option<Arc<dyn RemoteBackend>> {
    use rally_score_back::dao::match_store::remote::{RemoteConfig, RemoteMatchBackend};

    let config = match RemoteConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "remote storage not configured; running local-only");
            return None;
        }
    };

    match RemoteMatchBackend::connect(config) {
        Ok(backend) => {
            info!("remote storage configured");
            Some(Arc::new(backend))
        }
        Err(err) => {
            warn!(error = %err, "failed to set up remote storage; running local-only");
            None
        }
    }
}

#[cfg(not(feature = "remote-store"))]
fn connect_remote() -> Option<Arc<dyn RemoteBackend>> {
    warn!("built without remote storage; running local-only");
    None
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
