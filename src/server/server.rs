use anyhow::{Context, Result};
use std::future::Future;
use std::time::Duration;

use tracing::info;

use axum::{
    extract::State,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use super::api_error::run_blocking;
use super::entity_routes::make_entity_routes;
use super::metrics::metrics_handler;
use super::state::{GuardedEngine, ServerState};
use super::track_routes::make_track_routes;
use super::{log_requests, ServerConfig};
use crate::catalog_store::{CatalogCounts, CatalogError};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub catalog: CatalogCounts,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> Result<Response, CatalogError> {
    let catalog = run_blocking(state.engine.clone(), |e| e.store().counts()).await?;
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        catalog,
    };
    Ok(Json(stats).into_response())
}

pub fn make_app(config: ServerConfig, engine: GuardedEngine) -> Result<Router> {
    let state = ServerState::new(config, engine);

    let home_router: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone());

    let app: Router = home_router
        .merge(make_track_routes(state.clone()))
        .merge(make_entity_routes(state.clone()))
        .layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Serves the catalog API and the metrics endpoint until `shutdown` resolves.
pub async fn run_server<F>(config: ServerConfig, engine: GuardedEngine, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let port = config.port;
    let metrics_port = config.metrics_port;
    let app = make_app(config, engine)?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    info!("Listening on port {}, metrics on port {}", port, metrics_port);

    let (stop_metrics, metrics_stopped) = tokio::sync::oneshot::channel::<()>();
    let metrics_server = tokio::spawn(async move {
        axum::serve(metrics_listener, make_metrics_app())
            .with_graceful_shutdown(async {
                let _ = metrics_stopped.await;
            })
            .await
    });

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    let _ = stop_metrics.send(());
    metrics_server
        .await
        .context("Metrics server task failed")?
        .context("Metrics server failed")?;

    info!("Server stopped");
    Ok(served?)
}
