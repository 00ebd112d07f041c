//! Queue display and monitoring endpoints
//!
//! Boards for waiting-room screens, per-patient status lookups, health
//! probes and Prometheus metrics, served with axum. A store failure is
//! reported as 503 so a screen never mistakes it for an empty queue.

use crate::error::QueueError;
use crate::service::app::ServiceContext;
use crate::service::health::{HealthCheck, HealthStatus};
use crate::types::ServicePoint;
use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::TextEncoder;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub port: u16,
    /// Host to bind to (typically "0.0.0.0" for all interfaces)
    pub host: String,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
        }
    }
}

pub struct HttpServer {
    config: HttpServerConfig,
    context: Arc<ServiceContext>,
    shutdown_tx: broadcast::Sender<()>,
}

/// `?count=N` on board requests
#[derive(Debug, Default, Deserialize)]
pub struct BoardQuery {
    pub count: Option<usize>,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig, context: Arc<ServiceContext>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            context,
            shutdown_tx,
        }
    }

    /// Bind and serve until `stop` is called
    pub async fn start(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("Invalid HTTP server address")?;

        let app = self.router();
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        info!("HTTP server listening on http://{}", addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("HTTP server shutdown signal received");
            })
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }

    pub fn router(&self) -> Router {
        create_router(self.context.clone())
    }

    pub async fn stop(&self) -> Result<()> {
        info!("Stopping HTTP server...");

        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to HTTP server: {}", e);
        }

        Ok(())
    }
}

/// Build the router over a shared service context
pub fn create_router(context: Arc<ServiceContext>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/alive", get(alive_handler))
        .route("/metrics", get(metrics_handler))
        .route("/stats", get(stats_handler))
        .route("/queues", get(all_boards_handler))
        .route("/queues/{service_point}", get(board_handler))
        .route(
            "/patients/{patient_id}/queue-status",
            get(patient_status_handler),
        )
        .with_state(context)
}

/// Map a queue failure onto a status code and JSON error body
fn error_response(err: anyhow::Error) -> Response {
    let status = match err.downcast_ref::<QueueError>() {
        Some(e) if e.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
        Some(QueueError::EntryNotFound { .. }) => StatusCode::NOT_FOUND,
        Some(QueueError::InvalidRegistration { .. } | QueueError::UnknownServicePoint { .. }) => {
            StatusCode::BAD_REQUEST
        }
        Some(_) => StatusCode::INTERNAL_SERVER_ERROR,
        None => StatusCode::SERVICE_UNAVAILABLE,
    };

    if status.is_server_error() {
        error!("Request failed: {}", err);
    }

    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

async fn root_handler(State(context): State<Arc<ServiceContext>>) -> impl IntoResponse {
    let service_points: Vec<&str> = ServicePoint::ALL.iter().map(|sp| sp.as_str()).collect();

    Json(json!({
        "service": context.service_name(),
        "version": crate::VERSION,
        "servicePoints": service_points,
        "endpoints": [
            "/health",
            "/ready",
            "/alive",
            "/metrics",
            "/stats",
            "/queues",
            "/queues/{service_point}",
            "/patients/{patient_id}/queue-status"
        ]
    }))
}

async fn health_handler(State(context): State<Arc<ServiceContext>>) -> impl IntoResponse {
    debug!("Health check requested");

    let (code, status) = match HealthCheck::liveness_check(&context).await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, HealthStatus::Healthy),
        Ok(HealthStatus::Degraded) => (StatusCode::OK, HealthStatus::Degraded),
        Ok(HealthStatus::Unhealthy) | Err(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, HealthStatus::Unhealthy)
        }
    };

    (
        code,
        Json(json!({
            "status": status,
            "service": context.service_name(),
            "version": crate::VERSION
        })),
    )
}

async fn ready_handler(State(context): State<Arc<ServiceContext>>) -> impl IntoResponse {
    debug!("Readiness check requested");

    match HealthCheck::readiness_check(&context).await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "Ready"),
        Ok(HealthStatus::Degraded) => (StatusCode::OK, "Degraded but ready"),
        Ok(HealthStatus::Unhealthy) => (StatusCode::SERVICE_UNAVAILABLE, "Not ready"),
        Err(e) => {
            error!("Readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "Not ready")
        }
    }
}

async fn alive_handler(State(context): State<Arc<ServiceContext>>) -> impl IntoResponse {
    match HealthCheck::liveness_check(&context).await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "Alive"),
        _ => (StatusCode::SERVICE_UNAVAILABLE, "Not alive"),
    }
}

async fn metrics_handler(State(context): State<Arc<ServiceContext>>) -> Response {
    let metric_families = context.metrics_collector().registry().gather();
    let encoder = TextEncoder::new();

    match encoder.encode_to_string(&metric_families) {
        Ok(output) => {
            debug!("Serving {} metric families", metric_families.len());
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
                output,
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics".to_string(),
            )
                .into_response()
        }
    }
}

async fn stats_handler(State(context): State<Arc<ServiceContext>>) -> Response {
    match HealthCheck::check(&context).await {
        Ok(health) => {
            let code = if health.status == HealthStatus::Unhealthy {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::OK
            };
            (code, Json(health)).into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn all_boards_handler(
    State(context): State<Arc<ServiceContext>>,
    Query(query): Query<BoardQuery>,
) -> Response {
    match context.queue_manager().all_boards(query.count).await {
        Ok(boards) => Json(boards).into_response(),
        Err(e) => error_response(e),
    }
}

async fn board_handler(
    State(context): State<Arc<ServiceContext>>,
    Path(service_point): Path<String>,
    Query(query): Query<BoardQuery>,
) -> Response {
    debug!("Board requested for '{}'", service_point);
    let manager = context.queue_manager();

    let result = match service_point.parse::<ServicePoint>() {
        Ok(parsed) => manager.board(parsed, query.count).await,
        Err(_) => manager.board_for_tag(&service_point, query.count).await,
    };

    match result {
        Ok(board) => Json(board).into_response(),
        Err(e) => error_response(e),
    }
}

async fn patient_status_handler(
    State(context): State<Arc<ServiceContext>>,
    Path(patient_id): Path<String>,
) -> Response {
    match context.queue_manager().patient_status(&patient_id).await {
        Ok(Some(status)) => Json(status).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("No queue entry for patient {}", patient_id) })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}
