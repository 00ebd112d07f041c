//! Main application state and service coordination
//!
//! `AppState` wires the queue store, wait statistics, metrics and the HTTP
//! server together and owns the background tasks. Request handlers only see
//! the shared `ServiceContext`.

use crate::config::AppConfig;
use crate::http::{HttpServer, HttpServerConfig};
use crate::metrics::MetricsCollector;
use crate::queue::{InMemoryQueueStore, QueueManager, QueueStore};
use crate::service::health::{HealthCheck, HealthStatus};
use crate::wait_time::{HistoricalWaitTimeEstimator, InMemoryStatisticsTracker};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Everything request handlers and health checks need
pub struct ServiceContext {
    service_name: String,
    queue_manager: Arc<QueueManager>,
    metrics_collector: Arc<MetricsCollector>,
    is_running: RwLock<bool>,
}

impl ServiceContext {
    pub fn new(
        service_name: impl Into<String>,
        queue_manager: Arc<QueueManager>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            queue_manager,
            metrics_collector,
            is_running: RwLock::new(false),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn queue_manager(&self) -> Arc<QueueManager> {
        self.queue_manager.clone()
    }

    pub fn metrics_collector(&self) -> Arc<MetricsCollector> {
        self.metrics_collector.clone()
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub async fn set_running(&self, running: bool) {
        *self.is_running.write().await = running;
    }
}

/// Main application state containing all service components
pub struct AppState {
    config: AppConfig,
    context: Arc<ServiceContext>,
    http_server: Arc<HttpServer>,
    background_tasks: Vec<JoinHandle<()>>,
}

impl AppState {
    /// Initialize the application, seeding the store if configured
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        let store = match &config.queue.seed_file {
            Some(path) => {
                info!("Seeding queue store from {}", path.display());
                InMemoryQueueStore::from_json_file(path).map_err(|e| {
                    ServiceError::Initialization {
                        message: format!("Failed to load seed file: {}", e),
                    }
                })?
            }
            None => InMemoryQueueStore::new(),
        };

        Self::with_store(config, Arc::new(store)).await
    }

    /// Initialize the application around an existing store
    pub async fn with_store(
        config: AppConfig,
        store: Arc<dyn QueueStore>,
    ) -> Result<Self, ServiceError> {
        info!("Initializing {} service", config.service.name);

        crate::config::validate_config(&config).map_err(|e| ServiceError::Configuration {
            message: e.to_string(),
        })?;

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let stats_tracker = Arc::new(InMemoryStatisticsTracker::new(
            config.queue.stats_max_entries,
        ));
        let estimator = Arc::new(
            HistoricalWaitTimeEstimator::new(config.wait_time.clone(), stats_tracker.clone())
                .map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to initialize wait estimator: {}", e),
                })?,
        );

        let queue_manager = Arc::new(QueueManager::new(
            store,
            stats_tracker,
            estimator,
            metrics_collector.clone(),
            config.queue.clone(),
        ));

        let context = Arc::new(ServiceContext::new(
            config.service.name.clone(),
            queue_manager,
            metrics_collector,
        ));

        let http_config = HttpServerConfig {
            host: config.service.http_host.clone(),
            port: config.service.http_port,
        };
        let http_server = Arc::new(HttpServer::new(http_config, context.clone()));

        Ok(Self {
            config,
            context,
            http_server,
            background_tasks: Vec::new(),
        })
    }

    /// Start the HTTP server and background tasks
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting {} service", self.config.service.name);

        self.context.set_running(true).await;

        self.start_http_server().await;
        self.start_background_tasks();

        info!("✅ {} service started", self.config.service.name);
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of {}", self.config.service.name);

        self.context.set_running(false).await;

        if let Err(e) = self.http_server.stop().await {
            warn!("Failed to stop HTTP server: {}", e);
        }

        self.stop_background_tasks().await;

        let final_stats = self
            .context
            .queue_manager()
            .get_stats()
            .await
            .map_err(|e| ServiceError::BackgroundTask {
                message: format!("Failed to get final stats: {}", e),
            })?;

        info!("Final queue statistics: {:?}", final_stats);
        info!("✅ {} shutdown completed", self.config.service.name);
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn context(&self) -> Arc<ServiceContext> {
        self.context.clone()
    }

    pub fn queue_manager(&self) -> Arc<QueueManager> {
        self.context.queue_manager()
    }

    pub fn metrics_collector(&self) -> Arc<MetricsCollector> {
        self.context.metrics_collector()
    }

    pub fn http_server(&self) -> Arc<HttpServer> {
        self.http_server.clone()
    }

    pub async fn is_running(&self) -> bool {
        self.context.is_running().await
    }

    async fn start_http_server(&mut self) {
        let http_server = self.http_server.clone();
        let port = self.config.service.http_port;

        let handle = tokio::spawn(async move {
            if let Err(e) = http_server.start().await {
                error!("HTTP server failed: {}", e);
            } else {
                info!("HTTP server task completed");
            }
        });
        self.background_tasks.push(handle);

        // Give the listener a moment to bind
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        info!("✅ HTTP server started on port {}", port);
    }

    fn start_background_tasks(&mut self) {
        let refresh_interval = self.config.refresh_interval();
        info!(
            "Starting queue refresh task ({}s interval)...",
            refresh_interval.as_secs()
        );

        let context = self.context.clone();
        let refresh_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(refresh_interval);

            while context.is_running().await {
                interval.tick().await;
                refresh_once(&context).await;
            }

            info!("Queue refresh task stopped");
        });

        self.background_tasks.push(refresh_task);
    }

    async fn stop_background_tasks(&mut self) {
        let task_count = self.background_tasks.len();
        if task_count == 0 {
            return;
        }

        info!("Stopping {} background tasks...", task_count);
        for (i, task) in self.background_tasks.drain(..).enumerate() {
            debug!("Aborting background task {}/{}", i + 1, task_count);
            task.abort();
        }

        info!("✅ All {} background tasks stopped", task_count);
    }
}

/// Recompute waiting gauges and health metrics from one snapshot
pub async fn refresh_once(context: &ServiceContext) {
    let metrics = context.metrics_collector();

    match context.queue_manager().refresh_metrics().await {
        Ok(()) => debug!("Queue gauges refreshed"),
        Err(e) => warn!("Queue refresh failed: {}", e),
    }

    match HealthCheck::check(context).await {
        Ok(health) => {
            metrics.update_health_status(health.status.as_gauge());
            for check in &health.checks {
                metrics.update_component_health(
                    &check.name,
                    check.status != HealthStatus::Unhealthy,
                );
            }
        }
        Err(e) => {
            warn!("Health check during refresh failed: {}", e);
            metrics.update_health_status(HealthStatus::Unhealthy.as_gauge());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Priority, RegistrationRequest, ServicePoint};

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.service.http_host = "127.0.0.1".to_string();
        config
    }

    #[tokio::test]
    async fn test_app_state_wires_components() {
        let state = AppState::new(test_config()).await.unwrap();
        assert!(!state.is_running().await);

        let manager = state.queue_manager();
        manager
            .register(RegistrationRequest {
                patient_id: "p1".to_string(),
                service_point: ServicePoint::Pharmacy,
                priority: Priority::Normal,
                estimated_wait_time: Some(12),
            })
            .await
            .unwrap();

        refresh_once(&state.context()).await;

        let flow = state.metrics_collector();
        assert_eq!(
            flow.flow().entries_waiting.with_label_values(&["pharmacy"]).get(),
            1
        );
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = test_config();
        config.queue.default_next_count = 0;

        let result = AppState::new(config).await;
        assert!(matches!(result, Err(ServiceError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_missing_seed_file_fails_initialization() {
        let mut config = test_config();
        config.queue.seed_file = Some("/nonexistent/queue.json".into());

        let result = AppState::new(config).await;
        assert!(matches!(result, Err(ServiceError::Initialization { .. })));
    }

    #[tokio::test]
    async fn test_refresh_marks_health_gauges() {
        let state = AppState::new(test_config()).await.unwrap();
        state.context().set_running(true).await;

        refresh_once(&state.context()).await;

        let metrics = state.metrics_collector();
        assert_eq!(metrics.service().health_status.get(), 2);
        assert_eq!(
            metrics
                .service()
                .component_health
                .with_label_values(&["queue_store"])
                .get(),
            1
        );
    }
}
