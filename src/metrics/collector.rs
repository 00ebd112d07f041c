//! Metrics collection using Prometheus
//!
//! All metric names carry the `patient_queue_` prefix. Each collector owns
//! its own registry so tests can create as many as they like.

use crate::types::{Priority, QueueBoard, QueueStatus, ServicePoint};
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the queue service
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,
    service_metrics: ServiceMetrics,
    flow_metrics: FlowMetrics,
    performance_metrics: PerformanceMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,

    /// Store reads or writes that failed
    pub store_errors_total: IntCounterVec,
}

/// Patient flow through the queues
#[derive(Clone)]
pub struct FlowMetrics {
    pub entries_registered_total: IntCounterVec,

    /// Transitions by the status entered
    pub status_transitions_total: IntCounterVec,

    pub entries_waiting: IntGaugeVec,

    /// Average quoted wait of waiting entries
    pub average_quoted_wait_minutes: IntGaugeVec,

    /// Minutes between arrival and start of service
    pub observed_wait_minutes: HistogramVec,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Board requests by service point; tag lookups that bypass typed
    /// service points (including unknown tags) count under `other`
    pub board_requests_total: IntCounterVec,

    pub snapshot_duration: Histogram,

    pub operation_duration: HistogramVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector on an existing registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let flow_metrics = FlowMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            flow_metrics,
            performance_metrics,
        })
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    pub fn flow(&self) -> &FlowMetrics {
        &self.flow_metrics
    }

    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Record a patient joining a queue
    pub fn record_registration(&self, service_point: ServicePoint, priority: Priority) {
        self.flow_metrics
            .entries_registered_total
            .with_label_values(&[service_point.as_str(), priority.as_str()])
            .inc();
    }

    /// Record an entry moving into `status`
    pub fn record_transition(&self, service_point: ServicePoint, status: QueueStatus) {
        self.flow_metrics
            .status_transitions_total
            .with_label_values(&[service_point.as_str(), status.as_str()])
            .inc();
    }

    /// Record how long a patient actually waited before service
    pub fn record_observed_wait(
        &self,
        service_point: ServicePoint,
        priority: Priority,
        waited_minutes: u32,
    ) {
        self.flow_metrics
            .observed_wait_minutes
            .with_label_values(&[service_point.as_str(), priority.as_str()])
            .observe(f64::from(waited_minutes));
    }

    /// Mirror a freshly computed board into the waiting gauges
    pub fn update_from_board(&self, service_point: ServicePoint, board: &QueueBoard) {
        let label = service_point.as_str();

        self.flow_metrics
            .entries_waiting
            .with_label_values(&[label])
            .set(board.total_waiting as i64);

        self.flow_metrics
            .average_quoted_wait_minutes
            .with_label_values(&[label])
            .set(i64::from(board.average_wait_time));
    }

    pub fn record_board_request(&self, service_point: &str) {
        self.performance_metrics
            .board_requests_total
            .with_label_values(&[service_point])
            .inc();
    }

    pub fn record_snapshot(&self, duration: Duration) {
        self.performance_metrics
            .snapshot_duration
            .observe(duration.as_secs_f64());
    }

    pub fn record_operation(&self, operation: &str, duration: Duration) {
        self.performance_metrics
            .operation_duration
            .with_label_values(&[operation])
            .observe(duration.as_secs_f64());
    }

    pub fn record_store_error(&self, operation: &str) {
        self.service_metrics
            .store_errors_total
            .with_label_values(&[operation])
            .inc();
    }

    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(i64::from(status));
    }

    pub fn update_component_health(&self, component: &str, healthy: bool) {
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(i64::from(healthy));
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let health_status = IntGauge::new(
            "patient_queue_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new("patient_queue_component_health", "Component health status"),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        let store_errors_total = IntCounterVec::new(
            Opts::new("patient_queue_store_errors_total", "Failed store operations"),
            &["operation"],
        )?;
        registry.register(Box::new(store_errors_total.clone()))?;

        Ok(Self {
            health_status,
            component_health,
            store_errors_total,
        })
    }
}

impl FlowMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let entries_registered_total = IntCounterVec::new(
            Opts::new(
                "patient_queue_entries_registered_total",
                "Patients registered into a queue",
            ),
            &["service_point", "priority"],
        )?;
        registry.register(Box::new(entries_registered_total.clone()))?;

        let status_transitions_total = IntCounterVec::new(
            Opts::new(
                "patient_queue_status_transitions_total",
                "Queue entry status transitions",
            ),
            &["service_point", "status"],
        )?;
        registry.register(Box::new(status_transitions_total.clone()))?;

        let entries_waiting = IntGaugeVec::new(
            Opts::new("patient_queue_entries_waiting", "Entries currently waiting"),
            &["service_point"],
        )?;
        registry.register(Box::new(entries_waiting.clone()))?;

        let average_quoted_wait_minutes = IntGaugeVec::new(
            Opts::new(
                "patient_queue_average_quoted_wait_minutes",
                "Average quoted wait of waiting entries",
            ),
            &["service_point"],
        )?;
        registry.register(Box::new(average_quoted_wait_minutes.clone()))?;

        let observed_wait_minutes = HistogramVec::new(
            HistogramOpts::new(
                "patient_queue_observed_wait_minutes",
                "Minutes from arrival to start of service",
            )
            .buckets(vec![
                0.0, 5.0, 10.0, 15.0, 30.0, 45.0, 60.0, 90.0, 120.0, 180.0, 240.0,
            ]),
            &["service_point", "priority"],
        )?;
        registry.register(Box::new(observed_wait_minutes.clone()))?;

        Ok(Self {
            entries_registered_total,
            status_transitions_total,
            entries_waiting,
            average_quoted_wait_minutes,
            observed_wait_minutes,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let board_requests_total = IntCounterVec::new(
            Opts::new("patient_queue_board_requests_total", "Queue board requests"),
            &["service_point"],
        )?;
        registry.register(Box::new(board_requests_total.clone()))?;

        let snapshot_duration = Histogram::with_opts(
            HistogramOpts::new(
                "patient_queue_snapshot_duration_seconds",
                "Time to copy a store snapshot",
            )
            .buckets(vec![0.0001, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        )?;
        registry.register(Box::new(snapshot_duration.clone()))?;

        let operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "patient_queue_operation_duration_seconds",
                "Queue operation duration",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        Ok(Self {
            board_requests_total,
            snapshot_duration,
            operation_duration,
        })
    }
}
