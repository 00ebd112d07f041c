//! Prometheus metrics for the patient-queue service

pub mod collector;

pub use collector::{
    FlowMetrics, MetricsCollector, MetricsTimer, PerformanceMetrics, ServiceMetrics,
};
