//! Health checks
//!
//! Readiness and liveness probes plus a detailed report combining
//! component status with current queue statistics.

use crate::queue::QueueManagerStats;
use crate::service::app::ServiceContext;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Health check status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Value exported on the health status gauge
    pub fn as_gauge(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 2,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 0,
        }
    }

    fn worst(self, other: HealthStatus) -> HealthStatus {
        if self.as_gauge() <= other.as_gauge() {
            self
        } else {
            other
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub checks: Vec<ComponentCheck>,
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    pub name: String,
    pub status: HealthStatus,
    /// Error message if not healthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

/// Queue statistics for health reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    pub total_entries: usize,
    pub active_entries: usize,
    pub patients_waiting: usize,
    pub patients_serving: usize,
}

impl From<QueueManagerStats> for ServiceStats {
    fn from(stats: QueueManagerStats) -> Self {
        Self {
            total_entries: stats.total_entries,
            active_entries: stats.active_entries,
            patients_waiting: stats.waiting,
            patients_serving: stats.serving,
        }
    }
}

impl HealthCheck {
    /// Perform a full health check of the service
    pub async fn check(context: &ServiceContext) -> Result<Self> {
        let service_check = Self::check_service_running(context).await;
        let (store_check, stats) = Self::check_queue_store(context).await;

        let status = service_check.status.worst(store_check.status);

        Ok(HealthCheck {
            status,
            service: context.service_name().to_string(),
            version: crate::VERSION.to_string(),
            timestamp: chrono::Utc::now(),
            checks: vec![service_check, store_check],
            stats,
        })
    }

    /// Liveness: the service loop is up
    pub async fn liveness_check(context: &ServiceContext) -> Result<HealthStatus> {
        if context.is_running().await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy)
        }
    }

    /// Readiness: running and able to read the queue store
    pub async fn readiness_check(context: &ServiceContext) -> Result<HealthStatus> {
        if !context.is_running().await {
            return Ok(HealthStatus::Unhealthy);
        }

        let (store_check, _) = Self::check_queue_store(context).await;
        Ok(store_check.status)
    }

    async fn check_service_running(context: &ServiceContext) -> ComponentCheck {
        let start = std::time::Instant::now();

        let (status, message) = if context.is_running().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn check_queue_store(context: &ServiceContext) -> (ComponentCheck, ServiceStats) {
        let start = std::time::Instant::now();

        let (status, message, stats) = match context.queue_manager().get_stats().await {
            Ok(stats) => (HealthStatus::Healthy, None, stats.into()),
            Err(e) => {
                error!("Queue store check failed: {}", e);
                (
                    HealthStatus::Unhealthy,
                    Some(format!("Snapshot failed: {}", e)),
                    ServiceStats::default(),
                )
            }
        };

        let check = ComponentCheck {
            name: "queue_store".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        (check, stats)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worst_status_wins() {
        assert_eq!(
            HealthStatus::Healthy.worst(HealthStatus::Degraded),
            HealthStatus::Degraded
        );
        assert_eq!(
            HealthStatus::Unhealthy.worst(HealthStatus::Healthy),
            HealthStatus::Unhealthy
        );
        assert_eq!(
            HealthStatus::Healthy.worst(HealthStatus::Healthy),
            HealthStatus::Healthy
        );
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Degraded).unwrap(),
            "\"degraded\""
        );
        assert_eq!(HealthStatus::Healthy.as_gauge(), 2);
    }

    #[test]
    fn test_stats_from_manager_stats() {
        let stats: ServiceStats = QueueManagerStats {
            total_entries: 5,
            active_entries: 3,
            waiting: 2,
            serving: 1,
        }
        .into();

        assert_eq!(stats.patients_waiting, 2);
        assert_eq!(stats.patients_serving, 1);
    }

    #[test]
    fn test_report_json() {
        let health = HealthCheck {
            status: HealthStatus::Unhealthy,
            service: "patient-queue".to_string(),
            version: "0.1.0".to_string(),
            timestamp: chrono::Utc::now(),
            checks: vec![ComponentCheck {
                name: "queue_store".to_string(),
                status: HealthStatus::Unhealthy,
                message: Some("queue backend unreachable".to_string()),
                duration_ms: 3,
            }],
            stats: ServiceStats::default(),
        };

        let json: serde_json::Value = serde_json::from_str(&health.to_json().unwrap()).unwrap();
        assert_eq!(json["status"], "unhealthy");
        assert_eq!(json["checks"][0]["name"], "queue_store");
        assert_eq!(json["checks"][0]["message"], "queue backend unreachable");
        assert_eq!(json["stats"]["patients_waiting"], 0);
    }
}
