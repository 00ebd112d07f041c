//! Wait quotes for new arrivals
//!
//! When the registering desk does not quote a wait, one is derived from
//! what patients of the same priority actually waited at the same service
//! point: `mean + multiplier * std_dev`, clamped to configured bounds.

use crate::error::QueueError;
use crate::types::{Priority, ServicePoint};
use crate::wait_time::statistics::{ServiceWaitStats, StatisticsTracker, StatsKey};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for wait quotes, all values in minutes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitTimeConfig {
    pub min_wait_minutes: u32,
    pub max_wait_minutes: u32,
    pub std_dev_multiplier: f64,
    /// Samples needed before history replaces the defaults
    pub min_samples_for_dynamic: u64,
    pub default_emergency_minutes: u32,
    pub default_urgent_minutes: u32,
    pub default_normal_minutes: u32,
    /// History older than this is ignored
    pub max_stats_age_seconds: u64,
}

impl Default for WaitTimeConfig {
    fn default() -> Self {
        Self {
            min_wait_minutes: 0,
            max_wait_minutes: 240,
            std_dev_multiplier: 0.5,
            min_samples_for_dynamic: 10,
            default_emergency_minutes: 0,
            default_urgent_minutes: 10,
            default_normal_minutes: 30,
            max_stats_age_seconds: 4 * 3600,
        }
    }
}

impl WaitTimeConfig {
    pub fn default_for(&self, priority: Priority) -> u32 {
        match priority {
            Priority::Emergency => self.default_emergency_minutes,
            Priority::Urgent => self.default_urgent_minutes,
            Priority::Normal => self.default_normal_minutes,
        }
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if self.min_wait_minutes >= self.max_wait_minutes {
            return Err(QueueError::ConfigurationError {
                message: "min_wait_minutes must be less than max_wait_minutes".to_string(),
            }
            .into());
        }

        if !self.std_dev_multiplier.is_finite() || self.std_dev_multiplier < 0.0 {
            return Err(QueueError::ConfigurationError {
                message: "std_dev_multiplier must be a non-negative number".to_string(),
            }
            .into());
        }

        if self.min_samples_for_dynamic == 0 {
            return Err(QueueError::ConfigurationError {
                message: "min_samples_for_dynamic must be greater than 0".to_string(),
            }
            .into());
        }

        for priority in [Priority::Emergency, Priority::Urgent, Priority::Normal] {
            let default = self.default_for(priority);
            if default < self.min_wait_minutes || default > self.max_wait_minutes {
                return Err(QueueError::ConfigurationError {
                    message: format!("default {} wait must be within min/max bounds", priority),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// Quotes a wait for a patient about to join a queue
pub trait WaitTimeEstimator: Send + Sync {
    fn estimate_wait(
        &self,
        service_point: ServicePoint,
        priority: Priority,
    ) -> crate::error::Result<u32>;

    fn config(&self) -> &WaitTimeConfig;
}

/// Estimator backed by observed waits
pub struct HistoricalWaitTimeEstimator {
    config: WaitTimeConfig,
    stats_tracker: Arc<dyn StatisticsTracker>,
}

impl HistoricalWaitTimeEstimator {
    pub fn new(
        config: WaitTimeConfig,
        stats_tracker: Arc<dyn StatisticsTracker>,
    ) -> crate::error::Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            stats_tracker,
        })
    }

    fn quote_from_history(&self, stats: &ServiceWaitStats) -> u32 {
        let target = stats.mean() + self.config.std_dev_multiplier * stats.standard_deviation();
        let bounded = target
            .round()
            .max(f64::from(self.config.min_wait_minutes))
            .min(f64::from(self.config.max_wait_minutes));
        bounded as u32
    }

    fn fallback(&self, priority: Priority, reason: &str) -> u32 {
        debug!("Using default {} wait: {}", priority, reason);
        self.config.default_for(priority)
    }
}

impl WaitTimeEstimator for HistoricalWaitTimeEstimator {
    fn estimate_wait(
        &self,
        service_point: ServicePoint,
        priority: Priority,
    ) -> crate::error::Result<u32> {
        let key = StatsKey::new(service_point, priority);

        let Some(stats) = self.stats_tracker.get_stats(&key)? else {
            return Ok(self.fallback(priority, "no history"));
        };

        if !stats.has_sufficient_samples(self.config.min_samples_for_dynamic) {
            return Ok(self.fallback(priority, "insufficient samples"));
        }

        if stats.age() > Duration::from_secs(self.config.max_stats_age_seconds) {
            warn!(
                "Wait history for {}/{} is stale (age: {:?})",
                service_point,
                priority,
                stats.age()
            );
            return Ok(self.fallback(priority, "stale history"));
        }

        let quote = self.quote_from_history(&stats);
        debug!(
            "Quoted {} min at {}/{} (samples: {}, mean: {:.1}, std_dev: {:.1})",
            quote,
            service_point,
            priority,
            stats.sample_count,
            stats.mean(),
            stats.standard_deviation()
        );
        Ok(quote)
    }

    fn config(&self) -> &WaitTimeConfig {
        &self.config
    }
}
