//! Observed wait statistics
//!
//! Every time a patient starts being served, the time they actually waited
//! is folded into running totals keyed by service point and priority. The
//! estimator reads these to quote waits for new arrivals.

use crate::error::QueueError;
use crate::types::{Priority, ServicePoint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Running totals for one service point / priority pair, in minutes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceWaitStats {
    pub sample_count: u64,
    pub sum_minutes: f64,
    pub sum_squared_minutes: f64,
    pub min_minutes: f64,
    pub max_minutes: f64,
    pub last_updated: DateTime<Utc>,
}

impl ServiceWaitStats {
    pub fn new() -> Self {
        Self {
            sample_count: 0,
            sum_minutes: 0.0,
            sum_squared_minutes: 0.0,
            min_minutes: f64::INFINITY,
            max_minutes: 0.0,
            last_updated: Utc::now(),
        }
    }

    /// Fold in one observed wait
    pub fn add_sample(&mut self, waited_minutes: u32) {
        let minutes = f64::from(waited_minutes);

        self.sample_count += 1;
        self.sum_minutes += minutes;
        self.sum_squared_minutes += minutes * minutes;
        self.min_minutes = self.min_minutes.min(minutes);
        self.max_minutes = self.max_minutes.max(minutes);
        self.last_updated = Utc::now();
    }

    pub fn mean(&self) -> f64 {
        if self.sample_count == 0 {
            return 0.0;
        }
        self.sum_minutes / self.sample_count as f64
    }

    /// Population standard deviation; 0 below two samples
    pub fn standard_deviation(&self) -> f64 {
        if self.sample_count <= 1 {
            return 0.0;
        }
        let mean = self.mean();
        let variance = (self.sum_squared_minutes / self.sample_count as f64) - mean * mean;
        variance.max(0.0).sqrt()
    }

    pub fn min(&self) -> f64 {
        if self.sample_count == 0 {
            0.0
        } else {
            self.min_minutes
        }
    }

    pub fn max(&self) -> f64 {
        self.max_minutes
    }

    pub fn has_sufficient_samples(&self, min_samples: u64) -> bool {
        self.sample_count >= min_samples
    }

    /// Time since the last sample
    pub fn age(&self) -> std::time::Duration {
        let age = Utc::now().signed_duration_since(self.last_updated);
        std::time::Duration::from_secs(age.num_seconds().max(0) as u64)
    }
}

impl Default for ServiceWaitStats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsKey {
    pub service_point: ServicePoint,
    pub priority: Priority,
}

impl StatsKey {
    pub fn new(service_point: ServicePoint, priority: Priority) -> Self {
        Self {
            service_point,
            priority,
        }
    }
}

/// Trait for tracking observed waits
pub trait StatisticsTracker: Send + Sync {
    fn record_wait(&self, key: StatsKey, waited_minutes: u32) -> crate::error::Result<()>;

    fn get_stats(&self, key: &StatsKey) -> crate::error::Result<Option<ServiceWaitStats>>;

    fn get_all_stats(&self) -> crate::error::Result<HashMap<StatsKey, ServiceWaitStats>>;

    fn clear_stats(&self, key: &StatsKey) -> crate::error::Result<()>;
}

/// In-memory statistics tracker holding at most `max_entries` keys
#[derive(Debug)]
pub struct InMemoryStatisticsTracker {
    state: RwLock<TrackerState>,
    max_entries: usize,
}

#[derive(Debug, Default)]
struct TrackerState {
    stats: HashMap<StatsKey, ServiceWaitStats>,
    /// Logical clock value of each key's latest sample
    touched: HashMap<StatsKey, u64>,
    clock: u64,
}

impl TrackerState {
    /// Drop the least recently recorded keys beyond `max_entries`
    fn evict_stale(&mut self, max_entries: usize) {
        if self.stats.len() <= max_entries {
            return;
        }

        let mut by_touch: Vec<(StatsKey, u64)> =
            self.touched.iter().map(|(key, tick)| (*key, *tick)).collect();
        by_touch.sort_by_key(|(_, tick)| *tick);

        let excess = self.stats.len() - max_entries;
        for (key, _) in by_touch.into_iter().take(excess) {
            self.stats.remove(&key);
            self.touched.remove(&key);
        }
    }
}

impl InMemoryStatisticsTracker {
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: RwLock::new(TrackerState::default()),
            max_entries,
        }
    }

    fn poisoned() -> QueueError {
        QueueError::InternalError {
            message: "Failed to acquire statistics lock".to_string(),
        }
    }
}

impl Default for InMemoryStatisticsTracker {
    fn default() -> Self {
        // Seven service points times three priorities fit with room to spare
        Self::new(64)
    }
}

impl StatisticsTracker for InMemoryStatisticsTracker {
    fn record_wait(&self, key: StatsKey, waited_minutes: u32) -> crate::error::Result<()> {
        let mut state = self.state.write().map_err(|_| Self::poisoned())?;

        state
            .stats
            .entry(key)
            .or_insert_with(ServiceWaitStats::new)
            .add_sample(waited_minutes);
        state.clock += 1;
        let tick = state.clock;
        state.touched.insert(key, tick);
        state.evict_stale(self.max_entries);

        Ok(())
    }

    fn get_stats(&self, key: &StatsKey) -> crate::error::Result<Option<ServiceWaitStats>> {
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        Ok(state.stats.get(key).cloned())
    }

    fn get_all_stats(&self) -> crate::error::Result<HashMap<StatsKey, ServiceWaitStats>> {
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        Ok(state.stats.clone())
    }

    fn clear_stats(&self, key: &StatsKey) -> crate::error::Result<()> {
        let mut state = self.state.write().map_err(|_| Self::poisoned())?;
        state.stats.remove(key);
        state.touched.remove(key);
        Ok(())
    }
}
