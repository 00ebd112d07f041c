//! Wait quoting for new queue entries
//!
//! Observed waits are tracked per service point and priority, and the
//! estimator turns that history into a quote for patients registered
//! without one.

pub mod estimator;
pub mod statistics;

// Re-export commonly used types
pub use estimator::{HistoricalWaitTimeEstimator, WaitTimeConfig, WaitTimeEstimator};
pub use statistics::{InMemoryStatisticsTracker, ServiceWaitStats, StatisticsTracker, StatsKey};
