//! Patient Queue - patient-flow queue service for hospital service points
//!
//! This crate ranks waiting patients by priority and quoted wait, builds
//! the boards shown on waiting-room displays, and tracks observed waits to
//! quote new arrivals.

pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod queue;
pub mod service;
pub mod types;
pub mod utils;
pub mod wait_time;

// Re-export commonly used types and traits
pub use error::{QueueError, Result};
pub use types::*;

// Re-export key components
pub use queue::{board_for_tag, InMemoryQueueStore, QueueManager, QueueRanker, QueueStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
