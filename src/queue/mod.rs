//! Patient queues
//!
//! Entries and their lifecycle, the pure ranking of a snapshot, the store
//! that owns the live entries and the manager that ties them together.

pub mod entry;
pub mod manager;
pub mod ranker;
pub mod store;

pub use manager::{QueueManager, QueueManagerStats};
pub use ranker::{board_for_tag, QueueRanker, DEFAULT_NEXT_COUNT};
pub use store::{InMemoryQueueStore, QueueStore};
