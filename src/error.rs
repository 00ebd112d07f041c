//! Error types for the patient queue service
//!
//! Domain failures are modelled with `thiserror` and carried through the
//! crate as `anyhow::Error`, so callers that need to branch on a specific
//! failure can `downcast_ref::<QueueError>()`.

use crate::types::QueueStatus;

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific queue scenarios
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Queue store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("Queue entry not found: {entry_id}")]
    EntryNotFound { entry_id: String },

    #[error("Invalid status transition for {entry_id}: {from} -> {to}")]
    InvalidTransition {
        entry_id: String,
        from: QueueStatus,
        to: QueueStatus,
    },

    #[error("Unknown service point: {value}")]
    UnknownServicePoint { value: String },

    #[error("Invalid registration: {reason}")]
    InvalidRegistration { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl QueueError {
    /// True when the error means the data could not be read at all, as
    /// opposed to a rejected operation on readable data
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            QueueError::StoreUnavailable { .. } | QueueError::InternalError { .. }
        )
    }
}
