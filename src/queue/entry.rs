//! Status lifecycle of a queue entry
//!
//! ```text
//! waiting -> called -> serving -> completed
//! waiting | called | serving -> no-show
//! waiting | called           -> cancelled
//! ```
//!
//! `completed`, `no-show` and `cancelled` are terminal. Nothing moves back
//! to `waiting` once it has advanced.

use crate::error::{QueueError, Result};
use crate::types::{QueueEntry, QueueStatus};
use chrono::{DateTime, Utc};

impl QueueStatus {
    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueueStatus::Completed | QueueStatus::NoShow | QueueStatus::Cancelled
        )
    }

    /// Whether `self -> next` is a legal move
    pub fn can_transition_to(&self, next: QueueStatus) -> bool {
        use QueueStatus::*;

        matches!(
            (*self, next),
            (Waiting, Called)
                | (Called, Serving)
                | (Serving, Completed)
                | (Waiting | Called | Serving, NoShow)
                | (Waiting | Called, Cancelled)
        )
    }
}

impl QueueEntry {
    /// Waiting, called or serving
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Move to `next`, stamping `start_time` on entering `serving` and
    /// `end_time` on entering a terminal state
    pub fn transition(&mut self, next: QueueStatus, at: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(QueueError::InvalidTransition {
                entry_id: self.id.clone(),
                from: self.status,
                to: next,
            }
            .into());
        }

        self.status = next;
        if next == QueueStatus::Serving {
            self.start_time = Some(at);
        }
        if next.is_terminal() {
            self.end_time = Some(at);
        }

        Ok(())
    }
}
