//! Common types used throughout the patient queue service

use crate::error::QueueError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Opaque identifier for queue entries
pub type EntryId = String;

/// Opaque reference to a patient record held elsewhere
pub type PatientId = String;

/// Human-readable ticket label, unique within a service point
pub type TicketNumber = String;

/// A named physical queue within the hospital
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServicePoint {
    Triage,
    Consultation,
    Pharmacy,
    Laboratory,
    Radiology,
    Billing,
    Cashier,
}

impl ServicePoint {
    /// Every service point, in display order
    pub const ALL: [ServicePoint; 7] = [
        ServicePoint::Triage,
        ServicePoint::Consultation,
        ServicePoint::Pharmacy,
        ServicePoint::Laboratory,
        ServicePoint::Radiology,
        ServicePoint::Billing,
        ServicePoint::Cashier,
    ];

    /// Wire tag, also used as the metrics label
    pub fn as_str(&self) -> &'static str {
        match self {
            ServicePoint::Triage => "triage",
            ServicePoint::Consultation => "consultation",
            ServicePoint::Pharmacy => "pharmacy",
            ServicePoint::Laboratory => "laboratory",
            ServicePoint::Radiology => "radiology",
            ServicePoint::Billing => "billing",
            ServicePoint::Cashier => "cashier",
        }
    }

    /// Letter printed in front of the ticket sequence number
    pub fn ticket_prefix(&self) -> char {
        match self {
            ServicePoint::Triage => 'T',
            ServicePoint::Consultation => 'C',
            ServicePoint::Pharmacy => 'P',
            ServicePoint::Laboratory => 'L',
            ServicePoint::Radiology => 'R',
            ServicePoint::Billing => 'B',
            ServicePoint::Cashier => 'K',
        }
    }
}

impl std::fmt::Display for ServicePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServicePoint {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServicePoint::ALL
            .into_iter()
            .find(|sp| sp.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| QueueError::UnknownServicePoint {
                value: s.to_string(),
            })
    }
}

/// Lifecycle state of a queue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueStatus {
    Waiting,
    Called,
    Serving,
    Completed,
    NoShow,
    Cancelled,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Waiting => "waiting",
            QueueStatus::Called => "called",
            QueueStatus::Serving => "serving",
            QueueStatus::Completed => "completed",
            QueueStatus::NoShow => "no-show",
            QueueStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clinical priority class.
///
/// Variant order is the serving order, so the derived `Ord` agrees with
/// [`Priority::rank`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Emergency,
    Urgent,
    #[default]
    Normal,
}

impl Priority {
    /// Sort key: emergency=0, urgent=1, normal=2
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Emergency => 0,
            Priority::Urgent => 1,
            Priority::Normal => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Emergency => "emergency",
            Priority::Urgent => "urgent",
            Priority::Normal => "normal",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "emergency" => Ok(Priority::Emergency),
            "urgent" => Ok(Priority::Urgent),
            "normal" => Ok(Priority::Normal),
            other => Err(QueueError::InvalidRegistration {
                reason: format!("unknown priority '{}'", other),
            }),
        }
    }
}

/// A patient's place in one service point's queue.
///
/// `estimated_wait_time` is always present here; a missing or null value in
/// the incoming JSON is read as 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub id: EntryId,
    pub patient_id: PatientId,
    pub service_point: ServicePoint,
    pub ticket_number: TicketNumber,
    pub status: QueueStatus,
    pub priority: Priority,
    /// Quoted wait in minutes
    #[serde(default, deserialize_with = "crate::utils::wait_minutes_or_zero")]
    pub estimated_wait_time: u32,
    pub arrival_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

/// Request to put a patient into a service point queue
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub patient_id: PatientId,
    pub service_point: ServicePoint,
    #[serde(default)]
    pub priority: Priority,
    /// Quoted wait in minutes, if the registering desk supplied one
    #[serde(default)]
    pub estimated_wait_time: Option<u32>,
}

/// What a queue display shows for one service point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueBoard {
    /// Service point tag as requested
    pub service_point: String,
    pub currently_serving: Vec<TicketNumber>,
    pub next_in_queue: Vec<TicketNumber>,
    pub total_waiting: usize,
    /// Rounded mean of the quoted waits, in minutes
    pub average_wait_time: u32,
    pub generated_at: DateTime<Utc>,
}

/// The entry that best describes where a patient currently is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientQueueStatus {
    pub entry: QueueEntry,
    /// 1-based place among the waiting entries, when waiting
    pub position: Option<usize>,
    /// Total entries the patient has across all service points
    pub entry_count: usize,
}
