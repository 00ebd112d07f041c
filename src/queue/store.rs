//! Queue entry storage
//!
//! The store is the upstream collaborator the ranking code reads from. It
//! hands out whole snapshots so a ranking never observes a half-applied
//! update, and it owns ticket assignment so concurrent registrations at the
//! same desk cannot be issued the same number.

use crate::error::{QueueError, Result};
use crate::types::{
    EntryId, QueueEntry, QueueStatus, RegistrationRequest, ServicePoint, TicketNumber,
};
use crate::utils::{format_ticket_number, generate_entry_id, parse_ticket_sequence};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, info, warn};

/// Source of truth for queue entries
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Every entry in insertion order, copied under a single read
    async fn snapshot(&self) -> Result<Vec<QueueEntry>>;

    /// Look up one entry
    async fn get(&self, entry_id: &str) -> Result<Option<QueueEntry>>;

    /// Create a waiting entry, assigning its id, ticket number and arrival time
    async fn register(
        &self,
        request: RegistrationRequest,
        estimated_wait_time: u32,
        at: DateTime<Utc>,
    ) -> Result<QueueEntry>;

    /// Apply a validated status transition and return the updated entry
    async fn update_status(
        &self,
        entry_id: &str,
        status: QueueStatus,
        at: DateTime<Utc>,
    ) -> Result<QueueEntry>;
}

/// In-memory queue store
#[derive(Debug, Default)]
pub struct InMemoryQueueStore {
    entries: RwLock<Vec<QueueEntry>>,
}

impl InMemoryQueueStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with existing entries
    pub fn with_entries(entries: Vec<QueueEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Load a JSON array of entries, e.g. a day's seed data
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| QueueError::StoreUnavailable {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;
        let entries: Vec<QueueEntry> =
            serde_json::from_str(&raw).map_err(|e| QueueError::StoreUnavailable {
                message: format!("Failed to parse {}: {}", path.display(), e),
            })?;

        for (service_point, ticket) in duplicate_active_tickets(&entries) {
            warn!(
                "Seed data has more than one active ticket {} at {}",
                ticket, service_point
            );
        }

        info!("Loaded {} queue entries from {}", entries.len(), path.display());
        Ok(Self::with_entries(entries))
    }

    fn lock_poisoned(kind: &str) -> QueueError {
        QueueError::StoreUnavailable {
            message: format!("Failed to acquire queue {} lock", kind),
        }
    }
}

/// Ticket labels used by more than one non-terminal entry at the same
/// service point, each reported once
pub fn duplicate_active_tickets(entries: &[QueueEntry]) -> Vec<(ServicePoint, TicketNumber)> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();

    for entry in entries.iter().filter(|entry| entry.is_active()) {
        let key = (entry.service_point, entry.ticket_number.clone());
        if !seen.insert(key.clone()) && !duplicates.contains(&key) {
            duplicates.push(key);
        }
    }

    duplicates
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn snapshot(&self) -> Result<Vec<QueueEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| Self::lock_poisoned("read"))?;
        Ok(entries.clone())
    }

    async fn get(&self, entry_id: &str) -> Result<Option<QueueEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| Self::lock_poisoned("read"))?;
        Ok(entries.iter().find(|entry| entry.id == entry_id).cloned())
    }

    async fn register(
        &self,
        request: RegistrationRequest,
        estimated_wait_time: u32,
        at: DateTime<Utc>,
    ) -> Result<QueueEntry> {
        if request.patient_id.trim().is_empty() {
            return Err(QueueError::InvalidRegistration {
                reason: "patient id cannot be empty".to_string(),
            }
            .into());
        }

        let mut entries = self
            .entries
            .write()
            .map_err(|_| Self::lock_poisoned("write"))?;

        let service_point = request.service_point;
        let sequence = entries
            .iter()
            .filter(|entry| entry.service_point == service_point)
            .filter_map(|entry| parse_ticket_sequence(service_point, &entry.ticket_number))
            .max()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| QueueError::InvalidRegistration {
                reason: format!("ticket sequence exhausted for {}", service_point),
            })?;
        let ticket_number = format_ticket_number(service_point, sequence);

        let entry = QueueEntry {
            id: generate_entry_id(),
            patient_id: request.patient_id,
            service_point,
            ticket_number,
            status: QueueStatus::Waiting,
            priority: request.priority,
            estimated_wait_time,
            arrival_time: at,
            start_time: None,
            end_time: None,
        };
        entries.push(entry.clone());

        debug!(
            "Registered ticket {} at {} (priority: {})",
            entry.ticket_number, service_point, entry.priority
        );
        Ok(entry)
    }

    async fn update_status(
        &self,
        entry_id: &str,
        status: QueueStatus,
        at: DateTime<Utc>,
    ) -> Result<QueueEntry> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Self::lock_poisoned("write"))?;

        let entry = entries
            .iter_mut()
            .find(|entry| entry.id == entry_id)
            .ok_or_else(|| QueueError::EntryNotFound {
                entry_id: EntryId::from(entry_id),
            })?;

        entry.transition(status, at)?;
        Ok(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Priority;
    use crate::utils::current_timestamp;

    fn request(patient: &str, service_point: ServicePoint) -> RegistrationRequest {
        RegistrationRequest {
            patient_id: patient.to_string(),
            service_point,
            priority: Priority::Normal,
            estimated_wait_time: None,
        }
    }

    #[tokio::test]
    async fn test_register_assigns_sequential_tickets_per_service_point() {
        let store = InMemoryQueueStore::new();
        let now = current_timestamp();

        let t1 = store
            .register(request("p1", ServicePoint::Triage), 10, now)
            .await
            .unwrap();
        let t2 = store
            .register(request("p2", ServicePoint::Triage), 5, now)
            .await
            .unwrap();
        let p1 = store
            .register(request("p3", ServicePoint::Pharmacy), 0, now)
            .await
            .unwrap();

        assert_eq!(t1.ticket_number, "T001");
        assert_eq!(t2.ticket_number, "T002");
        assert_eq!(p1.ticket_number, "P001");
        assert_eq!(t1.status, QueueStatus::Waiting);
        assert_eq!(t1.estimated_wait_time, 10);
        assert_eq!(t1.arrival_time, now);

        let snapshot = store.snapshot().await.unwrap();
        let order: Vec<_> = snapshot.iter().map(|e| e.ticket_number.as_str()).collect();
        assert_eq!(order, vec!["T001", "T002", "P001"]);
    }

    #[tokio::test]
    async fn test_register_rejects_empty_patient() {
        let store = InMemoryQueueStore::new();
        let err = store
            .register(request("  ", ServicePoint::Triage), 0, current_timestamp())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<QueueError>(),
            Some(QueueError::InvalidRegistration { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_status_validates_transition() {
        let store = InMemoryQueueStore::new();
        let entry = store
            .register(request("p1", ServicePoint::Laboratory), 0, current_timestamp())
            .await
            .unwrap();

        let called = store
            .update_status(&entry.id, QueueStatus::Called, current_timestamp())
            .await
            .unwrap();
        assert_eq!(called.status, QueueStatus::Called);

        let err = store
            .update_status(&entry.id, QueueStatus::Waiting, current_timestamp())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<QueueError>(),
            Some(QueueError::InvalidTransition { .. })
        ));

        let stored = store.get(&entry.id).await.unwrap().unwrap();
        assert_eq!(stored.status, QueueStatus::Called);
    }

    #[test]
    fn test_update_unknown_entry() {
        let store = InMemoryQueueStore::new();
        let err = tokio_test::block_on(store.update_status(
            "missing",
            QueueStatus::Called,
            current_timestamp(),
        ))
        .unwrap_err();

        assert_eq!(
            err.downcast_ref::<QueueError>(),
            Some(&QueueError::EntryNotFound {
                entry_id: "missing".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_snapshot_is_detached_copy() {
        let store = InMemoryQueueStore::new();
        let entry = store
            .register(request("p1", ServicePoint::Billing), 0, current_timestamp())
            .await
            .unwrap();

        let before = store.snapshot().await.unwrap();
        store
            .update_status(&entry.id, QueueStatus::Cancelled, current_timestamp())
            .await
            .unwrap();

        assert_eq!(before[0].status, QueueStatus::Waiting);
        assert_eq!(
            store.snapshot().await.unwrap()[0].status,
            QueueStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_ticket_sequence_continues_after_seed() {
        let now = current_timestamp();
        let seeded = QueueEntry {
            id: "seed-1".to_string(),
            patient_id: "p0".to_string(),
            service_point: ServicePoint::Radiology,
            ticket_number: "R007".to_string(),
            status: QueueStatus::Completed,
            priority: Priority::Normal,
            estimated_wait_time: 0,
            arrival_time: now,
            start_time: None,
            end_time: Some(now),
        };
        let store = InMemoryQueueStore::with_entries(vec![seeded]);

        let entry = store
            .register(request("p1", ServicePoint::Radiology), 0, now)
            .await
            .unwrap();
        assert_eq!(entry.ticket_number, "R008");
    }

    fn completed_ticket(ticket: &str) -> QueueEntry {
        let now = current_timestamp();
        QueueEntry {
            id: format!("seed-{}", ticket),
            patient_id: "p0".to_string(),
            service_point: ServicePoint::Triage,
            ticket_number: ticket.to_string(),
            status: QueueStatus::Completed,
            priority: Priority::Normal,
            estimated_wait_time: 0,
            arrival_time: now,
            start_time: None,
            end_time: Some(now),
        }
    }

    #[tokio::test]
    async fn test_ticket_sequence_past_u32_range() {
        let store = InMemoryQueueStore::with_entries(vec![completed_ticket("T4294967295")]);

        let entry = store
            .register(request("p1", ServicePoint::Triage), 0, current_timestamp())
            .await
            .unwrap();
        assert_eq!(entry.ticket_number, "T4294967296");
    }

    #[tokio::test]
    async fn test_exhausted_ticket_sequence_is_rejected() {
        let store = InMemoryQueueStore::with_entries(vec![completed_ticket(
            "T99999999999999999999999",
        )]);

        let err = store
            .register(request("p1", ServicePoint::Triage), 0, current_timestamp())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<QueueError>(),
            Some(QueueError::InvalidRegistration { .. })
        ));

        // Nothing was issued, and other service points are unaffected
        assert_eq!(store.snapshot().await.unwrap().len(), 1);
        let entry = store
            .register(request("p2", ServicePoint::Pharmacy), 0, current_timestamp())
            .await
            .unwrap();
        assert_eq!(entry.ticket_number, "P001");
    }

    #[test]
    fn test_duplicate_active_tickets() {
        let now = current_timestamp();
        let make = |id: &str, ticket: &str, status: QueueStatus| QueueEntry {
            id: id.to_string(),
            patient_id: format!("patient-{}", id),
            service_point: ServicePoint::Cashier,
            ticket_number: ticket.to_string(),
            status,
            priority: Priority::Normal,
            estimated_wait_time: 0,
            arrival_time: now,
            start_time: None,
            end_time: None,
        };

        let entries = vec![
            make("1", "K001", QueueStatus::Waiting),
            make("2", "K001", QueueStatus::Called),
            make("3", "K001", QueueStatus::Serving),
            make("4", "K002", QueueStatus::Completed),
            make("5", "K002", QueueStatus::Waiting),
        ];

        assert_eq!(
            duplicate_active_tickets(&entries),
            vec![(ServicePoint::Cashier, "K001".to_string())]
        );
    }
}
