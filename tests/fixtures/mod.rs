//! Test fixtures and mock implementations for integration testing

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use mockall::mock;
use patient_queue::config::QueueSettings;
use patient_queue::error::{QueueError, Result};
use patient_queue::metrics::MetricsCollector;
use patient_queue::queue::{InMemoryQueueStore, QueueManager, QueueStore};
use patient_queue::types::{Priority, QueueEntry, QueueStatus, RegistrationRequest, ServicePoint};
use patient_queue::wait_time::{
    HistoricalWaitTimeEstimator, InMemoryStatisticsTracker, WaitTimeConfig,
};
use std::sync::Arc;

mock! {
    pub Store {}

    #[async_trait]
    impl QueueStore for Store {
        async fn snapshot(&self) -> Result<Vec<QueueEntry>>;
        async fn get(&self, entry_id: &str) -> Result<Option<QueueEntry>>;
        async fn register(
            &self,
            request: RegistrationRequest,
            estimated_wait_time: u32,
            at: DateTime<Utc>,
        ) -> Result<QueueEntry>;
        async fn update_status(
            &self,
            entry_id: &str,
            status: QueueStatus,
            at: DateTime<Utc>,
        ) -> Result<QueueEntry>;
    }
}

/// Mock store whose every operation reports the backend as unavailable
pub fn unavailable_store() -> MockStore {
    let mut store = MockStore::new();
    store.expect_snapshot().returning(|| Err(unavailable()));
    store.expect_get().returning(|_| Err(unavailable()));
    store.expect_register().returning(|_, _, _| Err(unavailable()));
    store
        .expect_update_status()
        .returning(|_, _, _| Err(unavailable()));
    store
}

fn unavailable() -> anyhow::Error {
    QueueError::StoreUnavailable {
        message: "queue backend unreachable".to_string(),
    }
    .into()
}

/// Fixed reference time so arrival offsets are deterministic
pub fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-03-01T08:00:00Z")
        .map(|t| t.with_timezone(&Utc))
        .unwrap()
}

/// Builder for queue entries with sensible defaults
#[derive(Debug, Clone)]
pub struct EntryBuilder {
    entry: QueueEntry,
}

impl EntryBuilder {
    pub fn new(ticket: &str) -> Self {
        Self {
            entry: QueueEntry {
                id: format!("id-{}", ticket),
                patient_id: format!("patient-{}", ticket),
                service_point: ServicePoint::Triage,
                ticket_number: ticket.to_string(),
                status: QueueStatus::Waiting,
                priority: Priority::Normal,
                estimated_wait_time: 0,
                arrival_time: base_time(),
                start_time: None,
                end_time: None,
            },
        }
    }

    pub fn at(mut self, service_point: ServicePoint) -> Self {
        self.entry.service_point = service_point;
        self
    }

    pub fn status(mut self, status: QueueStatus) -> Self {
        self.entry.status = status;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.entry.priority = priority;
        self
    }

    pub fn wait(mut self, minutes: u32) -> Self {
        self.entry.estimated_wait_time = minutes;
        self
    }

    pub fn patient(mut self, patient_id: &str) -> Self {
        self.entry.patient_id = patient_id.to_string();
        self
    }

    pub fn arrived_after(mut self, minutes: i64) -> Self {
        self.entry.arrival_time = base_time() + Duration::minutes(minutes);
        self
    }

    pub fn build(self) -> QueueEntry {
        self.entry
    }
}

pub fn registration(
    patient_id: &str,
    service_point: ServicePoint,
    priority: Priority,
) -> RegistrationRequest {
    RegistrationRequest {
        patient_id: patient_id.to_string(),
        service_point,
        priority,
        estimated_wait_time: None,
    }
}

pub fn registration_with_wait(
    patient_id: &str,
    service_point: ServicePoint,
    priority: Priority,
    minutes: u32,
) -> RegistrationRequest {
    RegistrationRequest {
        estimated_wait_time: Some(minutes),
        ..registration(patient_id, service_point, priority)
    }
}

/// Manager over any store, with fresh statistics and metrics
pub fn manager_over(store: Arc<dyn QueueStore>, settings: QueueSettings) -> QueueManager {
    let tracker = Arc::new(InMemoryStatisticsTracker::default());
    let estimator = Arc::new(
        HistoricalWaitTimeEstimator::new(WaitTimeConfig::default(), tracker.clone())
            .expect("default wait config is valid"),
    );
    let metrics = Arc::new(MetricsCollector::new().expect("metrics collector"));
    QueueManager::new(store, tracker, estimator, metrics, settings)
}

/// Manager over an empty in-memory store
pub fn create_test_manager() -> (QueueManager, Arc<InMemoryQueueStore>) {
    let store = Arc::new(InMemoryQueueStore::new());
    let manager = manager_over(store.clone(), QueueSettings::default());
    (manager, store)
}

/// Manager over a store holding `entries`
pub fn manager_with_entries(entries: Vec<QueueEntry>) -> QueueManager {
    manager_over(
        Arc::new(InMemoryQueueStore::with_entries(entries)),
        QueueSettings::default(),
    )
}
