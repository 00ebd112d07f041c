//! Queue manager
//!
//! The manager is the single entry point staff terminals and display boards
//! go through. Reads take one store snapshot and rank it; writes go through
//! the store's validated transitions and feed wait statistics and metrics.

use crate::config::QueueSettings;
use crate::error::{QueueError, Result};
use crate::metrics::MetricsCollector;
use crate::queue::ranker::{board_for_tag, QueueRanker};
use crate::queue::store::QueueStore;
use crate::types::{
    PatientQueueStatus, Priority, QueueBoard, QueueEntry, QueueStatus, RegistrationRequest,
    ServicePoint, TicketNumber,
};
use crate::utils::{current_timestamp, minutes_between};
use crate::wait_time::{StatisticsTracker, StatsKey, WaitTimeEstimator};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Counts across every service point, for health reporting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueManagerStats {
    pub total_entries: usize,
    pub active_entries: usize,
    pub waiting: usize,
    pub serving: usize,
}

pub struct QueueManager {
    store: Arc<dyn QueueStore>,
    stats_tracker: Arc<dyn StatisticsTracker>,
    estimator: Arc<dyn WaitTimeEstimator>,
    metrics_collector: Arc<MetricsCollector>,
    settings: QueueSettings,
}

impl QueueManager {
    pub fn new(
        store: Arc<dyn QueueStore>,
        stats_tracker: Arc<dyn StatisticsTracker>,
        estimator: Arc<dyn WaitTimeEstimator>,
        metrics_collector: Arc<MetricsCollector>,
        settings: QueueSettings,
    ) -> Self {
        Self {
            store,
            stats_tracker,
            estimator,
            metrics_collector,
            settings,
        }
    }

    pub fn settings(&self) -> &QueueSettings {
        &self.settings
    }

    pub fn metrics_collector(&self) -> Arc<MetricsCollector> {
        self.metrics_collector.clone()
    }

    fn record_failure(&self, operation: &str, err: &anyhow::Error) {
        if err
            .downcast_ref::<QueueError>()
            .map_or(true, QueueError::is_unavailable)
        {
            self.metrics_collector.record_store_error(operation);
        }
    }

    /// One consistent copy of every entry. A failed read is an error, never
    /// an empty list.
    pub async fn snapshot(&self) -> Result<Vec<QueueEntry>> {
        let timer = self.metrics_collector.start_timer();

        match self.store.snapshot().await {
            Ok(entries) => {
                self.metrics_collector.record_snapshot(timer.stop());
                Ok(entries)
            }
            Err(e) => {
                error!("Queue snapshot failed: {}", e);
                self.record_failure("snapshot", &e);
                Err(e)
            }
        }
    }

    /// Clamp a requested display count to the configured range
    pub fn next_count(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.settings.default_next_count)
            .min(self.settings.max_next_count)
    }

    // ----------------------------------------------------------------------
    // Read path
    // ----------------------------------------------------------------------

    pub async fn entries_for_service_point(
        &self,
        service_point: ServicePoint,
    ) -> Result<Vec<QueueEntry>> {
        let snapshot = self.snapshot().await?;
        Ok(QueueRanker::new(&snapshot)
            .entries_for_service_point(service_point)
            .cloned()
            .collect())
    }

    pub async fn currently_serving(&self, service_point: ServicePoint) -> Result<Vec<TicketNumber>> {
        let snapshot = self.snapshot().await?;
        Ok(QueueRanker::new(&snapshot).currently_serving(service_point))
    }

    pub async fn next_in_queue(
        &self,
        service_point: ServicePoint,
        count: Option<usize>,
    ) -> Result<Vec<TicketNumber>> {
        let snapshot = self.snapshot().await?;
        Ok(QueueRanker::new(&snapshot).next_in_queue(service_point, self.next_count(count)))
    }

    pub async fn average_wait_time(&self, service_point: ServicePoint) -> Result<u32> {
        let snapshot = self.snapshot().await?;
        Ok(QueueRanker::new(&snapshot).average_wait_time(service_point))
    }

    pub async fn total_waiting(&self, service_point: ServicePoint) -> Result<usize> {
        let snapshot = self.snapshot().await?;
        Ok(QueueRanker::new(&snapshot).total_waiting(service_point))
    }

    pub async fn board(
        &self,
        service_point: ServicePoint,
        count: Option<usize>,
    ) -> Result<QueueBoard> {
        self.metrics_collector
            .record_board_request(service_point.as_str());
        let snapshot = self.snapshot().await?;
        let board = QueueRanker::new(&snapshot).board(service_point, self.next_count(count));
        self.metrics_collector.update_from_board(service_point, &board);
        Ok(board)
    }

    /// Board for an unvalidated tag; unknown tags give an empty board
    pub async fn board_for_tag(&self, tag: &str, count: Option<usize>) -> Result<QueueBoard> {
        self.metrics_collector.record_board_request("other");
        let snapshot = self.snapshot().await?;
        Ok(board_for_tag(&snapshot, tag, self.next_count(count)))
    }

    /// One board per service point, all from the same snapshot
    pub async fn all_boards(&self, count: Option<usize>) -> Result<Vec<QueueBoard>> {
        let snapshot = self.snapshot().await?;
        let ranker = QueueRanker::new(&snapshot);
        let count = self.next_count(count);

        Ok(ServicePoint::ALL
            .iter()
            .map(|service_point| {
                let board = ranker.board(*service_point, count);
                self.metrics_collector.update_from_board(*service_point, &board);
                board
            })
            .collect())
    }

    pub async fn patient_status(&self, patient_id: &str) -> Result<Option<PatientQueueStatus>> {
        let snapshot = self.snapshot().await?;
        Ok(QueueRanker::new(&snapshot).patient_queue_status(patient_id))
    }

    pub async fn get_stats(&self) -> Result<QueueManagerStats> {
        let snapshot = self.snapshot().await?;
        Ok(QueueManagerStats {
            total_entries: snapshot.len(),
            active_entries: snapshot.iter().filter(|e| e.is_active()).count(),
            waiting: snapshot
                .iter()
                .filter(|e| e.status == QueueStatus::Waiting)
                .count(),
            serving: snapshot
                .iter()
                .filter(|e| e.status == QueueStatus::Serving)
                .count(),
        })
    }

    /// Recompute the waiting gauges for every service point
    pub async fn refresh_metrics(&self) -> Result<()> {
        self.all_boards(None).await?;
        Ok(())
    }

    /// Wait a new arrival would be quoted right now
    pub fn estimate_wait(&self, service_point: ServicePoint, priority: Priority) -> Result<u32> {
        self.estimator.estimate_wait(service_point, priority)
    }

    // ----------------------------------------------------------------------
    // Write path
    // ----------------------------------------------------------------------

    /// Put a patient into a queue
    pub async fn register(&self, request: RegistrationRequest) -> Result<QueueEntry> {
        let timer = self.metrics_collector.start_timer();
        let service_point = request.service_point;
        let priority = request.priority;

        let estimated_wait = match request.estimated_wait_time {
            Some(minutes) => minutes,
            None if self.settings.quote_missing_wait => {
                self.estimator.estimate_wait(service_point, priority)?
            }
            None => 0,
        };

        let entry = match self
            .store
            .register(request, estimated_wait, current_timestamp())
            .await
        {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Registration at {} failed: {}", service_point, e);
                self.record_failure("register", &e);
                return Err(e);
            }
        };

        self.metrics_collector
            .record_registration(service_point, priority);
        self.metrics_collector
            .record_operation("register", timer.stop());

        info!(
            "Patient '{}' registered at {} as {} ({} priority, quoted {} min)",
            entry.patient_id, service_point, entry.ticket_number, priority, estimated_wait
        );
        Ok(entry)
    }

    /// Call the top-ranked waiting patient at a service point.
    ///
    /// If another terminal claimed the same patient between our snapshot and
    /// our write, the transition is rejected and the next candidate is tried.
    pub async fn call_next(&self, service_point: ServicePoint) -> Result<Option<QueueEntry>> {
        let snapshot = self.snapshot().await?;
        let candidates: Vec<String> = QueueRanker::new(&snapshot)
            .ranked_waiting(service_point)
            .into_iter()
            .map(|entry| entry.id.clone())
            .collect();

        for entry_id in candidates {
            match self.advance(&entry_id, QueueStatus::Called, "call_next").await {
                Ok(entry) => return Ok(Some(entry)),
                Err(e)
                    if matches!(
                        e.downcast_ref::<QueueError>(),
                        Some(QueueError::InvalidTransition { .. })
                    ) =>
                {
                    debug!("Entry {} was claimed elsewhere, trying next", entry_id);
                }
                Err(e) => return Err(e),
            }
        }

        debug!("Nobody waiting at {}", service_point);
        Ok(None)
    }

    pub async fn start_serving(&self, entry_id: &str) -> Result<QueueEntry> {
        self.advance(entry_id, QueueStatus::Serving, "start_serving")
            .await
    }

    pub async fn complete(&self, entry_id: &str) -> Result<QueueEntry> {
        self.advance(entry_id, QueueStatus::Completed, "complete")
            .await
    }

    pub async fn mark_no_show(&self, entry_id: &str) -> Result<QueueEntry> {
        self.advance(entry_id, QueueStatus::NoShow, "no_show").await
    }

    pub async fn cancel(&self, entry_id: &str) -> Result<QueueEntry> {
        self.advance(entry_id, QueueStatus::Cancelled, "cancel")
            .await
    }

    async fn advance(
        &self,
        entry_id: &str,
        status: QueueStatus,
        operation: &str,
    ) -> Result<QueueEntry> {
        let timer = self.metrics_collector.start_timer();

        let entry = match self
            .store
            .update_status(entry_id, status, current_timestamp())
            .await
        {
            Ok(entry) => entry,
            Err(e) => {
                self.record_failure(operation, &e);
                return Err(e);
            }
        };

        self.metrics_collector
            .record_transition(entry.service_point, status);
        self.metrics_collector
            .record_operation(operation, timer.stop());

        if let Some(started) = entry.start_time.filter(|_| status == QueueStatus::Serving) {
            let waited = minutes_between(entry.arrival_time, started);
            self.metrics_collector
                .record_observed_wait(entry.service_point, entry.priority, waited);

            // Statistics only feed future quotes; losing one sample is not
            // worth failing the transition that already happened
            if let Err(e) = self
                .stats_tracker
                .record_wait(StatsKey::new(entry.service_point, entry.priority), waited)
            {
                warn!("Failed to record observed wait for {}: {}", entry.id, e);
            }
        }

        info!(
            "Ticket {} at {} is now {}",
            entry.ticket_number, entry.service_point, status
        );
        Ok(entry)
    }
}
