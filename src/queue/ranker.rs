//! Priority ordering and wait aggregation for queue displays
//!
//! Every function here is a read-only computation over a slice of entries
//! the caller already holds. Callers that read from a shared store must take
//! one snapshot and rank that, never a live collection.

use crate::types::{
    PatientQueueStatus, QueueBoard, QueueEntry, QueueStatus, ServicePoint, TicketNumber,
};
use crate::utils::{current_timestamp, rounded_mean};
use std::str::FromStr;

/// How many upcoming tickets a display shows by default
pub const DEFAULT_NEXT_COUNT: usize = 3;

/// Read-only view answering the display questions for a set of entries
#[derive(Debug, Clone, Copy)]
pub struct QueueRanker<'a> {
    entries: &'a [QueueEntry],
}

impl<'a> QueueRanker<'a> {
    pub fn new(entries: &'a [QueueEntry]) -> Self {
        Self { entries }
    }

    /// All entries at the service point, in store order, any status
    pub fn entries_for_service_point(
        &self,
        service_point: ServicePoint,
    ) -> impl Iterator<Item = &'a QueueEntry> + 'a {
        self.entries
            .iter()
            .filter(move |entry| entry.service_point == service_point)
    }

    fn with_status(
        &self,
        service_point: ServicePoint,
        status: QueueStatus,
    ) -> impl Iterator<Item = &'a QueueEntry> + 'a {
        self.entries_for_service_point(service_point)
            .filter(move |entry| entry.status == status)
    }

    /// Tickets currently being served, in store order
    pub fn currently_serving(&self, service_point: ServicePoint) -> Vec<TicketNumber> {
        self.with_status(service_point, QueueStatus::Serving)
            .map(|entry| entry.ticket_number.clone())
            .collect()
    }

    /// Waiting entries in serving order: priority rank, then quoted wait.
    ///
    /// `sort_by_key` is stable, so entries equal on both keys keep their
    /// store (arrival) order.
    pub fn ranked_waiting(&self, service_point: ServicePoint) -> Vec<&'a QueueEntry> {
        let mut waiting: Vec<&QueueEntry> = self
            .with_status(service_point, QueueStatus::Waiting)
            .collect();
        waiting.sort_by_key(|entry| (entry.priority.rank(), entry.estimated_wait_time));
        waiting
    }

    /// The first `count` tickets in serving order
    pub fn next_in_queue(&self, service_point: ServicePoint, count: usize) -> Vec<TicketNumber> {
        self.ranked_waiting(service_point)
            .into_iter()
            .take(count)
            .map(|entry| entry.ticket_number.clone())
            .collect()
    }

    /// Mean quoted wait of waiting entries, rounded half-up; 0 when empty
    pub fn average_wait_time(&self, service_point: ServicePoint) -> u32 {
        let (sum, count) = self
            .with_status(service_point, QueueStatus::Waiting)
            .fold((0u64, 0u64), |(sum, count), entry| {
                (sum + u64::from(entry.estimated_wait_time), count + 1)
            });
        rounded_mean(sum, count)
    }

    pub fn total_waiting(&self, service_point: ServicePoint) -> usize {
        self.with_status(service_point, QueueStatus::Waiting).count()
    }

    /// Everything a display needs for one service point
    pub fn board(&self, service_point: ServicePoint, count: usize) -> QueueBoard {
        QueueBoard {
            service_point: service_point.to_string(),
            currently_serving: self.currently_serving(service_point),
            next_in_queue: self.next_in_queue(service_point, count),
            total_waiting: self.total_waiting(service_point),
            average_wait_time: self.average_wait_time(service_point),
            generated_at: current_timestamp(),
        }
    }

    /// 1-based place of a waiting entry in its service point's order
    pub fn position_in_queue(&self, entry_id: &str) -> Option<usize> {
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.id == entry_id && entry.status == QueueStatus::Waiting)?;

        self.ranked_waiting(entry.service_point)
            .iter()
            .position(|ranked| ranked.id == entry_id)
            .map(|index| index + 1)
    }

    /// Where a patient is right now.
    ///
    /// The latest-arrived active entry (waiting, called or serving) wins; a
    /// patient with no active entry gets their latest-arrived entry. `None`
    /// when the patient has no entries at all.
    pub fn patient_queue_status(&self, patient_id: &str) -> Option<PatientQueueStatus> {
        let entries: Vec<&QueueEntry> = self
            .entries
            .iter()
            .filter(|entry| entry.patient_id == patient_id)
            .collect();

        let chosen = entries
            .iter()
            .filter(|entry| entry.is_active())
            .max_by_key(|entry| entry.arrival_time)
            .or_else(|| entries.iter().max_by_key(|entry| entry.arrival_time))?;

        Some(PatientQueueStatus {
            entry: (*chosen).clone(),
            position: self.position_in_queue(&chosen.id),
            entry_count: entries.len(),
        })
    }
}

/// Board for a service point given as a raw tag.
///
/// An unknown tag has no entries, so it yields an empty board labelled with
/// the tag rather than an error.
pub fn board_for_tag(entries: &[QueueEntry], tag: &str, count: usize) -> QueueBoard {
    match ServicePoint::from_str(tag) {
        Ok(service_point) => QueueRanker::new(entries).board(service_point, count),
        Err(_) => QueueBoard {
            service_point: tag.to_string(),
            currently_serving: Vec::new(),
            next_in_queue: Vec::new(),
            total_waiting: 0,
            average_wait_time: 0,
            generated_at: current_timestamp(),
        },
    }
}
