//! Utility functions for the patient queue service

use crate::types::ServicePoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

/// Generate a new unique entry ID
pub fn generate_entry_id() -> String {
    Uuid::new_v4().to_string()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Ticket label such as `T001` for the given per-service-point sequence
pub fn format_ticket_number(service_point: ServicePoint, sequence: u64) -> String {
    format!("{}{:03}", service_point.ticket_prefix(), sequence)
}

/// Sequence number of a ticket issued by [`format_ticket_number`]
///
/// Digit runs too long for a `u64` saturate to `u64::MAX` so they still
/// count as issued.
pub fn parse_ticket_sequence(service_point: ServicePoint, ticket: &str) -> Option<u64> {
    let digits = ticket.strip_prefix(service_point.ticket_prefix())?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(digits.parse().unwrap_or(u64::MAX))
}

/// Integer mean rounded half-up; 0 for an empty set
pub fn rounded_mean(sum: u64, count: u64) -> u32 {
    if count == 0 {
        return 0;
    }
    let rounded = (2 * sum + count) / (2 * count);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

/// Whole minutes between two timestamps, never negative
pub fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> u32 {
    let minutes = to.signed_duration_since(from).num_minutes().max(0);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}

/// Serde helper: a missing or null wait reads as 0
pub fn wait_minutes_or_zero<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(0))
}
