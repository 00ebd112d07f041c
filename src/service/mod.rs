//! Service layer for the patient-queue service
//!
//! Application state, background refresh and health reporting.

pub mod app;
pub mod health;

pub use app::{refresh_once, AppState, ServiceContext, ServiceError};
pub use health::{ComponentCheck, HealthCheck, HealthStatus, ServiceStats};
