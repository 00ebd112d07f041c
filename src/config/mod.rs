//! Configuration management for the patient-queue service
//!
//! Configuration is loaded from a TOML file or from environment variables,
//! validated, and then overridden by command line flags in `main`.

pub mod app;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, QueueSettings, ServiceSettings};
