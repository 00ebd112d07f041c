//! HTTP surface: queue boards, patient status, health and metrics

pub mod server;

pub use server::{create_router, BoardQuery, HttpServer, HttpServerConfig};
