//! Infrastructure layer: storage adapters, request tracking, configuration.

pub mod config;
pub mod request_tracker;
pub mod store;

pub use config::AppConfig;
pub use request_tracker::{RepeatRequestTracker, RequestKey, RequestObservation};
pub use store::{InMemoryAuthStore, PostgresAuthStore};
