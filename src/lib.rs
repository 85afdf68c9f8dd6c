//! Library entry point for the marquee movie catalog backend.
//!
//! Exports all core modules for use in integration tests and by the main binary.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod query;
pub mod repository;
pub mod telemetry;

pub use config::Settings;
pub use db::MIGRATOR;
pub use errors::ApiError;
pub use middleware::RequestLoggingMiddleware;
pub use models::{AppState, Movie, slugify};
pub use telemetry::{get_subscriber, init_subscriber};
