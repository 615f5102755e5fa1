//! Matchday Server - sync daemon and REST API for the sports catalog.
//!
//! This crate wires the sync engine to its production backends and exposes
//! an HTTP API on top:
//!
//! - **Status**: Inspect configured sources, their schedules and health
//! - **Trigger**: Force a sync cycle for one sport
//! - **Snapshots**: Browse recent raw upstream responses
//!
//! The binary also runs the background workers: the cron scheduler, the
//! reminder scanner, and the notification queue consumer.
//!
//! # API Documentation
//!
//! When running the server, interactive API documentation is available
//! at `/swagger-ui`.

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod router;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use router::create_router;
pub use state::{Adapter, AppState, Scheduler};
