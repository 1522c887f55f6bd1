//! SQLite backend for Beacon's delivery jobs, audit events and alerts.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every call is executed in order on that
//! one connection, which is what makes the conditional writes (job claims,
//! alert inserts, alert resolution) atomic.

mod audit;
mod encode;
mod jobs;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
