//! JSON REST API for Beacon.
//!
//! Exposes an axum [`Router`] over a [`DeliveryQueue`] and an
//! [`AlertEngine`] sharing one store. Authentication is the caller's
//! responsibility; operator-only routes read the [`Operator`] request
//! extension the caller's auth layer inserts.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", beacon_api::api_router(ApiState { queue, alerts }))
//! ```

pub mod audit;
pub mod error;
pub mod jobs;
pub mod operator;
pub mod security;

use axum::{
  Router,
  routing::{get, post},
};
use beacon_core::{
  store::{AuditStore, JobStore},
  transport::Transport,
};
use beacon_engine::{AlertEngine, DeliveryQueue};

pub use error::ApiError;
pub use operator::Operator;

/// Shared state threaded through all handlers.
pub struct ApiState<S, T> {
  pub queue:  DeliveryQueue<S, T>,
  pub alerts: AlertEngine<S>,
}

impl<S, T> Clone for ApiState<S, T> {
  fn clone(&self) -> Self {
    Self { queue: self.queue.clone(), alerts: self.alerts.clone() }
  }
}

/// Build a fully-materialised API router for `state`.
pub fn api_router<S, T>(state: ApiState<S, T>) -> Router<()>
where
  S: JobStore + AuditStore + 'static,
  T: Transport + 'static,
{
  Router::new()
    // Delivery queue
    .route("/jobs", post(jobs::enqueue::<S, T>))
    .route("/jobs/{id}", get(jobs::get_one::<S, T>).delete(jobs::delete_one::<S, T>))
    .route("/queue/status", get(jobs::status::<S, T>))
    .route("/queue/failed", get(jobs::failed::<S, T>))
    .route("/queue/retry-failed", post(jobs::retry_failed::<S, T>))
    // Audit trail
    .route("/audit/events", get(audit::list::<S, T>).post(audit::record::<S, T>))
    .route("/audit/denied", post(audit::denied::<S, T>))
    // Security dashboard
    .route("/security/overview", get(security::overview::<S, T>))
    .route("/security/alerts", get(security::alerts::<S, T>))
    .route("/security/alerts/{id}/resolve", post(security::resolve::<S, T>))
    .with_state(state)
}
