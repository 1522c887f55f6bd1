//! Beacon server: configuration, operator auth and router composition.
//!
//! The binary in `main.rs` wires a [`SqliteStore`](beacon_store_sqlite::SqliteStore),
//! the Resend transport, the delivery worker and this router together.

pub mod auth;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{Router, middleware};
use beacon_api::{ApiState, api_router};
use beacon_core::{
  policy::{AlertPolicy, QueuePolicy},
  store::{AuditStore, JobStore},
  transport::Transport,
};
use beacon_mailer::MailerConfig;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, require_operator};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `BEACON_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  pub auth_username:      String,
  pub auth_password_hash: String,
  pub mailer:             MailerConfig,
  #[serde(default)]
  pub queue:              QueueSettings,
  #[serde(default)]
  pub alerts:             AlertSettings,
}

/// `[queue]` table. Durations are in milliseconds.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct QueueSettings {
  pub max_attempts:       u32,
  pub normal_interval_ms: u64,
  pub failure_backoff_ms: u64,
  pub enqueue_delay_ms:   u64,
  pub send_timeout_ms:    u64,
}

impl Default for QueueSettings {
  fn default() -> Self {
    let p = QueuePolicy::default();
    Self {
      max_attempts:       p.max_attempts,
      normal_interval_ms: p.normal_interval.as_millis() as u64,
      failure_backoff_ms: p.failure_backoff.as_millis() as u64,
      enqueue_delay_ms:   p.enqueue_delay.as_millis() as u64,
      send_timeout_ms:    p.send_timeout.as_millis() as u64,
    }
  }
}

impl QueueSettings {
  pub fn policy(&self) -> beacon_core::Result<QueuePolicy> {
    QueuePolicy {
      max_attempts:    self.max_attempts,
      normal_interval: Duration::from_millis(self.normal_interval_ms),
      failure_backoff: Duration::from_millis(self.failure_backoff_ms),
      enqueue_delay:   Duration::from_millis(self.enqueue_delay_ms),
      send_timeout:    Duration::from_millis(self.send_timeout_ms),
    }
    .validate()
  }
}

/// `[alerts]` table.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct AlertSettings {
  pub threshold:   u32,
  pub window_secs: u64,
}

impl Default for AlertSettings {
  fn default() -> Self {
    let p = AlertPolicy::default();
    Self { threshold: p.threshold, window_secs: p.window.as_secs() }
  }
}

impl AlertSettings {
  pub fn policy(&self) -> beacon_core::Result<AlertPolicy> {
    AlertPolicy {
      threshold: self.threshold,
      window:    Duration::from_secs(self.window_secs),
    }
    .validate()
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API behind Basic auth, with request tracing.
pub fn router<S, T>(api: ApiState<S, T>, auth: Arc<AuthConfig>) -> Router
where
  S: JobStore + AuditStore + 'static,
  T: Transport + 'static,
{
  api_router(api)
    .layer(middleware::from_fn_with_state(auth, require_operator))
    .layer(TraceLayer::new_for_http())
}
