//! Handlers for the audit trail.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/audit/events` | Body: an audit entry; 201 with the stored event |
//! | `POST` | `/audit/denied` | Body: a denied attempt; reports whether it alerted |
//! | `GET`  | `/audit/events` | Optional `?outcome=&event_type=&limit=` |

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use beacon_core::{
  alert::SecurityAlert,
  audit::{AuditEntry, AuditEvent, AuditQuery, DeniedAttempt},
  store::{AuditStore, JobStore},
  transport::Transport,
};
use beacon_engine::Denial;
use serde::Serialize;

use crate::{ApiState, error::ApiError};

/// `POST /audit/events`
pub async fn record<S, T>(
  State(state): State<ApiState<S, T>>,
  Json(entry): Json<AuditEntry>,
) -> Result<impl IntoResponse, ApiError>
where
  S: JobStore + AuditStore,
  T: Transport,
{
  if entry.event_type.trim().is_empty() {
    return Err(ApiError::BadRequest("event_type must not be empty".into()));
  }
  let event = state.alerts.audit().record(entry).await?;
  Ok((StatusCode::CREATED, Json(event)))
}

/// JSON form of [`Denial`].
#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DenialBody {
  Anonymous,
  BelowThreshold { count: u32 },
  AlreadyOpen { count: u32 },
  AlertRaised { alert: SecurityAlert },
}

impl From<Denial> for DenialBody {
  fn from(d: Denial) -> Self {
    match d {
      Denial::Anonymous => Self::Anonymous,
      Denial::BelowThreshold { count } => Self::BelowThreshold { count },
      Denial::AlreadyOpen { count } => Self::AlreadyOpen { count },
      Denial::Raised(alert) => Self::AlertRaised { alert },
    }
  }
}

/// `POST /audit/denied`
pub async fn denied<S, T>(
  State(state): State<ApiState<S, T>>,
  Json(attempt): Json<DeniedAttempt>,
) -> Result<Json<DenialBody>, ApiError>
where
  S: JobStore + AuditStore,
  T: Transport,
{
  if attempt.event_type.trim().is_empty() {
    return Err(ApiError::BadRequest("event_type must not be empty".into()));
  }
  let denial = state.alerts.record_denied(attempt).await?;
  Ok(Json(denial.into()))
}

/// `GET /audit/events`
pub async fn list<S, T>(
  State(state): State<ApiState<S, T>>,
  Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEvent>>, ApiError>
where
  S: JobStore + AuditStore,
  T: Transport,
{
  Ok(Json(state.alerts.audit().list(&query).await?))
}
