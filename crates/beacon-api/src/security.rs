//! Handlers for the operator security dashboard.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/security/overview` | |
//! | `GET`  | `/security/alerts` | Optional `?status=open\|resolved&limit=` |
//! | `POST` | `/security/alerts/:id/resolve` | Operator only. Optional body: `{"notes"?}` |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use beacon_core::{
  alert::{AlertStatus, SecurityAlert, SecurityOverview},
  store::{AuditStore, JobStore},
  transport::Transport,
};
use beacon_engine::Resolution;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, Operator, error::ApiError};

/// `GET /security/overview`
pub async fn overview<S, T>(
  State(state): State<ApiState<S, T>>,
) -> Result<Json<SecurityOverview>, ApiError>
where
  S: JobStore + AuditStore,
  T: Transport,
{
  Ok(Json(state.alerts.security_overview().await?))
}

#[derive(Debug, Deserialize)]
pub struct AlertParams {
  pub status: Option<AlertStatus>,
  pub limit:  Option<usize>,
}

/// `GET /security/alerts[?status=<status>&limit=<n>]`
pub async fn alerts<S, T>(
  State(state): State<ApiState<S, T>>,
  Query(params): Query<AlertParams>,
) -> Result<Json<Vec<SecurityAlert>>, ApiError>
where
  S: JobStore + AuditStore,
  T: Transport,
{
  Ok(Json(state.alerts.list_alerts(params.status, params.limit).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct ResolveBody {
  #[serde(default)]
  pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Resolved {
  Already { already_resolved: bool },
  Now { resolved: bool, alert: SecurityAlert },
}

/// `POST /security/alerts/:id/resolve`
pub async fn resolve<S, T>(
  State(state): State<ApiState<S, T>>,
  operator: Operator,
  Path(id): Path<Uuid>,
  body: Option<Json<ResolveBody>>,
) -> Result<Json<Resolved>, ApiError>
where
  S: JobStore + AuditStore,
  T: Transport,
{
  let body = body.map(|Json(body)| body).unwrap_or_default();
  let resolution = state.alerts.resolve(id, operator.actor(), body.notes).await?;
  Ok(Json(match resolution {
    Resolution::AlreadyResolved => Resolved::Already { already_resolved: true },
    Resolution::Resolved(alert) => Resolved::Now { resolved: true, alert },
  }))
}
