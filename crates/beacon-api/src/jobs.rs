//! Handlers for the delivery queue.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/jobs` | Body: `{"recipient","subject","body","correlation"?}`; 201 `{job_id}` |
//! | `GET`    | `/jobs/:id` | 404 if not found |
//! | `DELETE` | `/jobs/:id` | 204; 404 if not found |
//! | `GET`    | `/queue/status` | |
//! | `GET`    | `/queue/failed` | |
//! | `POST`   | `/queue/retry-failed` | `{retried_count}` |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use beacon_core::{
  job::{DeliveryJob, FailedJob, NewJob, QueueStatus},
  store::{AuditStore, JobStore},
  transport::Transport,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Serialize)]
pub struct Enqueued {
  pub job_id: Uuid,
}

/// `POST /jobs`
pub async fn enqueue<S, T>(
  State(state): State<ApiState<S, T>>,
  Json(job): Json<NewJob>,
) -> Result<impl IntoResponse, ApiError>
where
  S: JobStore + AuditStore,
  T: Transport,
{
  let job_id = state.queue.enqueue(job).await?;
  Ok((StatusCode::CREATED, Json(Enqueued { job_id })))
}

/// `GET /jobs/:id`
pub async fn get_one<S, T>(
  State(state): State<ApiState<S, T>>,
  Path(id): Path<Uuid>,
) -> Result<Json<DeliveryJob>, ApiError>
where
  S: JobStore + AuditStore,
  T: Transport,
{
  Ok(Json(state.queue.get_job(id).await?))
}

/// `DELETE /jobs/:id`
pub async fn delete_one<S, T>(
  State(state): State<ApiState<S, T>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: JobStore + AuditStore,
  T: Transport,
{
  state.queue.delete_job(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /queue/status`
pub async fn status<S, T>(
  State(state): State<ApiState<S, T>>,
) -> Result<Json<QueueStatus>, ApiError>
where
  S: JobStore + AuditStore,
  T: Transport,
{
  Ok(Json(state.queue.status().await?))
}

/// `GET /queue/failed`
pub async fn failed<S, T>(
  State(state): State<ApiState<S, T>>,
) -> Result<Json<Vec<FailedJob>>, ApiError>
where
  S: JobStore + AuditStore,
  T: Transport,
{
  Ok(Json(state.queue.failed_jobs().await?))
}

#[derive(Debug, Serialize)]
pub struct Retried {
  pub retried_count: u64,
}

/// `POST /queue/retry-failed`
pub async fn retry_failed<S, T>(
  State(state): State<ApiState<S, T>>,
) -> Result<Json<Retried>, ApiError>
where
  S: JobStore + AuditStore,
  T: Transport,
{
  let retried_count = state.queue.retry_failed().await?;
  Ok(Json(Retried { retried_count }))
}
