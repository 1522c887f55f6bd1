//! Delivery jobs — one queued outbound notification and its delivery state.
//!
//! A job moves through a small state machine driven by the delivery engine:
//!
//! ```text
//! pending ──claim──▶ sending ──ok──▶ sent
//!    ▲                  │
//!    │                  └──err──▶ failed ──claim (attempts < max)──▶ sending
//!    └──────── operator reset ───────┘
//! ```
//!
//! Jobs are never deleted by the engine; `sent` is terminal and a `failed` job
//! whose attempts reached the cap is inert until an operator resets it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

// ─── Status ──────────────────────────────────────────────────────────────────

/// Delivery state of a [`DeliveryJob`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
  Pending,
  Sending,
  Sent,
  Failed,
}

// ─── Correlation ─────────────────────────────────────────────────────────────

/// Advisory pointer at the business event that triggered a send, e.g.
/// `{kind: "invite", id: "<share id>"}`. Never enforced as a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correlation {
  pub kind: String,
  pub id:   String,
}

// ─── Job ─────────────────────────────────────────────────────────────────────

/// A persisted delivery job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryJob {
  pub job_id:          Uuid,
  pub recipient:       String,
  pub subject:         String,
  /// Pre-rendered HTML body.
  pub body:            String,
  pub status:          JobStatus,
  pub attempts:        u32,
  pub last_attempt_at: Option<DateTime<Utc>>,
  pub error:           Option<String>,
  pub created_at:      DateTime<Utc>,
  pub sent_at:         Option<DateTime<Utc>>,
  pub correlation:     Option<Correlation>,
}

impl DeliveryJob {
  /// A failed job whose attempts reached `max_attempts`. Exhausted jobs are
  /// never picked up by the worker again.
  pub fn is_exhausted(&self, max_attempts: u32) -> bool {
    self.status == JobStatus::Failed && self.attempts >= max_attempts
  }

  /// A failed job that the worker may still pick up.
  pub fn is_retriable(&self, max_attempts: u32) -> bool {
    self.status == JobStatus::Failed && self.attempts < max_attempts
  }
}

// ─── NewJob ──────────────────────────────────────────────────────────────────

/// Caller input to the delivery engine's `enqueue`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
  pub recipient:   String,
  pub subject:     String,
  pub body:        String,
  #[serde(default)]
  pub correlation: Option<Correlation>,
}

impl NewJob {
  pub fn new(
    recipient: impl Into<String>,
    subject: impl Into<String>,
    body: impl Into<String>,
  ) -> Self {
    Self {
      recipient:   recipient.into(),
      subject:     subject.into(),
      body:        body.into(),
      correlation: None,
    }
  }

  pub fn with_correlation(
    mut self,
    kind: impl Into<String>,
    id: impl Into<String>,
  ) -> Self {
    self.correlation = Some(Correlation { kind: kind.into(), id: id.into() });
    self
  }
}

/// Input to [`crate::store::JobStore::insert_job`]. The engine stamps
/// `created_at`; the store assigns the id and the initial `pending` state.
#[derive(Debug, Clone)]
pub struct JobDraft {
  pub job:        NewJob,
  pub created_at: DateTime<Utc>,
}

// ─── Admin projections ───────────────────────────────────────────────────────

/// Per-status job counts for the operator dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
  pub pending:   u64,
  pub sending:   u64,
  pub sent:      u64,
  /// Failed jobs that the worker will still retry.
  pub retriable: u64,
  /// Failed jobs that reached the attempt cap.
  pub exhausted: u64,
}

/// A failed job as listed for operator triage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedJob {
  pub job_id:     Uuid,
  pub recipient:  String,
  pub subject:    String,
  pub error:      Option<String>,
  pub attempts:   u32,
  pub created_at: DateTime<Utc>,
  pub exhausted:  bool,
}

impl FailedJob {
  pub fn from_job(job: DeliveryJob, max_attempts: u32) -> Self {
    let exhausted = job.is_exhausted(max_attempts);
    Self {
      job_id: job.job_id,
      recipient: job.recipient,
      subject: job.subject,
      error: job.error,
      attempts: job.attempts,
      created_at: job.created_at,
      exhausted,
    }
  }
}
