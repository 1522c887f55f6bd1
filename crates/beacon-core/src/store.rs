//! The `JobStore` and `AuditStore` traits.
//!
//! The traits are implemented by storage backends (e.g.
//! `beacon-store-sqlite`). The delivery and alerting engines depend on these
//! abstractions, not on any concrete backend.
//!
//! Every mutation is a single-record patch keyed by id, except the two
//! administrative bulk resets on [`JobStore`]. State transitions that must not
//! race (claiming a job, resolving an alert, inserting an alert) are expressed
//! as conditional writes that report whether they applied.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  alert::{AlertDraft, AlertResolution, AlertStatus, SecurityAlert},
  audit::{AuditEvent, AuditQuery, EventDraft, Outcome},
  job::{DeliveryJob, JobDraft, JobStatus},
};

// ─── Jobs ────────────────────────────────────────────────────────────────────

/// Durable storage for delivery jobs.
///
/// "Oldest" always means ordered by `created_at`, then by insertion order.
pub trait JobStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new job in `pending` with zero attempts.
  fn insert_job(
    &self,
    draft: JobDraft,
  ) -> impl Future<Output = Result<DeliveryJob, Self::Error>> + Send + '_;

  /// Retrieve a job by id. Returns `None` if not found.
  fn get_job(
    &self,
    job_id: Uuid,
  ) -> impl Future<Output = Result<Option<DeliveryJob>, Self::Error>> + Send + '_;

  /// The oldest `pending` job (index: `status, created_at`).
  fn oldest_pending(
    &self,
  ) -> impl Future<Output = Result<Option<DeliveryJob>, Self::Error>> + Send + '_;

  /// The oldest `failed` job with `attempts < max_attempts`.
  fn oldest_retriable(
    &self,
    max_attempts: u32,
  ) -> impl Future<Output = Result<Option<DeliveryJob>, Self::Error>> + Send + '_;

  /// Move a `pending` or `failed` job to `sending` and set
  /// `last_attempt_at`. Returns the claimed job, or `None` if the job was no
  /// longer claimable.
  fn claim(
    &self,
    job_id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<DeliveryJob>, Self::Error>> + Send + '_;

  /// `sending → sent`: set `sent_at`, clear `error`. Returns `false` if the
  /// job was not `sending`.
  fn mark_sent(
    &self,
    job_id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// `sending → failed`: increment `attempts`, record `error`. Returns the
  /// updated job, or `None` if the job was not `sending`.
  fn mark_failed(
    &self,
    job_id: Uuid,
    error: String,
  ) -> impl Future<Output = Result<Option<DeliveryJob>, Self::Error>> + Send + '_;

  /// All jobs with `status`, oldest first.
  fn list_jobs(
    &self,
    status: JobStatus,
  ) -> impl Future<Output = Result<Vec<DeliveryJob>, Self::Error>> + Send + '_;

  fn count_jobs(
    &self,
    status: JobStatus,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Count `failed` jobs split by the attempt cap: `(retriable, exhausted)`.
  fn count_failed(
    &self,
    max_attempts: u32,
  ) -> impl Future<Output = Result<(u64, u64), Self::Error>> + Send + '_;

  /// Operator reset: every `failed` job back to `pending` with attempts and
  /// error cleared. Returns the number of jobs reset.
  fn reset_failed(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Fail every job stuck in `sending` (e.g. after a crash), incrementing
  /// attempts. Returns the number of jobs affected.
  fn fail_stalled(
    &self,
    error: String,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Administrative hard delete. Returns `false` if no such job existed.
  fn delete_job(
    &self,
    job_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Audit and alerts ────────────────────────────────────────────────────────

/// Durable storage for the audit trail and the alerts derived from it.
///
/// Audit events are append-only: no method updates or deletes one.
pub trait AuditStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Audit events ──────────────────────────────────────────────────────

  fn append_event(
    &self,
    draft: EventDraft,
  ) -> impl Future<Output = Result<AuditEvent, Self::Error>> + Send + '_;

  /// Events by one normalized actor email with `created_at` in
  /// `[since, until]` (index: `actor_email, created_at`).
  fn actor_events_between<'a>(
    &'a self,
    actor_email: &'a str,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<AuditEvent>, Self::Error>> + Send + 'a;

  /// Events with `outcome` and `created_at >= since` (index:
  /// `outcome, created_at`).
  fn outcome_events_since(
    &self,
    outcome: Outcome,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<AuditEvent>, Self::Error>> + Send + '_;

  /// Events matching `query`, newest first.
  fn list_events<'a>(
    &'a self,
    query: &'a AuditQuery,
  ) -> impl Future<Output = Result<Vec<AuditEvent>, Self::Error>> + Send + 'a;

  // ── Alerts ────────────────────────────────────────────────────────────

  /// The open alert for `(actor_email, event_type)`, if any (index:
  /// `actor_email, status`).
  fn find_open_alert<'a>(
    &'a self,
    actor_email: &'a str,
    event_type: &'a str,
  ) -> impl Future<Output = Result<Option<SecurityAlert>, Self::Error>> + Send + 'a;

  /// Insert an open alert unless one is already open for the same
  /// `(actor_email, event_type)`; the check and insert are atomic. Returns
  /// `None` if an open alert already existed.
  fn insert_alert_unless_open(
    &self,
    draft: AlertDraft,
  ) -> impl Future<Output = Result<Option<SecurityAlert>, Self::Error>> + Send + '_;

  fn get_alert(
    &self,
    alert_id: Uuid,
  ) -> impl Future<Output = Result<Option<SecurityAlert>, Self::Error>> + Send + '_;

  /// `open → resolved`. Returns the updated alert, or `None` if the alert was
  /// not open.
  fn resolve_alert(
    &self,
    alert_id: Uuid,
    resolution: AlertResolution,
  ) -> impl Future<Output = Result<Option<SecurityAlert>, Self::Error>> + Send + '_;

  /// Alerts with `status`, newest first.
  fn list_alerts(
    &self,
    status: AlertStatus,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<SecurityAlert>, Self::Error>> + Send + '_;

  fn count_alerts(
    &self,
    status: AlertStatus,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
