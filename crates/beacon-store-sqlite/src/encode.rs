//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that lexicographic order in SQL equals
//! chronological order. UUIDs are stored as hyphenated lowercase strings.
//! Status enums are stored as their snake_case names.

use std::str::FromStr;

use beacon_core::{
  alert::{AlertStatus, SecurityAlert},
  audit::{Actor, AuditEvent, Outcome, Target},
  job::{Correlation, DeliveryJob, JobStatus},
};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Enums ───────────────────────────────────────────────────────────────────

fn decode_enum<T: FromStr>(kind: &'static str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::UnknownVariant { kind, value: s.to_owned() })
}

pub fn decode_job_status(s: &str) -> Result<JobStatus> { decode_enum("job status", s) }

pub fn decode_outcome(s: &str) -> Result<Outcome> { decode_enum("outcome", s) }

pub fn decode_alert_status(s: &str) -> Result<AlertStatus> {
  decode_enum("alert status", s)
}

fn decode_u32(field: &'static str, v: i64) -> Result<u32> {
  u32::try_from(v).map_err(|_| Error::OutOfRange(field))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawJob::from_row`].
pub const JOB_COLUMNS: &str = "job_id, recipient, subject, body, status, \
  attempts, last_attempt_at, error, created_at, sent_at, correlation_kind, \
  correlation_id";

/// Raw values read directly from a `delivery_jobs` row.
pub struct RawJob {
  pub job_id:           String,
  pub recipient:        String,
  pub subject:          String,
  pub body:             String,
  pub status:           String,
  pub attempts:         i64,
  pub last_attempt_at:  Option<String>,
  pub error:            Option<String>,
  pub created_at:       String,
  pub sent_at:          Option<String>,
  pub correlation_kind: Option<String>,
  pub correlation_id:   Option<String>,
}

impl RawJob {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      job_id:           row.get(0)?,
      recipient:        row.get(1)?,
      subject:          row.get(2)?,
      body:             row.get(3)?,
      status:           row.get(4)?,
      attempts:         row.get(5)?,
      last_attempt_at:  row.get(6)?,
      error:            row.get(7)?,
      created_at:       row.get(8)?,
      sent_at:          row.get(9)?,
      correlation_kind: row.get(10)?,
      correlation_id:   row.get(11)?,
    })
  }

  pub fn into_job(self) -> Result<DeliveryJob> {
    let correlation = match (self.correlation_kind, self.correlation_id) {
      (Some(kind), Some(id)) => Some(Correlation { kind, id }),
      _ => None,
    };

    Ok(DeliveryJob {
      job_id: decode_uuid(&self.job_id)?,
      recipient: self.recipient,
      subject: self.subject,
      body: self.body,
      status: decode_job_status(&self.status)?,
      attempts: decode_u32("attempts", self.attempts)?,
      last_attempt_at: decode_opt_dt(self.last_attempt_at)?,
      error: self.error,
      created_at: decode_dt(&self.created_at)?,
      sent_at: decode_opt_dt(self.sent_at)?,
      correlation,
    })
  }
}

/// Column list matching [`RawEvent::from_row`].
pub const EVENT_COLUMNS: &str = "event_id, event_type, outcome, actor_user_id, \
  actor_email, target_type, target_id, details, created_at";

/// Raw values read directly from an `audit_events` row.
pub struct RawEvent {
  pub event_id:      String,
  pub event_type:    String,
  pub outcome:       String,
  pub actor_user_id: Option<String>,
  pub actor_email:   Option<String>,
  pub target_type:   Option<String>,
  pub target_id:     Option<String>,
  pub details:       Option<String>,
  pub created_at:    String,
}

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:      row.get(0)?,
      event_type:    row.get(1)?,
      outcome:       row.get(2)?,
      actor_user_id: row.get(3)?,
      actor_email:   row.get(4)?,
      target_type:   row.get(5)?,
      target_id:     row.get(6)?,
      details:       row.get(7)?,
      created_at:    row.get(8)?,
    })
  }

  pub fn into_event(self) -> Result<AuditEvent> {
    let target = match (self.target_type, self.target_id) {
      (Some(kind), Some(id)) => Some(Target { kind, id }),
      _ => None,
    };

    Ok(AuditEvent {
      event_id: decode_uuid(&self.event_id)?,
      event_type: self.event_type,
      outcome: decode_outcome(&self.outcome)?,
      actor: Actor { user_id: self.actor_user_id, email: self.actor_email },
      target,
      details: self.details,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Column list matching [`RawAlert::from_row`].
pub const ALERT_COLUMNS: &str = "alert_id, actor_email, event_type, threshold, \
  count_in_window, window_start, window_end, status, created_at, resolved_at, \
  resolved_by, resolution_notes";

/// Raw values read directly from a `security_alerts` row.
pub struct RawAlert {
  pub alert_id:         String,
  pub actor_email:      String,
  pub event_type:       String,
  pub threshold:        i64,
  pub count_in_window:  i64,
  pub window_start:     String,
  pub window_end:       String,
  pub status:           String,
  pub created_at:       String,
  pub resolved_at:      Option<String>,
  pub resolved_by:      Option<String>,
  pub resolution_notes: Option<String>,
}

impl RawAlert {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      alert_id:         row.get(0)?,
      actor_email:      row.get(1)?,
      event_type:       row.get(2)?,
      threshold:        row.get(3)?,
      count_in_window:  row.get(4)?,
      window_start:     row.get(5)?,
      window_end:       row.get(6)?,
      status:           row.get(7)?,
      created_at:       row.get(8)?,
      resolved_at:      row.get(9)?,
      resolved_by:      row.get(10)?,
      resolution_notes: row.get(11)?,
    })
  }

  pub fn into_alert(self) -> Result<SecurityAlert> {
    Ok(SecurityAlert {
      alert_id: decode_uuid(&self.alert_id)?,
      actor_email: self.actor_email,
      event_type: self.event_type,
      threshold: decode_u32("threshold", self.threshold)?,
      count_in_window: decode_u32("count_in_window", self.count_in_window)?,
      window_start: decode_dt(&self.window_start)?,
      window_end: decode_dt(&self.window_end)?,
      status: decode_alert_status(&self.status)?,
      created_at: decode_dt(&self.created_at)?,
      resolved_at: decode_opt_dt(self.resolved_at)?,
      resolved_by: self.resolved_by,
      resolution_notes: self.resolution_notes,
    })
  }
}
