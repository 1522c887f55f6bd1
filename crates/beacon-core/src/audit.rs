//! Audit events — the append-only trail of security-relevant decisions.
//!
//! Every access-control decision point in the surrounding application writes
//! one event alongside its own state change. Events are never updated or
//! deleted once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Event type recorded when an operator resolves a security alert.
pub const ALERT_RESOLVED_EVENT: &str = "security.alert_resolved";

/// Target type used for events that reference a security alert.
pub const SECURITY_ALERT_TARGET: &str = "security_alert";

// ─── Outcome ─────────────────────────────────────────────────────────────────

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
pub enum Outcome {
  Success,
  Denied,
  Error,
}

// ─── Actor / target ──────────────────────────────────────────────────────────

/// Who performed the audited action. Both parts are optional; anonymous
/// requests carry neither.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  #[serde(default)]
  pub user_id: Option<String>,
  #[serde(default)]
  pub email:   Option<String>,
}

impl Actor {
  pub fn anonymous() -> Self { Self::default() }

  pub fn with_email(email: impl Into<String>) -> Self {
    Self { user_id: None, email: Some(email.into()) }
  }

  pub fn user(user_id: impl Into<String>, email: impl Into<String>) -> Self {
    Self { user_id: Some(user_id.into()), email: Some(email.into()) }
  }

  /// The normalized email this actor is keyed on for alerting, if any.
  pub fn identity(&self) -> Option<String> {
    normalize_email(self.email.as_deref())
  }

  /// A copy with the email normalized, as it is stored.
  pub fn normalized(&self) -> Self {
    Self { user_id: self.user_id.clone(), email: self.identity() }
  }
}

/// Trim and lowercase an email; blank input yields `None`.
pub fn normalize_email(value: Option<&str>) -> Option<String> {
  let trimmed = value?.trim().to_lowercase();
  (!trimmed.is_empty()).then_some(trimmed)
}

/// The resource an audited action was aimed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
  pub kind: String,
  pub id:   String,
}

impl Target {
  pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
    Self { kind: kind.into(), id: id.into() }
  }
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// A persisted audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
  pub event_id:   Uuid,
  pub event_type: String,
  pub outcome:    Outcome,
  pub actor:      Actor,
  pub target:     Option<Target>,
  pub details:    Option<String>,
  pub created_at: DateTime<Utc>,
}

/// Caller input to the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
  pub event_type: String,
  pub outcome:    Outcome,
  #[serde(default)]
  pub actor:      Actor,
  #[serde(default)]
  pub target:     Option<Target>,
  #[serde(default)]
  pub details:    Option<String>,
}

impl AuditEntry {
  pub fn new(event_type: impl Into<String>, outcome: Outcome, actor: Actor) -> Self {
    Self {
      event_type: event_type.into(),
      outcome,
      actor,
      target: None,
      details: None,
    }
  }

  pub fn target(mut self, target: Target) -> Self {
    self.target = Some(target);
    self
  }

  pub fn details(mut self, details: Option<String>) -> Self {
    self.details = details;
    self
  }
}

/// A denied access attempt reported by an access-control decision point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeniedAttempt {
  pub event_type: String,
  #[serde(default)]
  pub actor:      Actor,
  #[serde(default)]
  pub target:     Option<Target>,
  #[serde(default)]
  pub details:    Option<String>,
}

impl DeniedAttempt {
  pub fn new(event_type: impl Into<String>, actor: Actor) -> Self {
    Self { event_type: event_type.into(), actor, target: None, details: None }
  }

  pub fn into_entry(self) -> AuditEntry {
    AuditEntry {
      event_type: self.event_type,
      outcome:    Outcome::Denied,
      actor:      self.actor,
      target:     self.target,
      details:    self.details,
    }
  }
}

/// Input to [`crate::store::AuditStore::append_event`]. The actor is already
/// normalized and `created_at` stamped by the audit log.
#[derive(Debug, Clone)]
pub struct EventDraft {
  pub entry:      AuditEntry,
  pub created_at: DateTime<Utc>,
}

/// Parameters for listing audit events, newest first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
  pub outcome:    Option<Outcome>,
  pub event_type: Option<String>,
  pub limit:      Option<usize>,
}
