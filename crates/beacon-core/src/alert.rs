//! Security alerts raised from repeated denied attempts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
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
pub enum AlertStatus {
  #[default]
  Open,
  Resolved,
}

/// A persisted alert. At most one alert per `(actor_email, event_type)` is
/// `open` at any time; an alert transitions to `resolved` exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityAlert {
  pub alert_id:         Uuid,
  /// Normalized actor email the denials were keyed on.
  pub actor_email:      String,
  pub event_type:       String,
  pub threshold:        u32,
  pub count_in_window:  u32,
  pub window_start:     DateTime<Utc>,
  pub window_end:       DateTime<Utc>,
  pub status:           AlertStatus,
  pub created_at:       DateTime<Utc>,
  pub resolved_at:      Option<DateTime<Utc>>,
  pub resolved_by:      Option<String>,
  pub resolution_notes: Option<String>,
}

/// Input to [`crate::store::AuditStore::insert_alert_unless_open`].
#[derive(Debug, Clone)]
pub struct AlertDraft {
  pub actor_email:     String,
  pub event_type:      String,
  pub threshold:       u32,
  pub count_in_window: u32,
  pub window_start:    DateTime<Utc>,
  pub window_end:      DateTime<Utc>,
  pub created_at:      DateTime<Utc>,
}

/// The patch applied when an operator resolves an alert.
#[derive(Debug, Clone)]
pub struct AlertResolution {
  pub resolved_at: DateTime<Utc>,
  pub resolved_by: String,
  pub notes:       Option<String>,
}

// ─── Read side ───────────────────────────────────────────────────────────────

/// Number of denied events of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCount {
  pub event_type: String,
  pub count:      u64,
}

/// Operator dashboard projection over alerts and recent denials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityOverview {
  pub open_alerts:       u64,
  pub resolved_alerts:   u64,
  pub denied_last_24h:   u64,
  pub top_denied_events: Vec<EventCount>,
}
