//! [`AuditStore`] for [`SqliteStore`].

use beacon_core::{
  alert::{AlertDraft, AlertResolution, AlertStatus, SecurityAlert},
  audit::{AuditEvent, AuditQuery, EventDraft, Outcome},
  store::AuditStore,
};
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Result, SqliteStore,
  encode::{
    ALERT_COLUMNS, EVENT_COLUMNS, RawAlert, RawEvent, encode_dt, encode_uuid,
  },
};

/// Default page size for [`AuditStore::list_events`].
const DEFAULT_EVENT_LIMIT: usize = 200;

impl SqliteStore {
  fn select_alert(
    conn: &rusqlite::Connection,
    id_str: &str,
  ) -> rusqlite::Result<Option<RawAlert>> {
    conn
      .query_row(
        &format!("SELECT {ALERT_COLUMNS} FROM security_alerts WHERE alert_id = ?1"),
        rusqlite::params![id_str],
        RawAlert::from_row,
      )
      .optional()
  }

  async fn query_events(
    &self,
    sql: String,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<AuditEvent>> {
    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }
}

impl AuditStore for SqliteStore {
  type Error = crate::Error;

  // ── Audit events ──────────────────────────────────────────────────────────

  async fn append_event(&self, draft: EventDraft) -> Result<AuditEvent> {
    let EventDraft { entry, created_at } = draft;
    let event = AuditEvent {
      event_id: Uuid::new_v4(),
      event_type: entry.event_type,
      outcome: entry.outcome,
      actor: entry.actor,
      target: entry.target,
      details: entry.details,
      created_at,
    };

    let id_str      = encode_uuid(event.event_id);
    let event_type  = event.event_type.clone();
    let outcome_str = event.outcome.as_ref().to_owned();
    let user_id     = event.actor.user_id.clone();
    let email       = event.actor.email.clone();
    let target_type = event.target.as_ref().map(|t| t.kind.clone());
    let target_id   = event.target.as_ref().map(|t| t.id.clone());
    let details     = event.details.clone();
    let at_str      = encode_dt(event.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO audit_events (
             event_id, event_type, outcome, actor_user_id, actor_email,
             target_type, target_id, details, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str,
            event_type,
            outcome_str,
            user_id,
            email,
            target_type,
            target_id,
            details,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(event)
  }

  async fn actor_events_between(
    &self,
    actor_email: &str,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
  ) -> Result<Vec<AuditEvent>> {
    self
      .query_events(
        format!(
          "SELECT {EVENT_COLUMNS} FROM audit_events
           WHERE actor_email = ?1 AND created_at >= ?2 AND created_at <= ?3
           ORDER BY created_at ASC, seq ASC"
        ),
        vec![
          actor_email.to_owned().into(),
          encode_dt(since).into(),
          encode_dt(until).into(),
        ],
      )
      .await
  }

  async fn outcome_events_since(
    &self,
    outcome: Outcome,
    since: DateTime<Utc>,
  ) -> Result<Vec<AuditEvent>> {
    self
      .query_events(
        format!(
          "SELECT {EVENT_COLUMNS} FROM audit_events
           WHERE outcome = ?1 AND created_at >= ?2
           ORDER BY created_at ASC, seq ASC"
        ),
        vec![outcome.as_ref().to_owned().into(), encode_dt(since).into()],
      )
      .await
  }

  async fn list_events(&self, query: &AuditQuery) -> Result<Vec<AuditEvent>> {
    let outcome = query
      .outcome
      .map(|o| rusqlite::types::Value::Text(o.as_ref().to_owned()))
      .unwrap_or(rusqlite::types::Value::Null);
    let event_type = query
      .event_type
      .clone()
      .map(rusqlite::types::Value::Text)
      .unwrap_or(rusqlite::types::Value::Null);
    let limit = query.limit.unwrap_or(DEFAULT_EVENT_LIMIT) as i64;

    self
      .query_events(
        format!(
          "SELECT {EVENT_COLUMNS} FROM audit_events
           WHERE (?1 IS NULL OR outcome = ?1)
             AND (?2 IS NULL OR event_type = ?2)
           ORDER BY created_at DESC, seq DESC
           LIMIT ?3"
        ),
        vec![outcome, event_type, limit.into()],
      )
      .await
  }

  // ── Alerts ────────────────────────────────────────────────────────────────

  async fn find_open_alert(
    &self,
    actor_email: &str,
    event_type: &str,
  ) -> Result<Option<SecurityAlert>> {
    let email      = actor_email.to_owned();
    let event_type = event_type.to_owned();

    let raw: Option<RawAlert> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ALERT_COLUMNS} FROM security_alerts
                 WHERE actor_email = ?1 AND status = 'open' AND event_type = ?2
                 ORDER BY created_at ASC, seq ASC
                 LIMIT 1"
              ),
              rusqlite::params![email, event_type],
              RawAlert::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAlert::into_alert).transpose()
  }

  async fn insert_alert_unless_open(
    &self,
    draft: AlertDraft,
  ) -> Result<Option<SecurityAlert>> {
    let alert = SecurityAlert {
      alert_id:         Uuid::new_v4(),
      actor_email:      draft.actor_email,
      event_type:       draft.event_type,
      threshold:        draft.threshold,
      count_in_window:  draft.count_in_window,
      window_start:     draft.window_start,
      window_end:       draft.window_end,
      status:           AlertStatus::Open,
      created_at:       draft.created_at,
      resolved_at:      None,
      resolved_by:      None,
      resolution_notes: None,
    };

    let id_str     = encode_uuid(alert.alert_id);
    let email      = alert.actor_email.clone();
    let event_type = alert.event_type.clone();
    let threshold  = i64::from(alert.threshold);
    let count      = i64::from(alert.count_in_window);
    let start_str  = encode_dt(alert.window_start);
    let end_str    = encode_dt(alert.window_end);
    let at_str     = encode_dt(alert.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let existing: Option<String> = tx
          .query_row(
            "SELECT alert_id FROM security_alerts
             WHERE actor_email = ?1 AND status = 'open' AND event_type = ?2
             LIMIT 1",
            rusqlite::params![email, event_type],
            |r| r.get(0),
          )
          .optional()?;
        if existing.is_some() {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO security_alerts (
             alert_id, actor_email, event_type, threshold, count_in_window,
             window_start, window_end, status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'open', ?8)",
          rusqlite::params![
            id_str, email, event_type, threshold, count, start_str, end_str, at_str
          ],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(inserted.then_some(alert))
  }

  async fn get_alert(&self, alert_id: Uuid) -> Result<Option<SecurityAlert>> {
    let id_str = encode_uuid(alert_id);
    let raw = self
      .conn
      .call(move |conn| Ok(Self::select_alert(conn, &id_str)?))
      .await?;
    raw.map(RawAlert::into_alert).transpose()
  }

  async fn resolve_alert(
    &self,
    alert_id: Uuid,
    resolution: AlertResolution,
  ) -> Result<Option<SecurityAlert>> {
    let id_str = encode_uuid(alert_id);
    let at_str = encode_dt(resolution.resolved_at);
    let by     = resolution.resolved_by;
    let notes  = resolution.notes;

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE security_alerts
           SET status = 'resolved', resolved_at = ?2, resolved_by = ?3,
               resolution_notes = ?4
           WHERE alert_id = ?1 AND status = 'open'",
          rusqlite::params![id_str, at_str, by, notes],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(Self::select_alert(conn, &id_str)?)
      })
      .await?;

    raw.map(RawAlert::into_alert).transpose()
  }

  async fn list_alerts(
    &self,
    status: AlertStatus,
    limit: usize,
  ) -> Result<Vec<SecurityAlert>> {
    let status_str = status.as_ref().to_owned();
    let limit      = limit as i64;

    let raws: Vec<RawAlert> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ALERT_COLUMNS} FROM security_alerts
           WHERE status = ?1
           ORDER BY created_at DESC, seq DESC
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![status_str, limit], RawAlert::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAlert::into_alert).collect()
  }

  async fn count_alerts(&self, status: AlertStatus) -> Result<u64> {
    let status_str = status.as_ref().to_owned();

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM security_alerts WHERE status = ?1",
          rusqlite::params![status_str],
          |r| r.get(0),
        )?)
      })
      .await?;

    Ok(count as u64)
  }
}
