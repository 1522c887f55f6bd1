//! [`AlertEngine`]: raises a security alert when one actor accumulates too
//! many denials of the same kind inside a trailing window.
//!
//! At most one alert is open per `(actor email, event type)`. Resolving it
//! reopens detection and the count is recomputed from every denial still
//! inside the window, including the ones the resolved alert was raised on.
//! A denial arriving while that burst is still in the window raises a new
//! alert straight away; once the burst has aged out it no longer counts.

use std::time::Duration;

use beacon_core::{
  alert::{AlertDraft, AlertResolution, AlertStatus, SecurityAlert},
  audit::{
    ALERT_RESOLVED_EVENT, Actor, AuditEntry, DeniedAttempt, Outcome,
    SECURITY_ALERT_TARGET, Target,
  },
  policy::AlertPolicy,
  store::AuditStore,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{AuditLog, Error, Result};

/// Result of [`AlertEngine::record_denied`].
#[derive(Debug, Clone, PartialEq)]
pub enum Denial {
  /// The actor had no email, so nothing can be counted against them.
  Anonymous,
  BelowThreshold { count: u32 },
  /// The threshold was reached but an alert is already open.
  AlreadyOpen { count: u32 },
  Raised(SecurityAlert),
}

/// Result of [`AlertEngine::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
  AlreadyResolved,
  Resolved(SecurityAlert),
}

pub struct AlertEngine<S> {
  pub(crate) audit: AuditLog<S>,
  policy:           AlertPolicy,
}

impl<S> Clone for AlertEngine<S> {
  fn clone(&self) -> Self {
    Self { audit: self.audit.clone(), policy: self.policy }
  }
}

impl<S: AuditStore> AlertEngine<S> {
  pub fn new(audit: AuditLog<S>) -> Self {
    Self { audit, policy: AlertPolicy::default() }
  }

  pub fn with_policy(mut self, policy: AlertPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn policy(&self) -> AlertPolicy { self.policy }

  pub fn audit(&self) -> &AuditLog<S> { &self.audit }

  /// Record a denied attempt and raise an alert if it crosses the threshold.
  pub async fn record_denied(&self, attempt: DeniedAttempt) -> Result<Denial> {
    let event = self.audit.record(attempt.into_entry()).await?;
    let Some(actor_email) = event.actor.email.clone() else {
      return Ok(Denial::Anonymous);
    };

    let now = event.created_at;
    let window_start = window_start(now, self.policy.window);
    let events = self
      .audit
      .store()
      .actor_events_between(&actor_email, window_start, now)
      .await
      .map_err(Error::store)?;

    let count = events
      .iter()
      .filter(|e| e.outcome == Outcome::Denied && e.event_type == event.event_type)
      .count();
    let count = u32::try_from(count).unwrap_or(u32::MAX);

    if count < self.policy.threshold {
      return Ok(Denial::BelowThreshold { count });
    }

    let open = self
      .audit
      .store()
      .find_open_alert(&actor_email, &event.event_type)
      .await
      .map_err(Error::store)?;
    if open.is_some() {
      return Ok(Denial::AlreadyOpen { count });
    }

    let draft = AlertDraft {
      actor_email: actor_email.clone(),
      event_type: event.event_type.clone(),
      threshold: self.policy.threshold,
      count_in_window: count,
      window_start,
      window_end: now,
      created_at: now,
    };
    let inserted = self
      .audit
      .store()
      .insert_alert_unless_open(draft)
      .await
      .map_err(Error::store)?;

    match inserted {
      Some(alert) => {
        tracing::warn!(
          alert_id = %alert.alert_id,
          actor = %actor_email,
          event_type = %alert.event_type,
          count,
          "security alert raised"
        );
        Ok(Denial::Raised(alert))
      }
      None => Ok(Denial::AlreadyOpen { count }),
    }
  }

  /// Close an open alert on behalf of `resolver`.
  ///
  /// The resolved patch is written before the `security.alert_resolved`
  /// event. If appending the event fails the alert stays resolved without
  /// it, the error is returned, and a retry reports
  /// [`Resolution::AlreadyResolved`] rather than writing the event.
  pub async fn resolve(
    &self,
    alert_id: Uuid,
    resolver: Actor,
    notes: Option<String>,
  ) -> Result<Resolution> {
    let alert = self
      .audit
      .store()
      .get_alert(alert_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::AlertNotFound(alert_id))?;
    if alert.status == AlertStatus::Resolved {
      return Ok(Resolution::AlreadyResolved);
    }

    let resolver = resolver.normalized();
    let resolved_by = resolver
      .user_id
      .clone()
      .or_else(|| resolver.email.clone())
      .ok_or(Error::AnonymousResolver)?;

    let resolution = AlertResolution {
      resolved_at: self.audit.now(),
      resolved_by,
      notes: notes.clone(),
    };
    let Some(resolved) = self
      .audit
      .store()
      .resolve_alert(alert_id, resolution)
      .await
      .map_err(Error::store)?
    else {
      return Ok(Resolution::AlreadyResolved);
    };

    self
      .audit
      .record(
        AuditEntry::new(ALERT_RESOLVED_EVENT, Outcome::Success, resolver)
          .target(Target::new(SECURITY_ALERT_TARGET, alert_id.to_string()))
          .details(notes),
      )
      .await
      .inspect_err(|e| {
        tracing::error!(%alert_id, error = %e, "alert resolved but its audit event was not recorded");
      })?;

    tracing::info!(%alert_id, "security alert resolved");
    Ok(Resolution::Resolved(resolved))
  }
}

/// Inclusive start of the window ending at `now`. An unrepresentable window
/// reaches back to the beginning of time.
fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
  chrono::Duration::from_std(window)
    .ok()
    .and_then(|w| now.checked_sub_signed(w))
    .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
