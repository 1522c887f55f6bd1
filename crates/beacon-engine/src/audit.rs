//! [`AuditLog`]: normalizes, timestamps and appends audit events.

use std::sync::Arc;

use beacon_core::{
  audit::{AuditEntry, AuditEvent, AuditQuery, EventDraft},
  clock::{Clock, SystemClock},
  store::AuditStore,
};
use chrono::{DateTime, Utc};

use crate::{Error, Result};

pub struct AuditLog<S> {
  store: Arc<S>,
  clock: Arc<dyn Clock>,
}

impl<S> Clone for AuditLog<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), clock: Arc::clone(&self.clock) }
  }
}

impl<S: AuditStore> AuditLog<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store, clock: Arc::new(SystemClock) }
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub(crate) fn store(&self) -> &S { &self.store }

  pub(crate) fn now(&self) -> DateTime<Utc> { self.clock.now() }

  /// Append one event. Failures propagate so the caller's decision and its
  /// audit record succeed or fail together.
  pub async fn record(&self, mut entry: AuditEntry) -> Result<AuditEvent> {
    entry.actor = entry.actor.normalized();
    let draft = EventDraft { entry, created_at: self.now() };
    let event = self.store.append_event(draft).await.map_err(Error::store)?;

    tracing::debug!(
      event_type = %event.event_type,
      outcome = %event.outcome,
      actor = event.actor.email.as_deref().unwrap_or("-"),
      "audit event recorded"
    );
    Ok(event)
  }

  /// Newest first; at most 200 events unless `query.limit` says otherwise.
  pub async fn list(&self, query: &AuditQuery) -> Result<Vec<AuditEvent>> {
    self.store.list_events(query).await.map_err(Error::store)
  }
}
