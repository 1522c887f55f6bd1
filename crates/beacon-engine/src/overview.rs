//! Read-side projections for the security dashboard.

use std::collections::HashMap;

use beacon_core::{
  alert::{AlertStatus, EventCount, SecurityAlert, SecurityOverview},
  audit::{AuditEvent, Outcome},
  store::AuditStore,
};

use crate::{AlertEngine, Error, Result};

/// How far back the overview counts denials.
pub const DENIED_LOOKBACK_HOURS: i64 = 24;

/// Entries in [`SecurityOverview::top_denied_events`].
pub const TOP_DENIED_LIMIT: usize = 5;

/// Default page size for [`AlertEngine::list_alerts`].
pub const DEFAULT_ALERT_LIMIT: usize = 100;

impl<S: AuditStore> AlertEngine<S> {
  pub async fn security_overview(&self) -> Result<SecurityOverview> {
    let store = self.audit.store();
    let open_alerts = store.count_alerts(AlertStatus::Open).await.map_err(Error::store)?;
    let resolved_alerts = store
      .count_alerts(AlertStatus::Resolved)
      .await
      .map_err(Error::store)?;

    let since = self.audit.now() - chrono::Duration::hours(DENIED_LOOKBACK_HOURS);
    let denied = store
      .outcome_events_since(Outcome::Denied, since)
      .await
      .map_err(Error::store)?;

    Ok(SecurityOverview {
      open_alerts,
      resolved_alerts,
      denied_last_24h: denied.len() as u64,
      top_denied_events: top_event_counts(&denied, TOP_DENIED_LIMIT),
    })
  }

  /// Alerts newest first; open ones unless `status` says otherwise.
  pub async fn list_alerts(
    &self,
    status: Option<AlertStatus>,
    limit: Option<usize>,
  ) -> Result<Vec<SecurityAlert>> {
    self
      .audit
      .store()
      .list_alerts(
        status.unwrap_or_default(),
        limit.unwrap_or(DEFAULT_ALERT_LIMIT),
      )
      .await
      .map_err(Error::store)
  }
}

/// Most frequent event types, highest count first, ties by name.
pub fn top_event_counts(events: &[AuditEvent], limit: usize) -> Vec<EventCount> {
  let mut counts: HashMap<&str, u64> = HashMap::new();
  for event in events {
    *counts.entry(event.event_type.as_str()).or_default() += 1;
  }

  let mut counts: Vec<EventCount> = counts
    .into_iter()
    .map(|(event_type, count)| EventCount { event_type: event_type.to_owned(), count })
    .collect();
  counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.event_type.cmp(&b.event_type)));
  counts.truncate(limit);
  counts
}
