//! Integration tests for `SqliteStore` against an in-memory database.

use beacon_core::{
  alert::{AlertDraft, AlertResolution, AlertStatus},
  audit::{Actor, AuditEntry, AuditQuery, EventDraft, Outcome, Target},
  job::{JobDraft, JobStatus, NewJob},
  store::{AuditStore, JobStore},
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap() }

fn draft(recipient: &str, at: DateTime<Utc>) -> JobDraft {
  JobDraft {
    job:        NewJob::new(recipient, "You're invited", "<p>hello</p>"),
    created_at: at,
  }
}

// ─── Jobs ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_get_job() {
  let s = store().await;
  let job = s
    .insert_job(JobDraft {
      job:        NewJob::new("a@example.com", "s", "b").with_correlation("invite", "share-1"),
      created_at: t0(),
    })
    .await
    .unwrap();

  assert_eq!(job.status, JobStatus::Pending);
  assert_eq!(job.attempts, 0);

  let fetched = s.get_job(job.job_id).await.unwrap().unwrap();
  assert_eq!(fetched.recipient, "a@example.com");
  assert_eq!(fetched.created_at, t0());
  assert_eq!(fetched.correlation.unwrap().id, "share-1");
}

#[tokio::test]
async fn get_job_missing_returns_none() {
  let s = store().await;
  assert!(s.get_job(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn oldest_pending_orders_by_created_then_insertion() {
  let s = store().await;
  let late  = s.insert_job(draft("late@example.com", t0() + Duration::seconds(5))).await.unwrap();
  let first = s.insert_job(draft("first@example.com", t0())).await.unwrap();
  let _tie  = s.insert_job(draft("tie@example.com", t0())).await.unwrap();

  let oldest = s.oldest_pending().await.unwrap().unwrap();
  assert_eq!(oldest.job_id, first.job_id);

  let listed = s.list_jobs(JobStatus::Pending).await.unwrap();
  let order: Vec<_> = listed.iter().map(|j| j.recipient.as_str()).collect();
  assert_eq!(order, ["first@example.com", "tie@example.com", "late@example.com"]);
  assert_eq!(listed[2].job_id, late.job_id);
}

#[tokio::test]
async fn claim_is_conditional_on_claimable_status() {
  let s = store().await;
  let job = s.insert_job(draft("a@example.com", t0())).await.unwrap();

  let claimed = s.claim(job.job_id, t0()).await.unwrap().unwrap();
  assert_eq!(claimed.status, JobStatus::Sending);
  assert_eq!(claimed.last_attempt_at, Some(t0()));

  // Already sending: a second claim does nothing.
  assert!(s.claim(job.job_id, t0()).await.unwrap().is_none());
  assert!(s.oldest_pending().await.unwrap().is_none());
}

#[tokio::test]
async fn mark_sent_clears_error_and_sets_sent_at() {
  let s = store().await;
  let job = s.insert_job(draft("a@example.com", t0())).await.unwrap();
  s.claim(job.job_id, t0()).await.unwrap();
  s.mark_failed(job.job_id, "boom".into()).await.unwrap();
  s.claim(job.job_id, t0()).await.unwrap();

  assert!(s.mark_sent(job.job_id, t0() + Duration::seconds(1)).await.unwrap());

  let sent = s.get_job(job.job_id).await.unwrap().unwrap();
  assert_eq!(sent.status, JobStatus::Sent);
  assert_eq!(sent.error, None);
  assert_eq!(sent.sent_at, Some(t0() + Duration::seconds(1)));
  assert_eq!(sent.attempts, 1);
}

#[tokio::test]
async fn mark_sent_requires_sending() {
  let s = store().await;
  let job = s.insert_job(draft("a@example.com", t0())).await.unwrap();
  assert!(!s.mark_sent(job.job_id, t0()).await.unwrap());
  assert!(s.mark_failed(job.job_id, "x".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn mark_failed_increments_attempts() {
  let s = store().await;
  let job = s.insert_job(draft("a@example.com", t0())).await.unwrap();

  for expected in 1..=3 {
    s.claim(job.job_id, t0()).await.unwrap().unwrap();
    let failed = s.mark_failed(job.job_id, format!("err {expected}")).await.unwrap().unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.attempts, expected);
    assert_eq!(failed.error.as_deref(), Some(format!("err {expected}").as_str()));
  }
}

#[tokio::test]
async fn oldest_retriable_respects_attempt_cap() {
  let s = store().await;
  let job = s.insert_job(draft("a@example.com", t0())).await.unwrap();
  for _ in 0..2 {
    s.claim(job.job_id, t0()).await.unwrap();
    s.mark_failed(job.job_id, "nope".into()).await.unwrap();
  }

  assert_eq!(s.oldest_retriable(3).await.unwrap().unwrap().job_id, job.job_id);
  assert!(s.oldest_retriable(2).await.unwrap().is_none());
  assert_eq!(s.count_failed(3).await.unwrap(), (1, 0));
  assert_eq!(s.count_failed(2).await.unwrap(), (0, 1));
}

#[tokio::test]
async fn reset_failed_clears_attempts_and_error() {
  let s = store().await;
  let a = s.insert_job(draft("a@example.com", t0())).await.unwrap();
  let b = s.insert_job(draft("b@example.com", t0())).await.unwrap();
  for id in [a.job_id, b.job_id] {
    s.claim(id, t0()).await.unwrap();
    s.mark_failed(id, "down".into()).await.unwrap();
  }

  assert_eq!(s.reset_failed().await.unwrap(), 2);
  for id in [a.job_id, b.job_id] {
    let job = s.get_job(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.attempts, 0);
    assert_eq!(job.error, None);
  }
  assert_eq!(s.reset_failed().await.unwrap(), 0);
}

#[tokio::test]
async fn fail_stalled_only_touches_sending_jobs() {
  let s = store().await;
  let stuck = s.insert_job(draft("stuck@example.com", t0())).await.unwrap();
  let idle  = s.insert_job(draft("idle@example.com", t0())).await.unwrap();
  s.claim(stuck.job_id, t0()).await.unwrap();

  assert_eq!(s.fail_stalled("interrupted".into()).await.unwrap(), 1);

  let stuck = s.get_job(stuck.job_id).await.unwrap().unwrap();
  assert_eq!(stuck.status, JobStatus::Failed);
  assert_eq!(stuck.attempts, 1);
  let idle = s.get_job(idle.job_id).await.unwrap().unwrap();
  assert_eq!(idle.status, JobStatus::Pending);
}

#[tokio::test]
async fn count_and_delete_jobs() {
  let s = store().await;
  let a = s.insert_job(draft("a@example.com", t0())).await.unwrap();
  s.insert_job(draft("b@example.com", t0())).await.unwrap();

  assert_eq!(s.count_jobs(JobStatus::Pending).await.unwrap(), 2);
  assert!(s.delete_job(a.job_id).await.unwrap());
  assert!(!s.delete_job(a.job_id).await.unwrap());
  assert_eq!(s.count_jobs(JobStatus::Pending).await.unwrap(), 1);
}

// ─── Audit events ────────────────────────────────────────────────────────────

fn denied(event_type: &str, email: &str, at: DateTime<Utc>) -> EventDraft {
  EventDraft {
    entry:      AuditEntry::new(event_type, Outcome::Denied, Actor::with_email(email)),
    created_at: at,
  }
}

#[tokio::test]
async fn append_event_roundtrip() {
  let s = store().await;
  let event = s
    .append_event(EventDraft {
      entry: AuditEntry::new("children.share", Outcome::Success, Actor::user("u1", "p@example.com"))
        .target(Target::new("child", "c1"))
        .details(Some("shared with grandma".into())),
      created_at: t0(),
    })
    .await
    .unwrap();

  let listed = s.list_events(&AuditQuery::default()).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].event_id, event.event_id);
  assert_eq!(listed[0].actor, Actor::user("u1", "p@example.com"));
  assert_eq!(listed[0].target, Some(Target::new("child", "c1")));
  assert_eq!(listed[0].details.as_deref(), Some("shared with grandma"));
}

#[tokio::test]
async fn actor_events_window_is_inclusive() {
  let s = store().await;
  s.append_event(denied("child.view", "p@example.com", t0() - Duration::minutes(16))).await.unwrap();
  s.append_event(denied("child.view", "p@example.com", t0() - Duration::minutes(15))).await.unwrap();
  s.append_event(denied("child.view", "p@example.com", t0())).await.unwrap();
  s.append_event(denied("child.view", "other@example.com", t0())).await.unwrap();

  let events = s
    .actor_events_between("p@example.com", t0() - Duration::minutes(15), t0())
    .await
    .unwrap();
  assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn list_events_filters_and_orders_newest_first() {
  let s = store().await;
  s.append_event(denied("a", "p@example.com", t0())).await.unwrap();
  s.append_event(denied("b", "p@example.com", t0() + Duration::seconds(1))).await.unwrap();
  s.append_event(EventDraft {
    entry:      AuditEntry::new("a", Outcome::Success, Actor::anonymous()),
    created_at: t0() + Duration::seconds(2),
  })
  .await
  .unwrap();

  let all = s.list_events(&AuditQuery::default()).await.unwrap();
  assert_eq!(all.len(), 3);
  assert_eq!(all[0].outcome, Outcome::Success);

  let denied_a = s
    .list_events(&AuditQuery {
      outcome:    Some(Outcome::Denied),
      event_type: Some("a".into()),
      limit:      None,
    })
    .await
    .unwrap();
  assert_eq!(denied_a.len(), 1);

  let limited = s
    .list_events(&AuditQuery { limit: Some(1), ..AuditQuery::default() })
    .await
    .unwrap();
  assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn outcome_events_since_filters_by_time() {
  let s = store().await;
  s.append_event(denied("a", "p@example.com", t0() - Duration::hours(25))).await.unwrap();
  s.append_event(denied("a", "p@example.com", t0())).await.unwrap();

  let recent = s
    .outcome_events_since(Outcome::Denied, t0() - Duration::hours(24))
    .await
    .unwrap();
  assert_eq!(recent.len(), 1);
}

// ─── Alerts ──────────────────────────────────────────────────────────────────

fn alert_draft(email: &str, event_type: &str) -> AlertDraft {
  AlertDraft {
    actor_email:     email.into(),
    event_type:      event_type.into(),
    threshold:       5,
    count_in_window: 5,
    window_start:    t0() - Duration::minutes(15),
    window_end:      t0(),
    created_at:      t0(),
  }
}

#[tokio::test]
async fn insert_alert_unless_open_dedups_per_actor_and_type() {
  let s = store().await;
  let first = s.insert_alert_unless_open(alert_draft("p@example.com", "x")).await.unwrap();
  assert!(first.is_some());
  assert!(s.insert_alert_unless_open(alert_draft("p@example.com", "x")).await.unwrap().is_none());
  // Different event type or actor is a different key.
  assert!(s.insert_alert_unless_open(alert_draft("p@example.com", "y")).await.unwrap().is_some());
  assert!(s.insert_alert_unless_open(alert_draft("q@example.com", "x")).await.unwrap().is_some());

  let open = s.find_open_alert("p@example.com", "x").await.unwrap().unwrap();
  assert_eq!(open.alert_id, first.unwrap().alert_id);
  assert_eq!(s.count_alerts(AlertStatus::Open).await.unwrap(), 3);
}

#[tokio::test]
async fn resolve_alert_only_once() {
  let s = store().await;
  let alert = s
    .insert_alert_unless_open(alert_draft("p@example.com", "x"))
    .await
    .unwrap()
    .unwrap();

  let resolution = |at| AlertResolution {
    resolved_at: at,
    resolved_by: "admin".into(),
    notes:       Some("false positive".into()),
  };

  let resolved = s.resolve_alert(alert.alert_id, resolution(t0())).await.unwrap().unwrap();
  assert_eq!(resolved.status, AlertStatus::Resolved);
  assert_eq!(resolved.resolved_at, Some(t0()));

  assert!(
    s.resolve_alert(alert.alert_id, resolution(t0() + Duration::hours(1)))
      .await
      .unwrap()
      .is_none()
  );
  let stored = s.get_alert(alert.alert_id).await.unwrap().unwrap();
  assert_eq!(stored.resolved_at, Some(t0()));

  // Once resolved, a new alert for the same key may open.
  assert!(s.insert_alert_unless_open(alert_draft("p@example.com", "x")).await.unwrap().is_some());
}

#[tokio::test]
async fn list_alerts_by_status_newest_first() {
  let s = store().await;
  let mut older = alert_draft("a@example.com", "x");
  older.created_at = t0() - Duration::minutes(1);
  s.insert_alert_unless_open(older).await.unwrap();
  s.insert_alert_unless_open(alert_draft("b@example.com", "x")).await.unwrap();

  let open = s.list_alerts(AlertStatus::Open, 10).await.unwrap();
  assert_eq!(open.len(), 2);
  assert_eq!(open[0].actor_email, "b@example.com");
  assert_eq!(s.list_alerts(AlertStatus::Open, 1).await.unwrap().len(), 1);
  assert!(s.list_alerts(AlertStatus::Resolved, 10).await.unwrap().is_empty());
}
