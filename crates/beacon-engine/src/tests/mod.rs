//! Engine tests against an in-memory `SqliteStore`, a scripted transport and
//! a scheduler that only records what it was asked to do.


use std::{
  collections::VecDeque,
  sync::{
    Arc, Mutex,
    atomic::{AtomicU32, Ordering},
  },
  time::Duration,
};

use beacon_core::{
  clock::ManualClock,
  job::{DeliveryJob, JobDraft, JobStatus},
  policy::QueuePolicy,
  store::JobStore,
  transport::{OutboundMessage, SendError, Transport},
};
use beacon_store_sqlite::SqliteStore;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::{DeliveryQueue, Scheduler};

pub(crate) fn t0() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
}

// ─── Transport ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub(crate) enum Reply {
  Deliver,
  Reject,
  NoKey,
  Hang,
}

/// Replies from a script, then with `fallback` once the script runs out.
pub(crate) struct ScriptedTransport {
  script:       Mutex<VecDeque<Reply>>,
  fallback:     Reply,
  sent:         Mutex<Vec<OutboundMessage>>,
  /// When set, the number of `sending` jobs is sampled during each call.
  observe:      Option<Arc<SqliteStore>>,
  sending_seen: Mutex<Vec<u64>>,
}

impl ScriptedTransport {
  pub(crate) fn always(reply: Reply) -> Self {
    Self {
      script:       Mutex::new(VecDeque::new()),
      fallback:     reply,
      sent:         Mutex::new(Vec::new()),
      observe:      None,
      sending_seen: Mutex::new(Vec::new()),
    }
  }

  pub(crate) fn script(mut self, replies: impl IntoIterator<Item = Reply>) -> Self {
    self.script = Mutex::new(replies.into_iter().collect());
    self
  }

  pub(crate) fn observing(mut self, store: Arc<SqliteStore>) -> Self {
    self.observe = Some(store);
    self
  }

  pub(crate) fn calls(&self) -> Vec<OutboundMessage> { self.sent.lock().unwrap().clone() }

  pub(crate) fn sending_seen(&self) -> Vec<u64> { self.sending_seen.lock().unwrap().clone() }
}

impl Transport for ScriptedTransport {
  async fn send(&self, message: &OutboundMessage) -> Result<(), SendError> {
    self.sent.lock().unwrap().push(message.clone());
    if let Some(store) = &self.observe {
      let sending = store.count_jobs(JobStatus::Sending).await.unwrap();
      self.sending_seen.lock().unwrap().push(sending);
    }

    let reply = self.script.lock().unwrap().pop_front().unwrap_or(self.fallback);
    match reply {
      Reply::Deliver => Ok(()),
      Reply::Reject => Err(SendError::Rejected {
        service: "Resend API".into(),
        status:  500,
        body:    "upstream unavailable".into(),
      }),
      Reply::NoKey => Err(SendError::Config("resend api key not configured".into())),
      Reply::Hang => std::future::pending().await,
    }
  }
}

// ─── Scheduler ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct RecordingScheduler {
  calls: Mutex<Vec<Duration>>,
}

impl RecordingScheduler {
  pub(crate) fn calls(&self) -> Vec<Duration> { self.calls.lock().unwrap().clone() }

  pub(crate) fn clear(&self) { self.calls.lock().unwrap().clear() }
}

impl Scheduler for RecordingScheduler {
  fn schedule(&self, after: Duration) { self.calls.lock().unwrap().push(after) }
}

// ─── Store ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub(crate) enum FlakyError {
  #[error(transparent)]
  Store(#[from] beacon_store_sqlite::Error),

  #[error("database is locked")]
  Locked,
}

/// Delegates to a `SqliteStore`, but fails the next `n` `mark_sent` calls
/// without touching the job.
pub(crate) struct FlakyStore {
  pub inner:        Arc<SqliteStore>,
  mark_sent_errors: AtomicU32,
}

impl FlakyStore {
  pub(crate) fn failing_mark_sent(inner: Arc<SqliteStore>, n: u32) -> Self {
    Self { inner, mark_sent_errors: AtomicU32::new(n) }
  }
}

impl JobStore for FlakyStore {
  type Error = FlakyError;

  async fn insert_job(&self, draft: JobDraft) -> Result<DeliveryJob, FlakyError> {
    Ok(self.inner.insert_job(draft).await?)
  }

  async fn get_job(&self, job_id: Uuid) -> Result<Option<DeliveryJob>, FlakyError> {
    Ok(self.inner.get_job(job_id).await?)
  }

  async fn oldest_pending(&self) -> Result<Option<DeliveryJob>, FlakyError> {
    Ok(self.inner.oldest_pending().await?)
  }

  async fn oldest_retriable(
    &self,
    max_attempts: u32,
  ) -> Result<Option<DeliveryJob>, FlakyError> {
    Ok(self.inner.oldest_retriable(max_attempts).await?)
  }

  async fn claim(
    &self,
    job_id: Uuid,
    at: DateTime<Utc>,
  ) -> Result<Option<DeliveryJob>, FlakyError> {
    Ok(self.inner.claim(job_id, at).await?)
  }

  async fn mark_sent(&self, job_id: Uuid, at: DateTime<Utc>) -> Result<bool, FlakyError> {
    let failing = self
      .mark_sent_errors
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
      .is_ok();
    if failing {
      return Err(FlakyError::Locked);
    }
    Ok(self.inner.mark_sent(job_id, at).await?)
  }

  async fn mark_failed(
    &self,
    job_id: Uuid,
    error: String,
  ) -> Result<Option<DeliveryJob>, FlakyError> {
    Ok(self.inner.mark_failed(job_id, error).await?)
  }

  async fn list_jobs(&self, status: JobStatus) -> Result<Vec<DeliveryJob>, FlakyError> {
    Ok(self.inner.list_jobs(status).await?)
  }

  async fn count_jobs(&self, status: JobStatus) -> Result<u64, FlakyError> {
    Ok(self.inner.count_jobs(status).await?)
  }

  async fn count_failed(&self, max_attempts: u32) -> Result<(u64, u64), FlakyError> {
    Ok(self.inner.count_failed(max_attempts).await?)
  }

  async fn reset_failed(&self) -> Result<u64, FlakyError> {
    Ok(self.inner.reset_failed().await?)
  }

  async fn fail_stalled(&self, error: String) -> Result<u64, FlakyError> {
    Ok(self.inner.fail_stalled(error).await?)
  }

  async fn delete_job(&self, job_id: Uuid) -> Result<bool, FlakyError> {
    Ok(self.inner.delete_job(job_id).await?)
  }
}

// ─── Harness ─────────────────────────────────────────────────────────────────

pub(crate) struct Harness {
  pub store:     Arc<SqliteStore>,
  pub transport: Arc<ScriptedTransport>,
  pub scheduler: Arc<RecordingScheduler>,
  pub clock:     ManualClock,
  pub queue:     DeliveryQueue<SqliteStore, ScriptedTransport>,
}

impl Harness {
  pub(crate) async fn new(reply: Reply) -> Self {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    Self::with_transport(Arc::clone(&store), ScriptedTransport::always(reply))
  }

  pub(crate) fn with_transport(store: Arc<SqliteStore>, transport: ScriptedTransport) -> Self {
    let transport = Arc::new(transport);
    let scheduler = Arc::new(RecordingScheduler::default());
    let clock = ManualClock::new(t0());
    let queue = DeliveryQueue::new(
      Arc::clone(&store),
      Arc::clone(&transport),
      Arc::clone(&scheduler) as Arc<dyn Scheduler>,
    )
    .with_policy(QueuePolicy::default())
    .with_clock(Arc::new(clock.clone()));

    Self { store, transport, scheduler, clock, queue }
  }
}
