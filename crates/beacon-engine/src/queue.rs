//! [`DeliveryQueue`]: the rate-limited outbound delivery engine.
//!
//! A step selects at most one job, claims it, makes exactly one transport
//! attempt and records the outcome. Recording the outcome is what schedules
//! the next step; [`DeliveryQueue::process_step`] never reschedules on its
//! own, so an empty queue goes quiet until the next enqueue.

use std::{sync::Arc, time::Duration};

use beacon_core::{
  clock::{Clock, SystemClock},
  job::{DeliveryJob, FailedJob, JobDraft, JobStatus, NewJob, QueueStatus},
  policy::QueuePolicy,
  store::JobStore,
  transport::{OutboundMessage, SendError, Transport},
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

/// Error recorded on jobs found `sending` when the queue resumes.
pub const INTERRUPTED_ERROR: &str =
  "interrupted before delivery outcome was recorded";

/// Error recorded on jobs released after their outcome failed to persist.
pub const UNRECORDED_ERROR: &str = "delivery outcome could not be recorded";

/// Fire-and-forget request to run a step after a delay.
pub trait Scheduler: Send + Sync {
  fn schedule(&self, after: Duration);
}

/// What a single step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
  /// No pending or retriable job was available.
  Idle,
  Delivered { job_id: Uuid },
  Failed { job_id: Uuid, attempts: u32, exhausted: bool },
}

pub struct DeliveryQueue<S, T> {
  store:     Arc<S>,
  transport: Arc<T>,
  scheduler: Arc<dyn Scheduler>,
  clock:     Arc<dyn Clock>,
  policy:    QueuePolicy,
}

impl<S, T> Clone for DeliveryQueue<S, T> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      transport: Arc::clone(&self.transport),
      scheduler: Arc::clone(&self.scheduler),
      clock:     Arc::clone(&self.clock),
      policy:    self.policy,
    }
  }
}

impl<S, T> DeliveryQueue<S, T>
where
  S: JobStore,
  T: Transport,
{
  pub fn new(store: Arc<S>, transport: Arc<T>, scheduler: Arc<dyn Scheduler>) -> Self {
    Self {
      store,
      transport,
      scheduler,
      clock: Arc::new(SystemClock),
      policy: QueuePolicy::default(),
    }
  }

  pub fn with_policy(mut self, policy: QueuePolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn policy(&self) -> QueuePolicy { self.policy }

  fn now(&self) -> DateTime<Utc> { self.clock.now() }

  // ─── Producer ──────────────────────────────────────────────────────────────

  /// Persist a job and schedule a step. Delivery happens later; its outcome
  /// is never reported back to the caller.
  pub async fn enqueue(&self, job: NewJob) -> Result<Uuid> {
    if job.recipient.trim().is_empty() {
      return Err(Error::InvalidJob("recipient must not be empty".into()));
    }

    let draft = JobDraft { job, created_at: self.now() };
    let stored = self.store.insert_job(draft).await.map_err(Error::store)?;

    tracing::debug!(job_id = %stored.job_id, "job enqueued");
    self.scheduler.schedule(self.policy.enqueue_delay);
    Ok(stored.job_id)
  }

  // ─── Step ──────────────────────────────────────────────────────────────────

  pub async fn process_step(&self) -> Result<Step> {
    let Some(job) = self.claim_next().await? else {
      tracing::trace!("queue idle");
      return Ok(Step::Idle);
    };

    let outcome = self.attempt(&job).await;
    self.record_outcome(&job, outcome).await
  }

  /// Pending jobs before retriable failures, oldest first. A candidate that
  /// changes state between selection and claim is skipped.
  async fn claim_next(&self) -> Result<Option<DeliveryJob>> {
    loop {
      let candidate = match self.store.oldest_pending().await.map_err(Error::store)? {
        Some(job) => job,
        None => match self
          .store
          .oldest_retriable(self.policy.max_attempts)
          .await
          .map_err(Error::store)?
        {
          Some(job) => job,
          None => return Ok(None),
        },
      };

      let claimed = self
        .store
        .claim(candidate.job_id, self.now())
        .await
        .map_err(Error::store)?;
      if let Some(job) = claimed {
        return Ok(Some(job));
      }
      tracing::debug!(job_id = %candidate.job_id, "job changed state before claim");
    }
  }

  async fn attempt(&self, job: &DeliveryJob) -> Result<(), SendError> {
    let message = OutboundMessage::from(job);
    let limit = self.policy.send_timeout;
    tokio::time::timeout(limit, self.transport.send(&message))
      .await
      .unwrap_or(Err(SendError::Timeout(limit)))
  }

  async fn record_outcome(
    &self,
    job: &DeliveryJob,
    outcome: Result<(), SendError>,
  ) -> Result<Step> {
    match outcome {
      Ok(()) => {
        let applied = self
          .store
          .mark_sent(job.job_id, self.now())
          .await
          .map_err(Error::store)?;
        if applied {
          tracing::info!(job_id = %job.job_id, "job delivered");
        } else {
          tracing::warn!(job_id = %job.job_id, "delivered job was no longer sending");
        }
        self.scheduler.schedule(self.policy.normal_interval);
        Ok(Step::Delivered { job_id: job.job_id })
      }
      Err(e) => {
        let updated = self
          .store
          .mark_failed(job.job_id, e.to_string())
          .await
          .map_err(Error::store)?;
        self.scheduler.schedule(self.policy.failure_backoff);

        let attempts = updated.as_ref().map_or(job.attempts + 1, |j| j.attempts);
        let exhausted = attempts >= self.policy.max_attempts;
        if updated.is_none() {
          tracing::warn!(job_id = %job.job_id, "failed job was no longer sending");
        }
        tracing::warn!(
          job_id = %job.job_id,
          attempts,
          exhausted,
          kind = %e.kind(),
          error = %e,
          "delivery attempt failed"
        );
        Ok(Step::Failed { job_id: job.job_id, attempts, exhausted })
      }
    }
  }

  // ─── Administration ────────────────────────────────────────────────────────

  pub async fn status(&self) -> Result<QueueStatus> {
    let pending = self.store.count_jobs(JobStatus::Pending).await.map_err(Error::store)?;
    let sending = self.store.count_jobs(JobStatus::Sending).await.map_err(Error::store)?;
    let sent = self.store.count_jobs(JobStatus::Sent).await.map_err(Error::store)?;
    let (retriable, exhausted) = self
      .store
      .count_failed(self.policy.max_attempts)
      .await
      .map_err(Error::store)?;

    Ok(QueueStatus { pending, sending, sent, retriable, exhausted })
  }

  pub async fn failed_jobs(&self) -> Result<Vec<FailedJob>> {
    let jobs = self.store.list_jobs(JobStatus::Failed).await.map_err(Error::store)?;
    Ok(
      jobs
        .into_iter()
        .map(|job| FailedJob::from_job(job, self.policy.max_attempts))
        .collect(),
    )
  }

  /// Reset every failed job to pending with a fresh attempt budget.
  pub async fn retry_failed(&self) -> Result<u64> {
    let count = self.store.reset_failed().await.map_err(Error::store)?;
    if count > 0 {
      tracing::info!(count, "failed jobs reset for retry");
      self.scheduler.schedule(Duration::ZERO);
    }
    Ok(count)
  }

  pub async fn get_job(&self, job_id: Uuid) -> Result<DeliveryJob> {
    self
      .store
      .get_job(job_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::JobNotFound(job_id))
  }

  pub async fn delete_job(&self, job_id: Uuid) -> Result<()> {
    let deleted = self.store.delete_job(job_id).await.map_err(Error::store)?;
    if !deleted {
      return Err(Error::JobNotFound(job_id));
    }
    tracing::info!(%job_id, "job deleted");
    Ok(())
  }

  /// Fail every job left `sending` by a step whose outcome write errored.
  /// Only valid while no step is in flight; the worker calls it between
  /// steps. The job becomes retriable with one attempt consumed, so a send
  /// that did go through may be repeated.
  pub async fn release_stalled(&self) -> Result<u64> {
    let released = self
      .store
      .fail_stalled(UNRECORDED_ERROR.to_string())
      .await
      .map_err(Error::store)?;
    if released > 0 {
      tracing::warn!(count = released, "released jobs stuck in sending");
    }
    Ok(released)
  }

  /// Recover from a previous process: fail jobs it left `sending` and kick
  /// the worker if anything is queued. Returns the number of stalled jobs.
  pub async fn resume(&self) -> Result<u64> {
    let stalled = self
      .store
      .fail_stalled(INTERRUPTED_ERROR.to_string())
      .await
      .map_err(Error::store)?;
    if stalled > 0 {
      tracing::warn!(count = stalled, "failed jobs interrupted mid-send");
    }

    let status = self.status().await?;
    if status.pending + status.retriable > 0 {
      self.scheduler.schedule(Duration::ZERO);
    }
    Ok(stalled)
  }
}
