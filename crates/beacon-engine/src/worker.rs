//! The single delivery worker.
//!
//! All steps run on one task, one at a time, so at most one job is ever in
//! `sending`. [`ChannelScheduler`] turns `schedule(after)` calls into wake
//! signals; the worker keeps only the earliest pending wake-up and never
//! starts a step before the rate gate set by the previous outcome.

use std::time::Duration;

use beacon_core::{store::JobStore, transport::Transport};
use tokio::{
  sync::mpsc,
  task::JoinHandle,
  time::{Instant, sleep_until},
};

use crate::queue::{DeliveryQueue, Scheduler, Step};

// ─── Channel ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
enum Signal {
  Wake(Instant),
  Shutdown,
}

/// [`Scheduler`] that wakes the worker spawned from the paired [`Wakeups`].
#[derive(Debug, Clone)]
pub struct ChannelScheduler {
  tx: mpsc::UnboundedSender<Signal>,
}

impl Scheduler for ChannelScheduler {
  fn schedule(&self, after: Duration) {
    if self.tx.send(Signal::Wake(Instant::now() + after)).is_err() {
      tracing::debug!("delivery worker stopped; wake-up dropped");
    }
  }
}

/// Receiving half of [`channel`], consumed by [`spawn`].
#[derive(Debug)]
pub struct Wakeups {
  tx: mpsc::UnboundedSender<Signal>,
  rx: mpsc::UnboundedReceiver<Signal>,
}

pub fn channel() -> (ChannelScheduler, Wakeups) {
  let (tx, rx) = mpsc::unbounded_channel();
  (ChannelScheduler { tx: tx.clone() }, Wakeups { tx, rx })
}

// ─── Worker ──────────────────────────────────────────────────────────────────

pub struct WorkerHandle {
  tx:   mpsc::UnboundedSender<Signal>,
  task: JoinHandle<()>,
}

impl WorkerHandle {
  /// Stop the worker once any in-flight step has finished.
  pub async fn shutdown(self) {
    let _ = self.tx.send(Signal::Shutdown);
    if let Err(e) = self.task.await {
      tracing::error!(error = %e, "delivery worker panicked");
    }
  }
}

pub fn spawn<S, T>(queue: DeliveryQueue<S, T>, wakeups: Wakeups) -> WorkerHandle
where
  S: JobStore + 'static,
  T: Transport + 'static,
{
  let Wakeups { tx, rx } = wakeups;
  let task = tokio::spawn(run(queue, rx));
  WorkerHandle { tx, task }
}

async fn run<S, T>(queue: DeliveryQueue<S, T>, mut rx: mpsc::UnboundedReceiver<Signal>)
where
  S: JobStore,
  T: Transport,
{
  let policy = queue.policy();
  let mut due: Option<Instant> = None;
  let mut gate = Instant::now();
  // Set after a failed step, which may have left its job `sending`.
  let mut release_pending = false;

  tracing::info!("delivery worker started");

  loop {
    tokio::select! {
      biased;

      signal = rx.recv() => match signal {
        Some(Signal::Wake(at)) => {
          let at = at.max(gate);
          due = Some(due.map_or(at, |d| d.min(at)));
        }
        Some(Signal::Shutdown) | None => break,
      },

      () = wait_for(due) => {
        due = None;
        let pause = match step(&queue, &mut release_pending).await {
          Ok(Step::Idle) => None,
          Ok(Step::Delivered { .. }) => Some(policy.normal_interval),
          Ok(Step::Failed { .. }) => Some(policy.failure_backoff),
          Err(e) => {
            tracing::error!(error = %e, "delivery step failed; retrying after backoff");
            due = Some(Instant::now() + policy.failure_backoff);
            Some(policy.failure_backoff)
          }
        };
        if let Some(pause) = pause {
          gate = Instant::now() + pause;
        }
      }
    }
  }

  tracing::info!("delivery worker stopped");
}

/// One step, preceded by releasing any job a failed step left `sending`.
async fn step<S, T>(
  queue: &DeliveryQueue<S, T>,
  release_pending: &mut bool,
) -> crate::Result<Step>
where
  S: JobStore,
  T: Transport,
{
  if *release_pending {
    queue.release_stalled().await?;
    *release_pending = false;
  }
  let result = queue.process_step().await;
  if result.is_err() {
    *release_pending = true;
  }
  result
}

async fn wait_for(due: Option<Instant>) {
  match due {
    Some(at) => sleep_until(at).await,
    None => std::future::pending().await,
  }
}
