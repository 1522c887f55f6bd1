//! Tunable constants for the delivery queue and the alerting engine.
//!
//! The defaults match the production values: one send per second to stay
//! under the email provider's rate limit, a five times longer pause after a
//! failure, three attempts per job, and alerts on five denials in fifteen
//! minutes.

use std::time::Duration;

use crate::{Error, Result};

// ─── Queue ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuePolicy {
  /// Failed jobs with this many attempts are no longer retried.
  pub max_attempts:    u32,
  /// Pause after a successful send before the next step.
  pub normal_interval: Duration,
  /// Pause after a failed send before the next step.
  pub failure_backoff: Duration,
  /// Delay between `enqueue` and the step it schedules.
  pub enqueue_delay:   Duration,
  /// Upper bound on a single transport attempt.
  pub send_timeout:    Duration,
}

impl Default for QueuePolicy {
  fn default() -> Self {
    Self {
      max_attempts:    3,
      normal_interval: Duration::from_secs(1),
      failure_backoff: Duration::from_secs(5),
      enqueue_delay:   Duration::from_millis(100),
      send_timeout:    Duration::from_secs(30),
    }
  }
}

impl QueuePolicy {
  pub fn validate(self) -> Result<Self> {
    if self.max_attempts == 0 {
      return Err(Error::InvalidQueuePolicy(
        "max_attempts must be at least 1".into(),
      ));
    }
    if self.failure_backoff < self.normal_interval {
      return Err(Error::InvalidQueuePolicy(format!(
        "failure_backoff ({:?}) must not be shorter than normal_interval ({:?})",
        self.failure_backoff, self.normal_interval
      )));
    }
    if self.send_timeout.is_zero() {
      return Err(Error::InvalidQueuePolicy(
        "send_timeout must be non-zero".into(),
      ));
    }
    Ok(self)
  }
}

// ─── Alerts ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPolicy {
  /// Denied events within `window` needed to raise an alert.
  pub threshold: u32,
  /// Length of the trailing window denials are counted over.
  pub window:    Duration,
}

impl Default for AlertPolicy {
  fn default() -> Self {
    Self { threshold: 5, window: Duration::from_secs(15 * 60) }
  }
}

impl AlertPolicy {
  pub fn validate(self) -> Result<Self> {
    if self.threshold == 0 {
      return Err(Error::InvalidAlertPolicy(
        "threshold must be at least 1".into(),
      ));
    }
    if self.window.is_zero() {
      return Err(Error::InvalidAlertPolicy("window must be non-zero".into()));
    }
    Ok(self)
  }
}
