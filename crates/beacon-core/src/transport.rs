//! The outbound sender contract.
//!
//! A [`Transport`] makes exactly one delivery attempt per call and never
//! retries internally; retry policy belongs to the delivery engine. Every
//! failure collapses to a [`SendError`] whose `Display` form is the error
//! string recorded on the job, while [`SendError::kind`] keeps the class
//! available for operator triage.

use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use thiserror::Error;

use crate::job::DeliveryJob;

/// The part of a job a transport needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
  pub recipient: String,
  pub subject:   String,
  pub body:      String,
}

impl From<&DeliveryJob> for OutboundMessage {
  fn from(job: &DeliveryJob) -> Self {
    Self {
      recipient: job.recipient.clone(),
      subject:   job.subject.clone(),
      body:      job.body.clone(),
    }
  }
}

/// Why a single delivery attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
  /// The transport is not usable, e.g. no credential configured. No remote
  /// call was made.
  #[error("{0}")]
  Config(String),

  /// The remote service answered with a non-success status.
  #[error("{service} error: {status} - {body}")]
  Rejected {
    service: String,
    status:  u16,
    body:    String,
  },

  /// Connection, TLS or I/O failure before a response was read.
  #[error("transport error: {0}")]
  Transport(String),

  /// The attempt exceeded the configured send timeout.
  #[error("send timed out after {0:?}")]
  Timeout(Duration),
}

/// Coarse classification of a [`SendError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SendErrorKind {
  Config,
  Rejected,
  Transport,
  Timeout,
}

impl SendError {
  pub fn kind(&self) -> SendErrorKind {
    match self {
      Self::Config(_) => SendErrorKind::Config,
      Self::Rejected { .. } => SendErrorKind::Rejected,
      Self::Transport(_) => SendErrorKind::Transport,
      Self::Timeout(_) => SendErrorKind::Timeout,
    }
  }
}

/// A single-attempt sender for outbound messages.
pub trait Transport: Send + Sync {
  fn send<'a>(
    &'a self,
    message: &'a OutboundMessage,
  ) -> impl Future<Output = Result<(), SendError>> + Send + 'a;
}
