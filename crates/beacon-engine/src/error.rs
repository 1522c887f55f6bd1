//! Error type for `beacon-engine`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid job: {0}")]
  InvalidJob(String),

  #[error("job not found: {0}")]
  JobNotFound(Uuid),

  #[error("alert not found: {0}")]
  AlertNotFound(Uuid),

  #[error("alert resolver has no identity")]
  AnonymousResolver,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
