//! Error types for `beacon-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid queue policy: {0}")]
  InvalidQueuePolicy(String),

  #[error("invalid alert policy: {0}")]
  InvalidAlertPolicy(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
