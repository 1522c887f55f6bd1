//! Error type for `beacon-mailer`.

use thiserror::Error;

/// Errors raised while building a transport. Per-send failures are reported
/// as [`beacon_core::transport::SendError`] instead.
#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to build HTTP client: {0}")]
  Client(#[from] reqwest::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
