//! Error type for `beacon-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown {kind} value in database: {value:?}")]
  UnknownVariant { kind: &'static str, value: String },

  #[error("integer out of range for {0}")]
  OutOfRange(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
