//! Outbound email transport for Beacon.
//!
//! [`ResendTransport`] implements [`beacon_core::transport::Transport`] over
//! the Resend HTTP API. One call is one `POST`; retries and pacing are the
//! delivery engine's job.

pub mod error;
pub mod resend;

pub use error::{Error, Result};
pub use resend::{MailerConfig, ResendTransport};
