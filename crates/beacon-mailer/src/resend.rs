//! [`ResendTransport`] — sends one email per call through the Resend API.

use std::time::Duration;

use beacon_core::transport::{OutboundMessage, SendError, Transport};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Production Resend endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.resend.com/emails";

/// Service name used in rejection messages recorded on failed jobs.
const SERVICE: &str = "Resend API";

/// Connection settings for the Resend API.
#[derive(Debug, Clone, Deserialize)]
pub struct MailerConfig {
  /// Bearer credential. Sends fail with a configuration error while unset.
  #[serde(default)]
  pub api_key:  Option<String>,
  /// `From:` header, e.g. `SignTracker <signtracker@example.com>`.
  pub from:     String,
  #[serde(default = "default_endpoint")]
  pub endpoint: String,
}

fn default_endpoint() -> String { DEFAULT_ENDPOINT.to_string() }

/// JSON body accepted by `POST /emails`.
#[derive(Debug, Serialize)]
struct SendRequest<'a> {
  from:    &'a str,
  to:      &'a str,
  subject: &'a str,
  html:    &'a str,
}

/// Resend-backed [`Transport`].
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ResendTransport {
  client: Client,
  config: MailerConfig,
}

impl ResendTransport {
  /// Build a transport whose HTTP client gives up after `timeout`.
  pub fn new(config: MailerConfig, timeout: Duration) -> Result<Self> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self { client, config })
  }

  fn api_key(&self) -> Result<&str, SendError> {
    self
      .config
      .api_key
      .as_deref()
      .map(str::trim)
      .filter(|k| !k.is_empty())
      .ok_or_else(|| SendError::Config("resend api key not configured".into()))
  }
}

impl Transport for ResendTransport {
  async fn send(&self, message: &OutboundMessage) -> Result<(), SendError> {
    let api_key = self.api_key()?;

    let body = SendRequest {
      from:    &self.config.from,
      to:      &message.recipient,
      subject: &message.subject,
      html:    &message.body,
    };

    let resp = self
      .client
      .post(&self.config.endpoint)
      .bearer_auth(api_key)
      .json(&body)
      .send()
      .await
      .map_err(|e| SendError::Transport(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
      let text = resp.text().await.unwrap_or_default();
      tracing::debug!(status = status.as_u16(), "resend rejected message");
      return Err(SendError::Rejected {
        service: SERVICE.into(),
        status:  status.as_u16(),
        body:    text,
      });
    }

    Ok(())
  }
}
