//! The authenticated operator behind a request.

use axum::{extract::FromRequestParts, http::request::Parts};
use beacon_core::audit::Actor;

use crate::ApiError;

/// Inserted into request extensions by the server's auth layer. Handlers
/// that take an `Operator` reject requests without one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
  pub username: String,
}

impl Operator {
  pub fn new(username: impl Into<String>) -> Self {
    Self { username: username.into() }
  }

  /// The operator as an audit actor, identified by username.
  pub fn actor(&self) -> Actor {
    Actor { user_id: Some(self.username.clone()), email: None }
  }
}

impl<St> FromRequestParts<St> for Operator
where
  St: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &St,
  ) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<Operator>()
      .cloned()
      .ok_or(ApiError::Unauthorized)
  }
}
