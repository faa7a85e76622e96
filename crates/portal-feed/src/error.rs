//! Error type for `portal-feed`.
//!
//! Upstream failures never surface here; they degrade the affected section
//! of the feed instead. What remains is what the caller must act on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// No user id, or the user id was rejected by the authentication
  /// validator.
  #[error("not authenticated")]
  Unauthenticated,

  #[error("forbidden: {0}")]
  Forbidden(&'static str),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
