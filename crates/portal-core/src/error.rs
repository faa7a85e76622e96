//! Error types for `portal-core`.

use thiserror::Error;

use crate::attributes::{Field, Format};

#[derive(Debug, Error)]
pub enum Error {
  /// A modern-source attribute failed its type contract.
  #[error("attribute {field} failed validation: expected a {expected}, got {got}")]
  InvalidAttribute {
    field:    Field,
    expected: Format,
    got:      serde_json::Value,
  },

  #[error("invalid directory timestamp: {0:?}")]
  InvalidTimestamp(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
