//! Internal user ids and the external ids correlated with them.
//!
//! An identity with no correlated ids is still valid: a staff member with no
//! student record has only a `uid`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Minimum length of a Campus Solutions id. Shorter ids are legacy ids.
pub const CAMPUS_SOLUTIONS_ID_MIN_LEN: usize = 10;

/// Opaque internal user identifier.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
  pub fn new(uid: impl Into<String>) -> Self { Self(uid.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Uid {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for Uid {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for Uid {
  fn from(s: String) -> Self { Self(s) }
}

/// External ids correlated with a [`Uid`] by the crosswalk service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelatedIds {
  pub student_id:          Option<String>,
  pub campus_solutions_id: Option<String>,
  pub delegate_user_id:    Option<String>,
}

/// Campus Solutions students are identified by ids of ten or more digits.
pub fn is_campus_solutions_id(id: &str) -> bool {
  id.len() >= CAMPUS_SOLUTIONS_ID_MIN_LEN
}
