//! Feature flags, passed explicitly into reconciliation and composition.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
  /// Read profile attributes from the modern student record service.
  pub cs_profile:                          bool,
  /// Enable delegated (parent/guardian) access.
  pub cs_delegated_access:                 bool,
  /// Show the modern profile to students who only hold a legacy id.
  pub cs_profile_visible_for_legacy_users: bool,
  /// Treat held applicants as unauthenticated.
  pub authentication_validator:            bool,
}

impl Default for FeatureFlags {
  fn default() -> Self {
    Self {
      cs_profile:                          true,
      cs_delegated_access:                 true,
      cs_profile_visible_for_legacy_users: false,
      authentication_validator:            false,
    }
  }
}
