//! Collaborator traits: upstream campus systems, local storage, and the cache.
//!
//! The traits are implemented outside this crate (fixture adapters in
//! `portal-server`, SQLite in `portal-store-sqlite`, an in-process cache in
//! `portal-feed`). Higher layers depend on these abstractions, not on any
//! concrete backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::{future::Future, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  academics::AcademicsFeed,
  affiliation::{DirectoryRecord, RawAffiliation},
  attributes::AttributeBag,
  delegation::DelegateStudent,
  identity::{CorrelatedIds, Uid},
};

// ─── Upstream outcome ────────────────────────────────────────────────────────

/// Outcome of one upstream call.
///
/// `NotFound` is a legitimate absence; `Errored` covers malformed data,
/// connection failures, and timeouts. Callers recover locally from both.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
  Found(T),
  NotFound,
  Errored(String),
}

impl<T> Lookup<T> {
  pub fn found(&self) -> Option<&T> {
    match self {
      Lookup::Found(value) => Some(value),
      _ => None,
    }
  }

  pub fn into_found(self) -> Option<T> {
    match self {
      Lookup::Found(value) => Some(value),
      _ => None,
    }
  }

  pub fn is_errored(&self) -> bool { matches!(self, Lookup::Errored(_)) }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
    match self {
      Lookup::Found(value) => Lookup::Found(f(value)),
      Lookup::NotFound => Lookup::NotFound,
      Lookup::Errored(details) => Lookup::Errored(details),
    }
  }
}

// ─── Upstream records ────────────────────────────────────────────────────────

/// The acting authority of a user: administrative and view-as permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserAuth {
  pub is_superuser: bool,
  pub is_viewer:    bool,
  pub active:       bool,
}

impl UserAuth {
  /// Public permissions only.
  pub fn public() -> Self { Self::default() }

  pub fn can_administrate(&self) -> bool { self.active && self.is_superuser }

  pub fn can_view_as(&self) -> bool {
    self.active && (self.is_superuser || self.is_viewer)
  }
}

/// Whether the identity ever took or taught a course.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseHistory {
  pub has_student_history:    bool,
  pub has_instructor_history: bool,
}

/// Existence of accounts in external systems.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkedAccounts {
  pub has_canvas_account:      bool,
  pub has_google_access_token: bool,
  pub google_email:            Option<String>,
  pub canvas_email:            Option<String>,
}

// ─── Upstream traits ─────────────────────────────────────────────────────────

/// A source of identity attributes (legacy or modern).
pub trait AttributeSource: Send + Sync {
  /// Short name used in log lines.
  fn name(&self) -> &'static str;

  fn fetch<'a>(
    &'a self,
    uid: &'a Uid,
  ) -> impl Future<Output = Lookup<AttributeBag>> + Send + 'a;
}

/// Translates a local identity into the id spaces of other campus systems.
pub trait CrosswalkLookup: Send + Sync {
  fn correlated_ids<'a>(
    &'a self,
    uid: &'a Uid,
  ) -> impl Future<Output = Lookup<CorrelatedIds>> + Send + 'a;
}

/// Lists the students a delegate is authorised for.
pub trait DelegateStudentLookup: Send + Sync {
  fn delegate_students<'a>(
    &'a self,
    actor: &'a Uid,
  ) -> impl Future<Output = Lookup<Vec<DelegateStudent>>> + Send + 'a;
}

/// Every upstream campus system the portal consumes.
pub trait CampusSystems: CrosswalkLookup + DelegateStudentLookup {
  type Legacy: AttributeSource;
  type Modern: AttributeSource;

  fn legacy(&self) -> &Self::Legacy;

  fn modern(&self) -> &Self::Modern;

  fn user_auth<'a>(
    &'a self,
    uid: &'a Uid,
  ) -> impl Future<Output = Lookup<UserAuth>> + Send + 'a;

  fn course_history<'a>(
    &'a self,
    uid: &'a Uid,
  ) -> impl Future<Output = Lookup<CourseHistory>> + Send + 'a;

  fn linked_accounts<'a>(
    &'a self,
    uid: &'a Uid,
  ) -> impl Future<Output = Lookup<LinkedAccounts>> + Send + 'a;

  fn academics<'a>(
    &'a self,
    uid: &'a Uid,
  ) -> impl Future<Output = Lookup<AcademicsFeed>> + Send + 'a;

  /// Raw directory affiliations, uncached.
  fn directory_record<'a>(
    &'a self,
    uid: &'a Uid,
  ) -> impl Future<Output = Lookup<DirectoryRecord>> + Send + 'a;

  /// Raw affiliations from the student record service.
  fn record_affiliations<'a>(
    &'a self,
    uid: &'a Uid,
  ) -> impl Future<Output = Lookup<Vec<RawAffiliation>>> + Send + 'a;
}

// ─── Local storage ───────────────────────────────────────────────────────────

/// The small per-identity record persisted locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
  pub uid:            Uid,
  pub preferred_name: Option<String>,
  pub first_login_at: Option<DateTime<Utc>>,
}

/// Storage for [`UserData`].
pub trait UserDataStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Returns `None` if nothing was ever stored for `uid`.
  fn get_user_data<'a>(
    &'a self,
    uid: &'a Uid,
  ) -> impl Future<Output = Result<Option<UserData>, Self::Error>> + Send + 'a;

  /// Set or clear the preferred-name override, creating the record if
  /// needed. Returns the stored record.
  fn set_preferred_name<'a>(
    &'a self,
    uid: &'a Uid,
    preferred_name: Option<String>,
  ) -> impl Future<Output = Result<UserData, Self::Error>> + Send + 'a;

  /// Record `at` as the first login unless one is already stored. Returns
  /// the stored record.
  fn record_first_login<'a>(
    &'a self,
    uid: &'a Uid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<UserData, Self::Error>> + Send + 'a;

  /// Remove everything stored for `uid`. Returns `false` if nothing was
  /// stored.
  fn delete_user_data<'a>(
    &'a self,
    uid: &'a Uid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}

// ─── Cache ───────────────────────────────────────────────────────────────────

/// Key-value cache with expiry. Keys are `/`-separated paths; invalidating a
/// key also drops every entry beneath it.
pub trait CacheGate: Send + Sync {
  fn read<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Option<String>> + Send + 'a;

  fn write<'a>(
    &'a self,
    key: &'a str,
    value: String,
    ttl: Duration,
  ) -> impl Future<Output = ()> + Send + 'a;

  fn invalidate<'a>(&'a self, key: &'a str) -> impl Future<Output = ()> + Send + 'a;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lookup_map_preserves_failure_kind() {
    let found: Lookup<u8> = Lookup::Found(2);
    assert_eq!(found.map(|n| n * 2), Lookup::Found(4));
    let missing: Lookup<u8> = Lookup::NotFound;
    assert_eq!(missing.map(|n| n * 2), Lookup::NotFound);
    let errored: Lookup<u8> = Lookup::Errored("timeout".into());
    assert!(errored.clone().map(|n| n * 2).is_errored());
    assert!(errored.into_found().is_none());
  }

  #[test]
  fn inactive_authority_has_no_powers() {
    let auth = UserAuth {
      is_superuser: true,
      is_viewer:    true,
      active:       false,
    };
    assert!(!auth.can_administrate());
    assert!(!auth.can_view_as());
    assert!(!UserAuth::public().can_view_as());
  }
}
