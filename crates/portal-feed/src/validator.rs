//! AuthenticationValidator: keeps held applicants out.
//!
//! An admitted applicant whose admission has not been released still signs in
//! through single sign-on. Such a "held" identity is treated as if no user
//! id had been supplied. Decisions are cached; a held decision for a short
//! time so that a release takes effect quickly.

use std::time::Duration;

use portal_core::{
  identity::Uid,
  roles::{applicant_in_process, classify},
  source::{CacheGate, CampusSystems, Lookup},
};

use crate::{cache::keys, fanout::bounded};

const HELD: &str = "held";
const CLEAR: &str = "clear";

/// Directory affiliations that do not vouch for the identity by themselves.
const UNVOUCHED_DIRECTORY_AFFILIATIONS: [&str; 2] =
  ["STUDENT-TYPE-NOT REGISTERED", "STUDENT-TYPE-NOT-REGISTERED"];

pub struct AuthenticationValidator<'a, C, G> {
  pub systems:  &'a C,
  pub cache:    &'a G,
  pub enabled:  bool,
  pub timeout:  Duration,
  pub ttl:      Duration,
  pub held_ttl: Duration,
}

impl<C: CampusSystems, G: CacheGate> AuthenticationValidator<'_, C, G> {
  /// `uid` if it may sign in, `None` for a held applicant.
  pub async fn validated_uid(&self, uid: &Uid) -> Option<Uid> {
    if self.enabled && self.cached_held_applicant(uid).await {
      None
    } else {
      Some(uid.clone())
    }
  }

  async fn cached_held_applicant(&self, uid: &Uid) -> bool {
    let key = keys::auth_validation(uid);
    if let Some(entry) = self.cache.read(&key).await {
      return entry == HELD;
    }

    let held = self.held_applicant(uid).await;
    if held {
      tracing::warn!(%uid, "held applicant will be treated as unauthenticated");
      self.cache.write(&key, HELD.to_owned(), self.held_ttl).await;
    } else {
      self.cache.write(&key, CLEAR.to_owned(), self.ttl).await;
    }
    held
  }

  async fn held_applicant(&self, uid: &Uid) -> bool {
    // The directory answers faster than the student record service.
    let directory = bounded(
      "directory",
      uid,
      self.timeout,
      self.systems.directory_record(uid),
    )
    .await;
    if let Lookup::Found(record) = &directory {
      let vouched = record
        .affiliations
        .iter()
        .any(|a| !UNVOUCHED_DIRECTORY_AFFILIATIONS.contains(&a.trim()));
      if vouched {
        return false;
      }
    }

    match bounded(
      "record_affiliations",
      uid,
      self.timeout,
      self.systems.record_affiliations(uid),
    )
    .await
    {
      Lookup::Found(affiliations) => {
        applicant_in_process(&affiliations) && classify(&affiliations).is_empty()
      }
      // Nothing known about this person, but nothing says they are held.
      _ => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use portal_core::affiliation::{DirectoryRecord, RawAffiliation};

  use super::*;
  use crate::{MemoryCache, memory::MemorySystems};

  fn validator<'a>(
    systems: &'a MemorySystems,
    cache: &'a MemoryCache,
  ) -> AuthenticationValidator<'a, MemorySystems, MemoryCache> {
    AuthenticationValidator {
      systems,
      cache,
      enabled: true,
      timeout: Duration::from_secs(1),
      ttl: Duration::from_secs(60),
      held_ttl: Duration::from_secs(5),
    }
  }

  fn applicant() -> Vec<RawAffiliation> {
    vec![RawAffiliation::new("APPLICANT", "ACT")]
  }

  #[tokio::test]
  async fn held_applicant_is_blanked() {
    let mut systems = MemorySystems::new();
    systems
      .record_affiliations
      .insert("61889".into(), Lookup::Found(applicant()));
    let cache = MemoryCache::new();
    let v = validator(&systems, &cache);
    assert_eq!(v.validated_uid(&"61889".into()).await, None);
    assert_eq!(
      cache.read(&keys::auth_validation(&"61889".into())).await.as_deref(),
      Some(HELD)
    );
  }

  #[tokio::test]
  async fn released_admit_is_not_held() {
    let mut systems = MemorySystems::new();
    let mut affiliations = applicant();
    affiliations.push(RawAffiliation::new("ADMT_UX", "ACT"));
    systems
      .record_affiliations
      .insert("61889".into(), Lookup::Found(affiliations));
    let cache = MemoryCache::new();
    let v = validator(&systems, &cache);
    assert_eq!(v.validated_uid(&"61889".into()).await, Some("61889".into()));
  }

  #[tokio::test]
  async fn registered_directory_entry_vouches() {
    let mut systems = MemorySystems::new();
    systems.directory.insert(
      "61889".into(),
      Lookup::Found(DirectoryRecord {
        affiliations: vec!["STUDENT-TYPE-REGISTERED".into()],
        ..Default::default()
      }),
    );
    systems
      .record_affiliations
      .insert("61889".into(), Lookup::Found(applicant()));
    let cache = MemoryCache::new();
    let v = validator(&systems, &cache);
    assert!(v.validated_uid(&"61889".into()).await.is_some());
  }

  #[tokio::test]
  async fn not_registered_directory_entry_does_not_vouch() {
    let mut systems = MemorySystems::new();
    systems.directory.insert(
      "61889".into(),
      Lookup::Found(DirectoryRecord {
        affiliations: vec!["STUDENT-TYPE-NOT REGISTERED".into()],
        ..Default::default()
      }),
    );
    systems
      .record_affiliations
      .insert("61889".into(), Lookup::Found(applicant()));
    let cache = MemoryCache::new();
    assert!(validator(&systems, &cache).validated_uid(&"61889".into()).await.is_none());
  }

  #[tokio::test]
  async fn disabled_validator_admits_everyone() {
    let mut systems = MemorySystems::new();
    systems
      .record_affiliations
      .insert("61889".into(), Lookup::Found(applicant()));
    let cache = MemoryCache::new();
    let mut v = validator(&systems, &cache);
    v.enabled = false;
    assert!(v.validated_uid(&"61889".into()).await.is_some());
  }

  #[tokio::test]
  async fn cached_decision_is_reused() {
    let systems = MemorySystems::new();
    let cache = MemoryCache::new();
    cache
      .write(&keys::auth_validation(&"61889".into()), HELD.into(), Duration::from_secs(60))
      .await;
    let v = validator(&systems, &cache);
    assert!(v.validated_uid(&"61889".into()).await.is_none());
  }
}
