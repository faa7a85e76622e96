//! Fixture-backed campus systems.
//!
//! Each collaborator reads `<root>/<kind>/<uid>.json`:
//!
//! | Kind         | Content |
//! |--------------|---------|
//! | `legacy`     | flat attribute record with `roles` and/or `directory` |
//! | `modern`     | student record (`names`, `emails`, `affiliations`) |
//! | `crosswalk`  | correlated ids |
//! | `delegates`  | `{"students": [...]}` |
//! | `auth`       | authority record |
//! | `history`    | course history |
//! | `accounts`   | linked accounts |
//! | `academics`  | academics feed |
//!
//! A missing file is [`Lookup::NotFound`]; an unreadable or malformed one
//! is [`Lookup::Errored`].

use std::{
  io::ErrorKind,
  path::{Path, PathBuf},
};

use portal_core::{
  academics::AcademicsFeed,
  affiliation::{DirectoryRecord, RawAffiliation},
  attributes::AttributeBag,
  delegation::DelegateStudent,
  identity::{CorrelatedIds, Uid},
  source::{
    AttributeSource, CampusSystems, CourseHistory, CrosswalkLookup,
    DelegateStudentLookup, LinkedAccounts, Lookup, UserAuth,
  },
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::normalize;

// ─── Reading ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct FixtureDir {
  root: PathBuf,
}

impl FixtureDir {
  /// Only plain ids map to files; anything else cannot name a fixture.
  fn path(&self, kind: &str, uid: &Uid) -> Option<PathBuf> {
    let plain = !uid.as_str().is_empty()
      && uid
        .as_str()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    plain.then(|| self.root.join(kind).join(format!("{uid}.json")))
  }

  async fn read<T: DeserializeOwned>(&self, kind: &'static str, uid: &Uid) -> Lookup<T> {
    let Some(path) = self.path(kind, uid) else {
      return Lookup::NotFound;
    };
    let bytes = match tokio::fs::read(&path).await {
      Ok(bytes) => bytes,
      Err(e) if e.kind() == ErrorKind::NotFound => return Lookup::NotFound,
      Err(e) => return Lookup::Errored(format!("{}: {e}", path.display())),
    };
    match serde_json::from_slice(&bytes) {
      Ok(value) => Lookup::Found(value),
      Err(e) => {
        tracing::warn!(%uid, source = kind, error = %e, "malformed fixture");
        Lookup::Errored(format!("{}: {e}", path.display()))
      }
    }
  }
}

// ─── Attribute sources ────────────────────────────────────────────────────────

/// Legacy campus directory and student-system attributes.
#[derive(Debug, Clone)]
pub struct LegacyFixtures {
  dir: FixtureDir,
}

impl LegacyFixtures {
  async fn record(&self, uid: &Uid) -> Lookup<Map<String, Value>> {
    self.dir.read("legacy", uid).await
  }
}

impl AttributeSource for LegacyFixtures {
  fn name(&self) -> &'static str { "legacy" }

  async fn fetch(&self, uid: &Uid) -> Lookup<AttributeBag> {
    self.record(uid).await.map(|record| normalize::legacy_bag(&record))
  }
}

/// The modern student record service.
#[derive(Debug, Clone)]
pub struct ModernFixtures {
  dir: FixtureDir,
}

impl ModernFixtures {
  async fn record(&self, uid: &Uid) -> Lookup<Value> { self.dir.read("modern", uid).await }
}

impl AttributeSource for ModernFixtures {
  fn name(&self) -> &'static str { "modern" }

  async fn fetch(&self, uid: &Uid) -> Lookup<AttributeBag> {
    let (record, ids) = tokio::join!(
      self.record(uid),
      self.dir.read::<CorrelatedIds>("crosswalk", uid),
    );
    let ids = ids.into_found();
    record.map(|record| normalize::modern_bag(normalize::unwrap_student(&record), ids.as_ref()))
  }
}

// ─── Campus systems ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct DelegateFixture {
  #[serde(default)]
  students: Vec<DelegateStudent>,
}

#[derive(Debug, Clone)]
pub struct FixtureSystems {
  dir:    FixtureDir,
  legacy: LegacyFixtures,
  modern: ModernFixtures,
}

impl FixtureSystems {
  pub fn new(root: impl AsRef<Path>) -> Self {
    let dir = FixtureDir {
      root: root.as_ref().to_path_buf(),
    };
    Self {
      legacy: LegacyFixtures { dir: dir.clone() },
      modern: ModernFixtures { dir: dir.clone() },
      dir,
    }
  }
}

impl CrosswalkLookup for FixtureSystems {
  async fn correlated_ids(&self, uid: &Uid) -> Lookup<CorrelatedIds> {
    self.dir.read("crosswalk", uid).await
  }
}

impl DelegateStudentLookup for FixtureSystems {
  async fn delegate_students(&self, actor: &Uid) -> Lookup<Vec<DelegateStudent>> {
    self
      .dir
      .read::<DelegateFixture>("delegates", actor)
      .await
      .map(|fixture| fixture.students)
  }
}

impl CampusSystems for FixtureSystems {
  type Legacy = LegacyFixtures;
  type Modern = ModernFixtures;

  fn legacy(&self) -> &LegacyFixtures { &self.legacy }

  fn modern(&self) -> &ModernFixtures { &self.modern }

  async fn user_auth(&self, uid: &Uid) -> Lookup<UserAuth> { self.dir.read("auth", uid).await }

  async fn course_history(&self, uid: &Uid) -> Lookup<CourseHistory> {
    self.dir.read("history", uid).await
  }

  async fn linked_accounts(&self, uid: &Uid) -> Lookup<LinkedAccounts> {
    self.dir.read("accounts", uid).await
  }

  async fn academics(&self, uid: &Uid) -> Lookup<AcademicsFeed> {
    self.dir.read("academics", uid).await
  }

  /// The `directory` member of the legacy record.
  async fn directory_record(&self, uid: &Uid) -> Lookup<DirectoryRecord> {
    match self.legacy.record(uid).await {
      Lookup::Found(record) => normalize::directory_record(&record)
        .map_or(Lookup::NotFound, Lookup::Found),
      Lookup::NotFound => Lookup::NotFound,
      Lookup::Errored(details) => Lookup::Errored(details),
    }
  }

  /// The `affiliations` of the modern student record.
  async fn record_affiliations(&self, uid: &Uid) -> Lookup<Vec<RawAffiliation>> {
    self
      .modern
      .record(uid)
      .await
      .map(|record| normalize::record_affiliations(normalize::unwrap_student(&record)))
  }
}
