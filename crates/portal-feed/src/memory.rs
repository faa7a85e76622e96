//! In-memory [`CampusSystems`], keyed by uid.
//!
//! Anything not inserted reads as [`Lookup::NotFound`]. An optional delay
//! on the modern source stands in for a slow upstream, and the offline
//! switch for an outage of every other system.

use std::{
  collections::HashMap,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::Duration,
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

type Table<T> = HashMap<Uid, Lookup<T>>;

fn lookup<T: Clone>(table: &Table<T>, uid: &Uid) -> Lookup<T> {
  table.get(uid).cloned().unwrap_or(Lookup::NotFound)
}

#[derive(Debug, Default)]
pub struct MemorySource {
  name:  &'static str,
  bags:  Table<AttributeBag>,
  delay: Option<Duration>,
}

impl MemorySource {
  pub fn new(name: &'static str) -> Self {
    Self {
      name,
      ..Default::default()
    }
  }

  pub fn insert(&mut self, uid: impl Into<Uid>, answer: Lookup<AttributeBag>) {
    self.bags.insert(uid.into(), answer);
  }

  /// Delay every answer by `delay`.
  pub fn set_delay(&mut self, delay: Duration) { self.delay = Some(delay); }
}

impl AttributeSource for MemorySource {
  fn name(&self) -> &'static str { self.name }

  async fn fetch(&self, uid: &Uid) -> Lookup<AttributeBag> {
    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }
    lookup(&self.bags, uid)
  }
}

#[derive(Debug)]
pub struct MemorySystems {
  pub legacy:              MemorySource,
  pub modern:              MemorySource,
  pub crosswalk:           Table<CorrelatedIds>,
  pub delegates:           Table<Vec<DelegateStudent>>,
  pub auth:                Table<UserAuth>,
  pub history:             Table<CourseHistory>,
  pub accounts:            Table<LinkedAccounts>,
  pub academics:           Table<AcademicsFeed>,
  pub directory:           Table<DirectoryRecord>,
  pub record_affiliations: Table<Vec<RawAffiliation>>,
  offline:                 Arc<AtomicBool>,
}

impl Default for MemorySystems {
  fn default() -> Self {
    Self {
      legacy:              MemorySource::new("legacy"),
      modern:              MemorySource::new("modern"),
      crosswalk:           HashMap::new(),
      delegates:           HashMap::new(),
      auth:                HashMap::new(),
      history:             HashMap::new(),
      accounts:            HashMap::new(),
      academics:           HashMap::new(),
      directory:           HashMap::new(),
      record_affiliations: HashMap::new(),
      offline:             Arc::default(),
    }
  }
}

impl MemorySystems {
  pub fn new() -> Self { Self::default() }

  /// While set, every lookup other than the attribute sources errors.
  pub fn offline_switch(&self) -> Arc<AtomicBool> { Arc::clone(&self.offline) }

  fn lookup<T: Clone>(&self, table: &Table<T>, uid: &Uid) -> Lookup<T> {
    if self.offline.load(Ordering::SeqCst) {
      return Lookup::Errored("offline".into());
    }
    lookup(table, uid)
  }
}

impl CrosswalkLookup for MemorySystems {
  async fn correlated_ids(&self, uid: &Uid) -> Lookup<CorrelatedIds> {
    self.lookup(&self.crosswalk, uid)
  }
}

impl DelegateStudentLookup for MemorySystems {
  async fn delegate_students(&self, actor: &Uid) -> Lookup<Vec<DelegateStudent>> {
    self.lookup(&self.delegates, actor)
  }
}

impl CampusSystems for MemorySystems {
  type Legacy = MemorySource;
  type Modern = MemorySource;

  fn legacy(&self) -> &MemorySource { &self.legacy }

  fn modern(&self) -> &MemorySource { &self.modern }

  async fn user_auth(&self, uid: &Uid) -> Lookup<UserAuth> { self.lookup(&self.auth, uid) }

  async fn course_history(&self, uid: &Uid) -> Lookup<CourseHistory> {
    self.lookup(&self.history, uid)
  }

  async fn linked_accounts(&self, uid: &Uid) -> Lookup<LinkedAccounts> {
    self.lookup(&self.accounts, uid)
  }

  async fn academics(&self, uid: &Uid) -> Lookup<AcademicsFeed> {
    self.lookup(&self.academics, uid)
  }

  async fn directory_record(&self, uid: &Uid) -> Lookup<DirectoryRecord> {
    self.lookup(&self.directory, uid)
  }

  async fn record_affiliations(&self, uid: &Uid) -> Lookup<Vec<RawAffiliation>> {
    self.lookup(&self.record_affiliations, uid)
  }
}
