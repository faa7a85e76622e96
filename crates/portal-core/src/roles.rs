//! RoleClassifier: canonical role flags derived from raw affiliations.
//!
//! Role flags are always recomputed from upstream affiliations; they are never
//! stored as a source of truth. Only roles licensed by a matched rule are ever
//! set, and a malformed affiliation is skipped rather than failing the pass.

use std::{collections::BTreeMap, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::affiliation::{
  ACTIVE_STATUS, DirectoryRecord, RawAffiliation, parse_directory_timestamp,
};

// ─── Role ────────────────────────────────────────────────────────────────────

/// The fixed enumeration of canonical roles.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Role {
  Student,
  ExStudent,
  Registered,
  Undergrad,
  Graduate,
  Law,
  Faculty,
  Staff,
  Advisor,
  Applicant,
  Guest,
  ConcurrentEnrollmentStudent,
}

/// Roles the modern source is trusted to contribute during the split-brain
/// merge.
pub const MODERN_ROLE_WHITELIST: [Role; 3] =
  [Role::Student, Role::Applicant, Role::Advisor];

// ─── RoleSet ─────────────────────────────────────────────────────────────────

/// Mapping from [`Role`] to a flag. Absent roles read as `false`.
///
/// Ordered, so that serialisation is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeMap<Role, bool>);

impl RoleSet {
  pub fn new() -> Self { Self::default() }

  pub fn get(&self, role: Role) -> bool {
    self.0.get(&role).copied().unwrap_or(false)
  }

  pub fn set(&mut self, role: Role, value: bool) { self.0.insert(role, value); }

  pub fn grant(&mut self, role: Role) { self.set(role, true); }

  pub fn remove(&mut self, role: Role) -> Option<bool> { self.0.remove(&role) }

  /// The value recorded for `role`, distinguishing "absent" from `false`.
  pub fn recorded(&self, role: Role) -> Option<bool> { self.0.get(&role).copied() }

  /// True when no flag is set to `true`.
  pub fn is_empty(&self) -> bool { !self.0.values().any(|v| *v) }

  /// Roles whose flag is `true`, in enumeration order.
  pub fn granted(&self) -> Vec<Role> {
    self
      .0
      .iter()
      .filter_map(|(role, set)| set.then_some(*role))
      .collect()
  }

  /// Copy recorded values (including explicit `false`) for the given roles
  /// from `other`, overwriting ours.
  pub fn overlay(&mut self, other: &RoleSet, roles: &[Role]) {
    for role in roles {
      if let Some(value) = other.recorded(*role) {
        self.set(*role, value);
      }
    }
  }

  /// Union of granted roles.
  pub fn extend_granted(&mut self, other: &RoleSet) {
    for role in other.granted() {
      self.grant(role);
    }
  }
}

impl FromIterator<Role> for RoleSet {
  fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
    let mut set = RoleSet::new();
    for role in iter {
      set.grant(role);
    }
    set
  }
}

/// Lenient: a role map from an upstream may be an error payload or carry
/// unknown keys and non-boolean values. Anything unrecognised is dropped.
impl<'de> Deserialize<'de> for RoleSet {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(RoleSet::from_value(&value))
  }
}

impl RoleSet {
  pub fn from_value(value: &serde_json::Value) -> Self {
    let mut set = RoleSet::new();
    if let Some(map) = value.as_object() {
      for (key, flag) in map {
        if let (Ok(role), Some(flag)) = (Role::from_str(key), flag.as_bool()) {
          set.set(role, flag);
        }
      }
    }
    set
  }
}

// ─── Student-record affiliations ─────────────────────────────────────────────

/// Classify affiliations from the student record service, evaluated today.
pub fn classify(affiliations: &[RawAffiliation]) -> RoleSet {
  classify_at(affiliations, Utc::now().date_naive())
}

/// Classify affiliations from the student record service as of `today`.
///
/// An `ACT` affiliation whose `toDate` is before `today` counts as inactive.
pub fn classify_at(affiliations: &[RawAffiliation], today: NaiveDate) -> RoleSet {
  let mut roles = RoleSet::new();
  let mut student_active = false;
  let mut student_inactive = false;

  for affiliation in affiliations {
    let (Some(code), Some(status)) =
      (affiliation.type_code(), affiliation.status_code())
    else {
      continue;
    };
    let active = status == ACTIVE_STATUS
      && affiliation.to_date().is_none_or(|end| end >= today);

    match (code.as_str(), active) {
      ("STUDENT", true) => student_active = true,
      ("STUDENT", false) => student_inactive = true,
      ("UNDERGRAD", true) => roles.grant(Role::Undergrad),
      ("GRADUATE", true) => roles.grant(Role::Graduate),
      ("LAW", true) => roles.grant(Role::Law),
      ("INSTRUCTOR", true) => roles.grant(Role::Faculty),
      ("ADVISOR", true) => roles.grant(Role::Advisor),
      // Released admits only. A bare APPLICANT is still in process.
      ("ADMT_UX", true) => roles.grant(Role::Applicant),
      _ => {}
    }
  }

  if student_active {
    roles.grant(Role::Student);
  } else if student_inactive {
    roles.grant(Role::ExStudent);
  }
  roles
}

/// True if any affiliation is an active `APPLICANT`.
pub fn applicant_in_process(affiliations: &[RawAffiliation]) -> bool {
  affiliations.iter().any(|a| {
    a.type_code().as_deref() == Some("APPLICANT")
      && a.status_code().as_deref() == Some(ACTIVE_STATUS)
  })
}

// ─── Directory affiliations ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
  Student,
  Employee,
  Affiliate,
  Guest,
}

impl Category {
  const ALL: [Category; 4] = [
    Category::Student,
    Category::Employee,
    Category::Affiliate,
    Category::Guest,
  ];

  fn prefix(self) -> &'static str {
    match self {
      Category::Student => "STUDENT",
      Category::Employee => "EMPLOYEE",
      Category::Affiliate => "AFFILIATE",
      Category::Guest => "GUEST",
    }
  }

  fn exp_dates(self, record: &DirectoryRecord) -> &[String] {
    match self {
      Category::Student => &record.student_exp_dates,
      Category::Employee => &record.employee_exp_dates,
      Category::Affiliate => &record.affiliate_exp_dates,
      Category::Guest => &[],
    }
  }

  fn grant_type(self, type_name: &str, roles: &mut RoleSet) {
    match (self, type_name) {
      (Category::Student, "REGISTERED") => {
        roles.grant(Role::Student);
        roles.grant(Role::Registered);
      }
      (Category::Student, _) => roles.grant(Role::Student),
      (Category::Employee, "STAFF") => roles.grant(Role::Staff),
      (Category::Employee, "ACADEMIC") => roles.grant(Role::Faculty),
      (Category::Affiliate, "CONCURR ENROLL") => {
        roles.grant(Role::ConcurrentEnrollmentStudent)
      }
      (Category::Guest, _) => roles.grant(Role::Guest),
      _ => {}
    }
  }
}

/// Classify a directory record (affiliations and group memberships) now.
pub fn classify_directory(record: &DirectoryRecord) -> RoleSet {
  classify_directory_at(record, Utc::now())
}

/// Classify a directory record as of `now`.
///
/// An `EXPIRED` status marker is overridden when the category still carries a
/// `TYPE` entry and its latest expiration is unspecified or in the future; the
/// category is otherwise revoked, and a revoked student becomes an ex-student.
pub fn classify_directory_at(record: &DirectoryRecord, now: DateTime<Utc>) -> RoleSet {
  let mut roles = RoleSet::new();

  for category in Category::ALL {
    let prefix = category.prefix();
    let type_prefix = format!("{prefix}-TYPE-");
    let expired_marker = format!("{prefix}-STATUS-EXPIRED");

    let types: Vec<&str> = record
      .affiliations
      .iter()
      .filter_map(|a| a.trim().strip_prefix(type_prefix.as_str()))
      .collect();
    let expired = record
      .affiliations
      .iter()
      .any(|a| a.trim() == expired_marker);

    let active = if expired {
      let latest_expiration = category
        .exp_dates(record)
        .iter()
        .filter_map(|raw| parse_directory_timestamp(raw).ok())
        .max();
      !types.is_empty() && latest_expiration.is_none_or(|at| at > now)
    } else {
      true
    };

    if active {
      for type_name in types {
        category.grant_type(type_name, &mut roles);
      }
    } else if category == Category::Student {
      roles.grant(Role::ExStudent);
    }
  }

  roles.extend_granted(&classify_groups(&record.groups));
  roles
}

/// Classify official student group memberships such as
/// `cn=edu:berkeley:official:students:undergrad,ou=campus groups,dc=…`.
pub fn classify_groups(groups: &[String]) -> RoleSet {
  let mut roles = RoleSet::new();
  for group in groups {
    let Some(cn) = group
      .split(',')
      .next()
      .and_then(|rdn| rdn.trim().strip_prefix("cn="))
    else {
      continue;
    };
    let segments: Vec<&str> = cn.split(':').collect();
    let [.., "official", "students", population] = segments.as_slice() else {
      continue;
    };
    match *population {
      "all" => roles.grant(Role::Student),
      "undergrad" => roles.grant(Role::Undergrad),
      "graduate" => roles.grant(Role::Graduate),
      "law" => roles.grant(Role::Law),
      _ => {}
    }
  }
  roles
}
