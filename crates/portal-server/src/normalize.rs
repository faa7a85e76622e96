//! Turn raw upstream records into [`AttributeBag`]s.
//!
//! Values are copied through unvalidated; the reconciler decides what to
//! trust.

use std::str::FromStr;

use portal_core::{
  affiliation::{DirectoryRecord, RawAffiliation},
  attributes::{AttributeBag, Field},
  identity::CorrelatedIds,
  roles::{RoleSet, classify, classify_directory},
};
use serde_json::{Map, Value};

// ─── Legacy ───────────────────────────────────────────────────────────────────

/// A legacy record: attribute fields by snake_case name, plus either a
/// `roles` map or a `directory` record to classify (or both, in which case
/// the directory can only add roles).
pub fn legacy_bag(record: &Map<String, Value>) -> AttributeBag {
  let mut bag = AttributeBag::new();
  for (key, value) in record {
    if let Ok(field) = Field::from_str(key) {
      bag.fields.insert(field, value.clone());
    }
  }

  let mut roles = record.get("roles").map(RoleSet::from_value).unwrap_or_default();
  if let Some(directory) = directory_record(record) {
    roles.extend_granted(&classify_directory(&directory));
  }
  bag.with_roles(roles)
}

/// The `directory` member of a legacy record, if present and well formed.
pub fn directory_record(record: &Map<String, Value>) -> Option<DirectoryRecord> {
  record
    .get("directory")
    .and_then(|value| serde_json::from_value(value.clone()).ok())
}

// ─── Modern ───────────────────────────────────────────────────────────────────

/// A student record: typed `names`, `emails`, and `affiliations` lists.
///
/// The preferred (`PRF`) name supplies the display names, falling back to
/// the primary (`PRI`) name; given and family names always come from the
/// primary name. Ids are taken from the crosswalk.
pub fn modern_bag(student: &Value, ids: Option<&CorrelatedIds>) -> AttributeBag {
  let mut bag = AttributeBag::new();

  let names = list(student, "names");
  if let Some(primary) = typed(names, "PRI") {
    copy(&mut bag, primary, "givenName", Field::GivenName);
    copy(&mut bag, primary, "familyName", Field::FamilyName);
  }
  if let Some(display) = typed(names, "PRF").or_else(|| typed(names, "PRI")) {
    copy(&mut bag, display, "givenName", Field::FirstName);
    copy(&mut bag, display, "familyName", Field::LastName);
    copy(&mut bag, display, "formattedName", Field::PersonName);
  }

  for email in list(student, "emails") {
    if email.get("primary").and_then(Value::as_bool) == Some(true) {
      copy(&mut bag, email, "emailAddress", Field::EmailAddress);
    }
    if type_code(email).is_some_and(|code| code.eq_ignore_ascii_case("CAMP")) {
      copy(&mut bag, email, "emailAddress", Field::OfficialBmailAddress);
    }
  }

  if let Some(ids) = ids {
    let correlated = [
      (Field::StudentId, &ids.student_id),
      (Field::CampusSolutionsId, &ids.campus_solutions_id),
      (Field::DelegateUserId, &ids.delegate_user_id),
    ];
    for (field, id) in correlated {
      if let Some(id) = id {
        bag.fields.insert(field, Value::String(id.clone()));
      }
    }
  }

  bag.with_roles(classify(&record_affiliations(student)))
}

/// The raw affiliations of a student record.
pub fn record_affiliations(student: &Value) -> Vec<RawAffiliation> {
  student
    .get("affiliations")
    .map(RawAffiliation::parse_list)
    .unwrap_or_default()
}

/// Records may arrive wrapped as `{"student": {...}}`.
pub fn unwrap_student(record: &Value) -> &Value { record.get("student").unwrap_or(record) }

fn list<'a>(value: &'a Value, key: &str) -> &'a [Value] {
  value
    .get(key)
    .and_then(Value::as_array)
    .map(Vec::as_slice)
    .unwrap_or_default()
}

fn type_code(value: &Value) -> Option<&str> { value.get("type")?.get("code")?.as_str() }

fn typed<'a>(items: &'a [Value], code: &str) -> Option<&'a Value> {
  items
    .iter()
    .find(|item| type_code(item).is_some_and(|c| c.eq_ignore_ascii_case(code)))
}

fn copy(bag: &mut AttributeBag, from: &Value, key: &str, field: Field) {
  if let Some(value) = from.get(key) {
    bag.fields.insert(field, value.clone());
  }
}
