//! Attribute bags: the normalised per-source view of one identity.
//!
//! Values are kept as raw JSON because the modern source is untrusted: a field
//! may carry an error payload instead of a string. Values are type-checked
//! against [`Field::format`] only at reconciliation time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{Error, Result, roles::RoleSet};

/// Attributes a source may report.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Field {
  PersonName,
  FirstName,
  LastName,
  GivenName,
  FamilyName,
  StudentId,
  CampusSolutionsId,
  DelegateUserId,
  EmailAddress,
  OfficialBmailAddress,
  EducationAbroad,
  CalResidencyFlag,
}

/// Type contract for a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Format {
  /// A non-blank string.
  String,
  /// A string of decimal digits.
  NumericString,
  Boolean,
}

impl Field {
  pub fn format(self) -> Format {
    match self {
      Field::StudentId => Format::NumericString,
      Field::EducationAbroad => Format::Boolean,
      _ => Format::String,
    }
  }
}

/// Check `value` against `field`'s contract, returning it unchanged on success.
pub fn validate(field: Field, value: &Value) -> Result<Value> {
  let expected = field.format();
  let ok = match expected {
    Format::String => value.as_str().is_some_and(|s| !s.trim().is_empty()),
    Format::NumericString => value.as_str().is_some_and(|s| {
      !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
    }),
    Format::Boolean => value.is_boolean(),
  };
  if ok {
    Ok(value.clone())
  } else {
    Err(Error::InvalidAttribute {
      field,
      expected,
      got: value.clone(),
    })
  }
}

/// One source's answer for one identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeBag {
  #[serde(default)]
  pub fields: BTreeMap<Field, Value>,
  #[serde(default)]
  pub roles:  RoleSet,
}

impl AttributeBag {
  pub fn new() -> Self { Self::default() }

  pub fn with(mut self, field: Field, value: impl Into<Value>) -> Self {
    self.fields.insert(field, value.into());
    self
  }

  pub fn with_roles(mut self, roles: RoleSet) -> Self {
    self.roles = roles;
    self
  }

  pub fn get(&self, field: Field) -> Option<&Value> {
    self.fields.get(&field).filter(|v| !v.is_null())
  }

  /// The field as a string, without validation.
  pub fn get_str(&self, field: Field) -> Option<&str> {
    self.get(field).and_then(Value::as_str)
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn string_fields_must_be_non_blank() {
    assert!(validate(Field::PersonName, &json!("Sid Vicious")).is_ok());
    assert!(validate(Field::PersonName, &json!("  ")).is_err());
    assert!(validate(Field::PersonName, &json!({"statusCode": 503})).is_err());
  }

  #[test]
  fn student_id_must_be_numeric() {
    assert!(validate(Field::StudentId, &json!("18551926")).is_ok());
    assert!(validate(Field::StudentId, &json!("CC123")).is_err());
    assert!(validate(Field::StudentId, &json!(18551926)).is_err());
  }

  #[test]
  fn campus_solutions_id_is_a_plain_string() {
    assert!(validate(Field::CampusSolutionsId, &json!("CC12345678")).is_ok());
  }

  #[test]
  fn validation_error_names_the_field() {
    let err = validate(Field::StudentId, &json!({"body": "oops"})).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("student_id"));
    assert!(message.contains("numeric_string"));
  }

  #[test]
  fn bag_deserialises_from_snake_case_keys() {
    let bag: AttributeBag = serde_json::from_value(json!({
      "fields": { "person_name": "Eugene V Debs", "student_id": "18551926" },
      "roles": { "student": true }
    }))
    .unwrap();
    assert_eq!(bag.get_str(Field::PersonName), Some("Eugene V Debs"));
    assert!(bag.roles.get(crate::roles::Role::Student));
  }
}
