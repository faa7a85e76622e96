//! Raw affiliation records as produced by upstream sources.
//!
//! Two input shapes exist: the structured affiliation list of the student
//! record service ([`RawAffiliation`]) and the flat string affiliations of the
//! campus directory ([`DirectoryRecord`]). Both are consumed only by
//! [`crate::roles`]; neither is ever mutated.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Status code of an active affiliation.
pub const ACTIVE_STATUS: &str = "ACT";

/// Format of directory expiration timestamps, e.g. `20140901145959Z`.
pub const DIRECTORY_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%SZ";

// ─── Structured affiliations ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDescription {
  #[serde(default)]
  pub code:        Option<String>,
  #[serde(default)]
  pub description: Option<String>,
}

/// One affiliation from the student record service.
///
/// `type` and `status` are optional so that malformed entries deserialise and
/// can be skipped by the classifier rather than failing the whole list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAffiliation {
  #[serde(rename = "type", default)]
  pub kind:      Option<CodeDescription>,
  #[serde(default)]
  pub status:    Option<CodeDescription>,
  #[serde(default)]
  pub from_date: Option<String>,
  #[serde(default)]
  pub to_date:   Option<String>,
}

impl RawAffiliation {
  /// Convenience constructor used by adapters and tests.
  pub fn new(kind: &str, status: &str) -> Self {
    Self {
      kind:      Some(CodeDescription {
        code:        Some(kind.to_owned()),
        description: None,
      }),
      status:    Some(CodeDescription {
        code:        Some(status.to_owned()),
        description: None,
      }),
      from_date: None,
      to_date:   None,
    }
  }

  /// The affiliation type code, upper-cased. `None` if malformed.
  pub fn type_code(&self) -> Option<String> {
    self
      .kind
      .as_ref()
      .and_then(|k| k.code.as_deref())
      .filter(|c| !c.trim().is_empty())
      .map(|c| c.trim().to_uppercase())
  }

  /// The status code, upper-cased. `None` if malformed.
  pub fn status_code(&self) -> Option<String> {
    self
      .status
      .as_ref()
      .and_then(|s| s.code.as_deref())
      .filter(|c| !c.trim().is_empty())
      .map(|c| c.trim().to_uppercase())
  }

  /// End of the affiliation's validity window, if one is recorded and
  /// parseable. Both `YYYY-MM-DD` and RFC 3339 forms are accepted.
  pub fn to_date(&self) -> Option<NaiveDate> {
    let raw = self.to_date.as_deref()?.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
      .ok()
      .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.date_naive()))
  }

  /// Parse a JSON array of affiliations, skipping entries that are not
  /// objects. Anything other than an array yields an empty list.
  pub fn parse_list(value: &serde_json::Value) -> Vec<RawAffiliation> {
    value
      .as_array()
      .map(|items| {
        items
          .iter()
          .filter_map(|item| serde_json::from_value(item.clone()).ok())
          .collect()
      })
      .unwrap_or_default()
  }
}

// ─── Directory records ───────────────────────────────────────────────────────

/// Affiliation data from the campus directory.
///
/// Affiliations are strings of the form `CATEGORY-TYPE-<name>` or
/// `CATEGORY-STATUS-EXPIRED`. Expiration timestamps are kept per category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryRecord {
  pub affiliations:         Vec<String>,
  /// Group-membership distinguished names.
  pub groups:               Vec<String>,
  pub affiliate_exp_dates:  Vec<String>,
  pub employee_exp_dates:   Vec<String>,
  pub student_exp_dates:    Vec<String>,
}

/// Parse a directory expiration timestamp (`%Y%m%d%H%M%SZ`).
pub fn parse_directory_timestamp(raw: &str) -> Result<DateTime<Utc>> {
  NaiveDateTime::parse_from_str(raw.trim(), DIRECTORY_TIMESTAMP_FORMAT)
    .map(|naive| naive.and_utc())
    .map_err(|_| Error::InvalidTimestamp(raw.to_owned()))
}

/// Format a timestamp in directory form.
pub fn format_directory_timestamp(at: DateTime<Utc>) -> String {
  at.format(DIRECTORY_TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
  use chrono::{Datelike, TimeZone, Timelike};
  use serde_json::json;

  use super::*;

  #[test]
  fn deserialises_camel_case_affiliation() {
    let aff: RawAffiliation = serde_json::from_value(json!({
      "type": { "code": "student", "description": "" },
      "status": { "code": "ACT", "description": "Active" },
      "fromDate": "2014-05-15"
    }))
    .unwrap();
    assert_eq!(aff.type_code().as_deref(), Some("STUDENT"));
    assert_eq!(aff.status_code().as_deref(), Some(ACTIVE_STATUS));
    assert_eq!(aff.from_date.as_deref(), Some("2014-05-15"));
    assert!(aff.to_date().is_none());
  }

  #[test]
  fn parse_list_skips_non_objects() {
    let list = RawAffiliation::parse_list(&json!([
      "garbage",
      42,
      { "type": { "code": "INSTRUCTOR" }, "status": { "code": "ACT" } },
      { "status": { "code": "ACT" } }
    ]));
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].type_code().as_deref(), Some("INSTRUCTOR"));
    assert!(list[1].type_code().is_none());
  }

  #[test]
  fn parse_list_of_non_array_is_empty() {
    assert!(RawAffiliation::parse_list(&json!({"statusCode": 503})).is_empty());
  }

  #[test]
  fn to_date_accepts_both_forms() {
    let mut aff = RawAffiliation::new("STUDENT", "ACT");
    aff.to_date = Some("2015-01-31".into());
    assert_eq!(aff.to_date().unwrap().day(), 31);
    aff.to_date = Some("2015-01-31T10:00:00Z".into());
    assert_eq!(aff.to_date().unwrap().month(), 1);
    aff.to_date = Some("not a date".into());
    assert!(aff.to_date().is_none());
  }

  #[test]
  fn directory_timestamp_round_trip() {
    let at = parse_directory_timestamp("20140901145959Z").unwrap();
    assert_eq!(at.year(), 2014);
    assert_eq!(at.hour(), 14);
    let again = Utc.with_ymd_and_hms(2014, 9, 1, 14, 59, 59).unwrap();
    assert_eq!(format_directory_timestamp(again), "20140901145959Z");
    assert!(parse_directory_timestamp("yesterday").is_err());
  }
}
