//! Academics feed model and delegate filtering.
//!
//! Grade redaction is structural: filtered fields are removed from the value
//! before serialisation, so they never reach the client.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::delegation::DelegationPrivilegeSet;

type Extra = BTreeMap<String, Value>;

// ─── Lenient decoding ────────────────────────────────────────────────────────

// Upstream academics data is passed through mostly untouched. A malformed
// member degrades to absent instead of failing the whole feed.

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
  D: Deserializer<'de>,
  T: DeserializeOwned,
{
  let value = Value::deserialize(deserializer)?;
  Ok(serde_json::from_value(value).ok())
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
  D: Deserializer<'de>,
  T: DeserializeOwned,
{
  Ok(lenient_items(&Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_optional_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: DeserializeOwned,
{
  Ok(lenient_items(&Value::deserialize(deserializer)?))
}

/// Entries of an array that decode; anything other than an array is `None`.
fn lenient_items<T: DeserializeOwned>(value: &Value) -> Option<Vec<T>> {
  value.as_array().map(|items| {
    items
      .iter()
      .filter_map(|item| serde_json::from_value(item.clone()).ok())
      .collect()
  })
}

// ─── Model ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub grade: Option<Value>,
  #[serde(flatten)]
  pub extra: Extra,
}

/// Course code, title and the rest pass through in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
  #[serde(default, deserialize_with = "lenient_list")]
  pub sections:   Vec<Section>,
  #[serde(
    default,
    deserialize_with = "lenient_optional_list",
    skip_serializing_if = "Option::is_none"
  )]
  pub transcript: Option<Vec<Section>>,
  #[serde(flatten)]
  pub extra:      Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Semester {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub slug:    Option<Value>,
  #[serde(default, deserialize_with = "lenient_list")]
  pub classes: Vec<Class>,
  #[serde(flatten)]
  pub extra:   Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpaUnits {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cumulative_gpa: Option<Value>,
  #[serde(flatten)]
  pub extra:          Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicsFeed {
  #[serde(default, deserialize_with = "lenient_list")]
  pub semesters:              Vec<Semester>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub gpa_units:              Option<GpaUnits>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub exam_schedule:          Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub transition_term:        Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub regblocks:              Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub requirements:           Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub other_site_memberships: Option<Value>,
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub filtered_for_delegate:  bool,
}

impl AcademicsFeed {
  /// Remove per-section grades, transcript grades, and the cumulative GPA.
  pub fn strip_grades(&mut self) {
    for class in self.semesters.iter_mut().flat_map(|s| s.classes.iter_mut()) {
      for section in class.sections.iter_mut() {
        section.grade = None;
      }
      for entry in class.transcript.iter_mut().flatten() {
        entry.grade = None;
      }
    }
    if let Some(gpa_units) = self.gpa_units.as_mut() {
      gpa_units.cumulative_gpa = None;
    }
  }

  /// The view a delegate is allowed to see. Sections a delegate never sees
  /// are dropped; grades are dropped unless `view_grades` is granted.
  pub fn filtered_for_delegate(mut self, privileges: &DelegationPrivilegeSet) -> Self {
    self.filtered_for_delegate = true;
    self.regblocks = None;
    self.requirements = None;
    self.other_site_memberships = None;
    for semester in self.semesters.iter_mut() {
      semester.slug = None;
    }
    if !privileges.view_grades {
      self.strip_grades();
    }
    self
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn sample() -> AcademicsFeed {
    serde_json::from_value(json!({
      "semesters": [{
        "name": "Fall 2015",
        "slug": "fall-2015",
        "termCode": "D",
        "classes": [{
          "courseCode": "HISTORY 7B",
          "sections": [{ "grade": "A-", "sectionLabel": "LEC 001" }],
          "transcript": [{ "grade": "A-", "units": 4 }]
        }]
      }],
      "gpaUnits": { "cumulativeGpa": "3.8", "totalUnits": 64 },
      "examSchedule": [],
      "regblocks": { "activeBlocks": [] },
      "requirements": [],
      "otherSiteMemberships": []
    }))
    .unwrap()
  }

  #[test]
  fn passthrough_fields_survive_round_trip() {
    let json = serde_json::to_value(sample()).unwrap();
    assert_eq!(json["semesters"][0]["termCode"], json!("D"));
    assert_eq!(json["semesters"][0]["classes"][0]["sections"][0]["sectionLabel"], json!("LEC 001"));
    assert_eq!(json["gpaUnits"]["totalUnits"], json!(64));
    assert!(json.get("filteredForDelegate").is_none());
  }

  #[test]
  fn delegate_with_grades_keeps_grades() {
    let privileges = DelegationPrivilegeSet {
      view_grades: true,
      ..Default::default()
    };
    let json = serde_json::to_value(sample().filtered_for_delegate(&privileges)).unwrap();
    assert_eq!(json["filteredForDelegate"], json!(true));
    assert_eq!(json["gpaUnits"]["cumulativeGpa"], json!("3.8"));
    assert_eq!(json["semesters"][0]["classes"][0]["transcript"][0]["grade"], json!("A-"));
    assert!(json.get("regblocks").is_none());
    assert!(json.get("requirements").is_none());
    assert!(json.get("otherSiteMemberships").is_none());
    assert!(json["semesters"][0].get("slug").is_none());
  }

  #[test]
  fn delegate_without_grades_loses_grade_fields_only() {
    let privileges = DelegationPrivilegeSet {
      view_enrollments: true,
      ..Default::default()
    };
    let json = serde_json::to_value(sample().filtered_for_delegate(&privileges)).unwrap();
    let class = &json["semesters"][0]["classes"][0];
    assert!(class["sections"][0].get("grade").is_none());
    assert_eq!(class["sections"][0]["sectionLabel"], json!("LEC 001"));
    assert!(class["transcript"][0].get("grade").is_none());
    assert_eq!(class["transcript"][0]["units"], json!(4));
    assert!(json["gpaUnits"].get("cumulativeGpa").is_none());
    assert_eq!(json["gpaUnits"]["totalUnits"], json!(64));
    assert_eq!(json["semesters"].as_array().unwrap().len(), 1);
    assert_eq!(json["examSchedule"], json!([]));
  }

  #[test]
  fn odd_upstream_values_do_not_sink_the_feed() {
    let feed: AcademicsFeed = serde_json::from_value(json!({
      "semesters": [{
        "name": null,
        "classes": [
          { "courseCode": null, "sections": [{ "grade": 4.0 }], "transcript": "n/a" },
          "not a class"
        ]
      }],
      "gpaUnits": { "cumulativeGpa": 3.8 }
    }))
    .unwrap();
    let class = &feed.semesters[0].classes[0];
    assert_eq!(feed.semesters[0].classes.len(), 1);
    assert_eq!(class.sections[0].grade, Some(json!(4.0)));
    assert_eq!(class.transcript, None);
    assert_eq!(feed.gpa_units.as_ref().unwrap().cumulative_gpa, Some(json!(3.8)));

    let redacted = feed.filtered_for_delegate(&DelegationPrivilegeSet {
      view_enrollments: true,
      ..Default::default()
    });
    let json = serde_json::to_value(redacted).unwrap();
    assert!(json["gpaUnits"].get("cumulativeGpa").is_none());
    assert!(json["semesters"][0]["classes"][0]["sections"][0].get("grade").is_none());
  }

  #[test]
  fn malformed_gpa_block_is_dropped() {
    let feed: AcademicsFeed = serde_json::from_value(json!({ "gpaUnits": "unavailable" })).unwrap();
    assert!(feed.gpa_units.is_none());
  }
}
