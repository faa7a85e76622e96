//! AttributeReconciler: the split-brain merge of legacy and modern sources.
//!
//! While the student record migration is in progress, each profile field is
//! taken from the modern source only when that source is visible for the
//! identity, returned a record, and the value passes its type contract.
//! Otherwise the legacy value is used. All of the transitional precedence
//! rules live in this module.

use serde::Serialize;
use serde_json::Value;

use crate::{
  attributes::{AttributeBag, Field, validate},
  auth_state::AuthenticationState,
  flags::FeatureFlags,
  identity::{CorrelatedIds, Uid, is_campus_solutions_id},
  roles::{MODERN_ROLE_WHITELIST, Role, RoleSet},
  source::{Lookup, UserData},
};

/// Everything the upstream sources said about one identity.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceAnswers {
  pub legacy:    Lookup<AttributeBag>,
  pub modern:    Lookup<AttributeBag>,
  pub crosswalk: Lookup<CorrelatedIds>,
}

/// Viewer-dependent inputs to reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileContext {
  pub flags:    FeatureFlags,
  /// The request is a view-as session of any kind.
  pub view_as:  bool,
}

impl ReconcileContext {
  pub fn new(flags: FeatureFlags, auth: &AuthenticationState) -> Self {
    Self {
      flags,
      view_as: auth.viewing_as() || auth.authenticated_as_delegate(),
    }
  }
}

/// The single reconciled attribute record for an identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalProfile {
  pub uid:                        Uid,
  pub default_name:               Option<String>,
  pub preferred_name:             String,
  pub first_name:                 String,
  pub last_name:                  String,
  pub given_first_name:           String,
  pub family_name:                String,
  pub student_id:                 Option<String>,
  pub campus_solutions_id:        Option<String>,
  pub delegate_user_id:           Option<String>,
  pub email_address:              Option<String>,
  pub official_bmail_address:     Option<String>,
  pub education_abroad:           bool,
  pub cal_residency_flag:         Option<String>,
  pub roles:                      RoleSet,
  pub is_campus_solutions_student: bool,
  pub sis_profile_visible:        bool,
  pub no_student_id:              bool,
}

/// The modern record belongs to a Campus Solutions student.
pub fn is_campus_solutions_student(modern: &Lookup<AttributeBag>) -> bool {
  modern
    .found()
    .and_then(|bag| bag.get(Field::CampusSolutionsId))
    .and_then(scalar_string)
    .is_some_and(|id| is_campus_solutions_id(&id))
}

/// Whether the modern profile is shown for this identity and viewer.
pub fn sis_profile_visible(ctx: &ReconcileContext, modern: &Lookup<AttributeBag>) -> bool {
  ctx.flags.cs_profile
    && !ctx.view_as
    && (is_campus_solutions_student(modern)
      || ctx.flags.cs_profile_visible_for_legacy_users)
}

/// Conservative role merge: legacy roles are the base, whitelisted modern
/// roles are overlaid when the modern profile is visible, and legacy
/// ex-student status always wins over a modern `student` flag.
pub fn merge_roles(legacy: &RoleSet, modern: Option<&RoleSet>) -> RoleSet {
  let mut merged = legacy.clone();
  if let Some(modern) = modern {
    let mut overlay = modern.clone();
    if legacy.get(Role::ExStudent) {
      overlay.remove(Role::Student);
    }
    merged.overlay(&overlay, &MODERN_ROLE_WHITELIST);
  }
  if merged.get(Role::ExStudent) {
    merged.set(Role::Student, false);
  }
  merged
}

/// Merge the source answers into a [`CanonicalProfile`].
///
/// Pure apart from logging: identical inputs always yield identical output.
pub fn reconcile(
  uid: &Uid,
  answers: &SourceAnswers,
  user_data: Option<&UserData>,
  ctx: &ReconcileContext,
) -> CanonicalProfile {
  let visible = sis_profile_visible(ctx, &answers.modern);
  let legacy = answers.legacy.found();
  let modern = answers.modern.found();
  let trusted_modern = modern.filter(|_| visible);

  let campus_attribute = |field: Field| -> Option<Value> {
    if let Some(value) = trusted_modern.and_then(|bag| bag.get(field)) {
      match validate(field, value) {
        Ok(value) => return Some(value),
        Err(e) => tracing::warn!(%uid, %field, %value, error = %e, "modern attribute rejected"),
      }
    }
    legacy.and_then(|bag| bag.get(field)).cloned()
  };
  let campus_string = |field: Field| campus_attribute(field).as_ref().and_then(scalar_string);
  // Given and family names come from the modern record whenever it exists.
  let modern_string = |field: Field| {
    modern
      .and_then(|bag| bag.get(field))
      .and_then(|value| validate(field, value).ok())
      .as_ref()
      .and_then(scalar_string)
  };

  let crosswalk = answers.crosswalk.found();
  let default_name = campus_string(Field::PersonName);
  let first_name = campus_string(Field::FirstName).unwrap_or_default();
  let last_name = campus_string(Field::LastName).unwrap_or_default();
  let given_first_name =
    modern_string(Field::GivenName).unwrap_or_else(|| first_name.clone());
  let family_name = modern_string(Field::FamilyName).unwrap_or_else(|| last_name.clone());

  let student_id = campus_string(Field::StudentId)
    .or_else(|| crosswalk.and_then(|ids| ids.student_id.clone()));
  let campus_solutions_id = campus_string(Field::CampusSolutionsId)
    .or_else(|| crosswalk.and_then(|ids| ids.campus_solutions_id.clone()));
  let delegate_user_id = crosswalk.and_then(|ids| ids.delegate_user_id.clone());

  let legacy_roles = legacy.map(|bag| bag.roles.clone()).unwrap_or_default();
  let roles = merge_roles(&legacy_roles, trusted_modern.map(|bag| &bag.roles));

  let preferred_name = user_data
    .and_then(|data| data.preferred_name.clone())
    .or_else(|| default_name.clone())
    .unwrap_or_default();

  CanonicalProfile {
    uid: uid.clone(),
    preferred_name,
    first_name,
    last_name,
    given_first_name,
    family_name,
    no_student_id: student_id.is_none(),
    student_id,
    campus_solutions_id,
    delegate_user_id,
    email_address: campus_string(Field::EmailAddress),
    official_bmail_address: campus_string(Field::OfficialBmailAddress),
    education_abroad: campus_attribute(Field::EducationAbroad)
      .and_then(|v| v.as_bool())
      .unwrap_or(false),
    // Residency stays legacy-only until the modern registration data lands.
    cal_residency_flag: legacy
      .and_then(|bag| bag.get_str(Field::CalResidencyFlag))
      .map(str::to_owned),
    default_name,
    roles,
    is_campus_solutions_student: is_campus_solutions_student(&answers.modern),
    sis_profile_visible: visible,
  }
}

/// Render a string or number as a string; anything else is not an id or name.
fn scalar_string(value: &Value) -> Option<String> {
  match value {
    Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}
