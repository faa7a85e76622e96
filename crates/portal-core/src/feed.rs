//! FeedComposer: the user-facing status feed and its tab-visibility rules.
//!
//! Composition is pure: every collaborator answer is resolved before
//! [`compose`] runs, and a failed collaborator arrives here as a default
//! value rather than an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  academics::AcademicsFeed,
  auth_state::AuthenticationState,
  delegation::{DelegateStudent, DelegationPrivilegeSet},
  identity::Uid,
  reconcile::CanonicalProfile,
  roles::{Role, RoleSet},
  source::{CourseHistory, LinkedAccounts, UserAuth, UserData},
};

// ─── Tab predicates ──────────────────────────────────────────────────────────

pub fn has_academics_tab(
  roles: &RoleSet,
  privileges: Option<&DelegationPrivilegeSet>,
  history: &CourseHistory,
) -> bool {
  if privileges.is_some_and(|p| !p.grants_academics()) {
    return false;
  }
  roles.get(Role::Student)
    || roles.get(Role::Faculty)
    || history.has_instructor_history
    || history.has_student_history
}

pub fn can_view_grades(
  roles: &RoleSet,
  privileges: Option<&DelegationPrivilegeSet>,
  history: &CourseHistory,
) -> bool {
  has_academics_tab(roles, privileges, history)
    && privileges.is_none_or(|p| p.view_grades)
}

pub fn has_financials_tab(
  roles: &RoleSet,
  privileges: Option<&DelegationPrivilegeSet>,
) -> bool {
  if privileges.is_some_and(|p| !p.financial) {
    return false;
  }
  roles.get(Role::Student) || roles.get(Role::ExStudent)
}

pub fn is_delegate_user(
  auth: &AuthenticationState,
  delegate_students: &[DelegateStudent],
) -> bool {
  auth.directly_authenticated() && !delegate_students.is_empty()
}

pub fn has_toolbox_tab(
  auth: &AuthenticationState,
  actor: &UserAuth,
  roles: &RoleSet,
  is_delegate_user: bool,
) -> bool {
  auth.directly_authenticated()
    && actor.active
    && (actor.can_administrate()
      || actor.is_viewer
      || is_delegate_user
      || roles.get(Role::Advisor))
}

// ─── Feed ────────────────────────────────────────────────────────────────────

/// Change-detection stamp attached to a composed feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastModified {
  pub hash:      String,
  pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFeed {
  pub is_superuser:                bool,
  pub is_viewer:                   bool,
  pub is_directly_authenticated:   bool,
  pub first_login_at:              Option<DateTime<Utc>>,
  pub first_name:                  String,
  pub last_name:                   String,
  pub full_name:                   String,
  pub given_first_name:            String,
  pub given_full_name:             String,
  pub preferred_name:              String,
  pub roles:                       RoleSet,
  pub uid:                         Uid,
  pub sid:                         Option<String>,
  #[serde(rename = "campusSolutionsID")]
  pub campus_solutions_id:         Option<String>,
  pub official_bmail_address:      Option<String>,
  pub is_campus_solutions_student: bool,
  pub is_delegate_user:            bool,
  #[serde(rename = "showSisProfileUI")]
  pub show_sis_profile_ui:         bool,
  pub has_dashboard_tab:           bool,
  pub has_academics_tab:           bool,
  pub can_view_grades:             bool,
  pub has_financials_tab:          bool,
  pub has_toolbox_tab:             bool,
  pub has_canvas_account:          bool,
  pub has_google_access_token:     bool,
  pub has_student_history:         bool,
  pub has_instructor_history:      bool,
  pub in_education_abroad_program: bool,
  pub google_email:                Option<String>,
  pub canvas_email:                Option<String>,
  pub no_student_id:               bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub delegate_view_as_privileges: Option<DelegationPrivilegeSet>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_modified:               Option<LastModified>,
}

/// Everything [`compose`] needs, already fetched.
#[derive(Debug, Clone, Copy)]
pub struct FeedInputs<'a> {
  pub profile:           &'a CanonicalProfile,
  pub auth:              &'a AuthenticationState,
  /// Authority record of the real user.
  pub actor:             &'a UserAuth,
  /// `Some` exactly when the request is a delegate view-as session.
  pub privileges:        Option<&'a DelegationPrivilegeSet>,
  /// Students linked to the actor as a delegate.
  pub delegate_students: &'a [DelegateStudent],
  pub history:           &'a CourseHistory,
  pub accounts:          &'a LinkedAccounts,
  pub user_data:         Option<&'a UserData>,
}

pub fn compose(inputs: FeedInputs<'_>) -> UserFeed {
  let FeedInputs {
    profile,
    auth,
    actor,
    privileges,
    delegate_students,
    history,
    accounts,
    user_data,
  } = inputs;
  let roles = &profile.roles;
  let delegate_user = is_delegate_user(auth, delegate_students);

  UserFeed {
    is_superuser: actor.can_administrate(),
    is_viewer: actor.can_view_as(),
    is_directly_authenticated: auth.directly_authenticated(),
    first_login_at: user_data.and_then(|d| d.first_login_at),
    first_name: profile.first_name.clone(),
    last_name: profile.last_name.clone(),
    full_name: join_name(&profile.first_name, &profile.last_name),
    given_first_name: profile.given_first_name.clone(),
    given_full_name: join_name(&profile.given_first_name, &profile.family_name),
    preferred_name: profile.preferred_name.clone(),
    roles: roles.clone(),
    uid: profile.uid.clone(),
    sid: profile.student_id.clone(),
    campus_solutions_id: profile.campus_solutions_id.clone(),
    official_bmail_address: profile.official_bmail_address.clone(),
    is_campus_solutions_student: profile.is_campus_solutions_student,
    is_delegate_user: delegate_user,
    show_sis_profile_ui: profile.sis_profile_visible,
    has_dashboard_tab: !auth.authenticated_as_delegate(),
    has_academics_tab: has_academics_tab(roles, privileges, history),
    can_view_grades: can_view_grades(roles, privileges, history),
    has_financials_tab: has_financials_tab(roles, privileges),
    has_toolbox_tab: has_toolbox_tab(auth, actor, roles, delegate_user),
    has_canvas_account: accounts.has_canvas_account,
    has_google_access_token: accounts.has_google_access_token,
    has_student_history: history.has_student_history,
    has_instructor_history: history.has_instructor_history,
    in_education_abroad_program: profile.education_abroad,
    google_email: accounts.google_email.clone(),
    canvas_email: accounts.canvas_email.clone(),
    no_student_id: profile.no_student_id,
    delegate_view_as_privileges: privileges.copied(),
    last_modified: None,
  }
}

fn join_name(first: &str, last: &str) -> String {
  format!("{first} {last}").trim().to_owned()
}

/// The academics feed as this viewer may see it, or `None` when a delegate
/// holds neither enrollment nor grade privileges for the student.
pub fn compose_academics(
  feed: AcademicsFeed,
  privileges: Option<&DelegationPrivilegeSet>,
) -> Option<AcademicsFeed> {
  match privileges {
    None => Some(feed),
    Some(p) if p.grants_academics() => Some(feed.filtered_for_delegate(p)),
    Some(_) => None,
  }
}
