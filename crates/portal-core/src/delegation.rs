//! Delegated-access privileges granted by a student to a delegate.

use serde::{Deserialize, Serialize};

/// Privileges scoped to one (delegate, student) pair. Deny by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DelegationPrivilegeSet {
  pub financial:        bool,
  pub view_enrollments: bool,
  pub view_grades:      bool,
  pub phone:            bool,
}

impl DelegationPrivilegeSet {
  /// The deny-everything set used when a lookup fails.
  pub fn empty() -> Self { Self::default() }

  /// True if any privilege other than `phone` is granted. The `phone`
  /// privilege alone does not open the student's profile to the delegate.
  pub fn grants_view_access(&self) -> bool {
    self.financial || self.view_enrollments || self.view_grades
  }

  pub fn grants_academics(&self) -> bool {
    self.view_enrollments || self.view_grades
  }
}

/// A student linked to a delegate account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegateStudent {
  pub campus_solutions_id: String,
  #[serde(default)]
  pub uid:                 Option<String>,
  #[serde(default)]
  pub full_name:           Option<String>,
  #[serde(default)]
  pub privileges:          DelegationPrivilegeSet,
}

/// A [`DelegateStudent`] as presented to the delegate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegateStudentView {
  #[serde(flatten)]
  pub student:         DelegateStudent,
  pub delegate_access: bool,
}

impl From<DelegateStudent> for DelegateStudentView {
  fn from(student: DelegateStudent) -> Self {
    let delegate_access = student.privileges.grants_view_access();
    Self {
      student,
      delegate_access,
    }
  }
}

/// Privileges granted to the delegate by the student whose Campus Solutions
/// id is `subject_cs_id`, or `None` when there is no such grant.
pub fn privileges_for(
  students: &[DelegateStudent],
  subject_cs_id: &str,
) -> Option<DelegationPrivilegeSet> {
  students
    .iter()
    .find(|s| s.campus_solutions_id == subject_cs_id)
    .map(|s| s.privileges)
}
