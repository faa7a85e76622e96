//! DelegationPrivilegeResolver: what a delegate may see of one student.
//!
//! Deny by default: every failure path yields the empty privilege set.

use std::time::Duration;

use portal_core::{
  delegation::{DelegationPrivilegeSet, privileges_for},
  identity::Uid,
  source::{CampusSystems, Lookup},
};

use crate::fanout::bounded;

/// A resolved privilege set. `degraded` marks a deny-by-default answer
/// forced by an upstream failure rather than by the absence of a grant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resolution {
  pub privileges: DelegationPrivilegeSet,
  pub degraded:   bool,
}

impl Resolution {
  fn denied(degraded: bool) -> Self {
    Self {
      privileges: DelegationPrivilegeSet::empty(),
      degraded,
    }
  }
}

pub struct DelegationPrivilegeResolver<'a, C> {
  systems: &'a C,
  timeout: Duration,
  enabled: bool,
}

impl<'a, C: CampusSystems> DelegationPrivilegeResolver<'a, C> {
  /// `enabled` is the delegated-access feature flag; when off, every
  /// delegate resolves to the empty set.
  pub fn new(systems: &'a C, timeout: Duration, enabled: bool) -> Self {
    Self {
      systems,
      timeout,
      enabled,
    }
  }

  /// Privileges `delegate` holds over `subject`.
  pub async fn resolve(&self, delegate: &Uid, subject: &Uid) -> DelegationPrivilegeSet {
    self.resolution(delegate, subject).await.privileges
  }

  /// As [`resolve`](Self::resolve), also reporting whether an upstream
  /// failure decided the answer.
  pub async fn resolution(&self, delegate: &Uid, subject: &Uid) -> Resolution {
    if !self.enabled {
      return Resolution::denied(false);
    }

    let (ids, students) = tokio::join!(
      bounded("crosswalk", subject, self.timeout, self.systems.correlated_ids(subject)),
      bounded(
        "delegate_students",
        delegate,
        self.timeout,
        self.systems.delegate_students(delegate),
      ),
    );
    let degraded = ids.is_errored() || students.is_errored();

    let Some(cs_id) = ids.into_found().and_then(|ids| ids.campus_solutions_id) else {
      tracing::debug!(%subject, "no campus solutions id for delegated subject");
      return Resolution::denied(degraded);
    };
    let Lookup::Found(students) = students else {
      return Resolution::denied(degraded);
    };

    match privileges_for(&students, &cs_id) {
      Some(privileges) => Resolution {
        privileges,
        degraded: false,
      },
      None => {
        tracing::info!(%delegate, %subject, "delegate holds no grant for subject");
        Resolution::denied(false)
      }
    }
  }
}
