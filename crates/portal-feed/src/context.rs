//! [`RequestContext`]: the immutable authentication state of one request,
//! plus the delegated privileges resolved at most once per request.

use portal_core::{
  auth_state::AuthenticationState,
  delegation::DelegationPrivilegeSet,
  source::CampusSystems,
};
use tokio::sync::OnceCell;

use crate::privileges::{DelegationPrivilegeResolver, Resolution};

#[derive(Debug)]
pub struct RequestContext {
  auth:       AuthenticationState,
  privileges: OnceCell<Option<Resolution>>,
}

impl RequestContext {
  pub fn new(auth: AuthenticationState) -> Self {
    Self {
      auth,
      privileges: OnceCell::new(),
    }
  }

  pub fn auth(&self) -> &AuthenticationState { &self.auth }

  /// `None` outside a delegate view-as session. Inside one, always `Some`;
  /// the set is empty when the lookup fails or no grant exists.
  pub async fn delegated_privileges<C: CampusSystems>(
    &self,
    resolver: &DelegationPrivilegeResolver<'_, C>,
  ) -> Option<DelegationPrivilegeSet> {
    self
      .delegated_resolution(resolver)
      .await
      .map(|resolution| resolution.privileges)
  }

  pub async fn delegated_resolution<C: CampusSystems>(
    &self,
    resolver: &DelegationPrivilegeResolver<'_, C>,
  ) -> Option<Resolution> {
    *self
      .privileges
      .get_or_init(|| async {
        match (&self.auth.original_delegate_user_id, &self.auth.user_id) {
          (Some(delegate), Some(subject)) => Some(resolver.resolution(delegate, subject).await),
          _ => None,
        }
      })
      .await
  }
}
