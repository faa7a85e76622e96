//! Session extraction.
//!
//! The session record is placed in the request extensions by whatever sits
//! in front of the router. A request without one is anonymous.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use portal_core::auth_state::SessionRecord;

pub struct Session(pub SessionRecord);

impl<S: Send + Sync> FromRequestParts<S> for Session {
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    Ok(Session(
      parts
        .extensions
        .get::<SessionRecord>()
        .cloned()
        .unwrap_or_default(),
    ))
  }
}
