//! Session gateway.
//!
//! Sign-on happens in front of this server. The gateway forwards the
//! session as `x-session-*` headers, which must be stripped from client
//! requests before they get here.

use axum::{
  extract::Request,
  http::HeaderMap,
  middleware::Next,
  response::Response,
};
use portal_core::auth_state::{SessionRecord, session_key};

const SESSION_HEADERS: [(&str, &str); 6] = [
  ("x-session-user-id", session_key::USER_ID),
  ("x-session-original-user-id", session_key::ORIGINAL_USER_ID),
  ("x-session-original-advisor-user-id", session_key::ORIGINAL_ADVISOR_USER_ID),
  ("x-session-original-delegate-user-id", session_key::ORIGINAL_DELEGATE_USER_ID),
  ("x-session-canvas-masquerading-user-id", session_key::CANVAS_MASQUERADING_USER_ID),
  ("x-session-lti-authenticated-only", session_key::LTI_AUTHENTICATED_ONLY),
];

/// Build a session record from gateway headers. `None` if none are present.
pub fn session_from_headers(headers: &HeaderMap) -> Option<SessionRecord> {
  let mut session = SessionRecord::new();
  let mut present = false;
  for (header, key) in SESSION_HEADERS {
    let Some(value) = headers.get(header).and_then(|v| v.to_str().ok()) else {
      continue;
    };
    let value = value.trim();
    if value.is_empty() {
      continue;
    }
    session.insert(key, value);
    present = true;
  }
  present.then_some(session)
}

/// Middleware: attach the gateway session as a request extension.
pub async fn attach_session(mut req: Request, next: Next) -> Response {
  if let Some(session) = session_from_headers(req.headers()) {
    req.extensions_mut().insert(session);
  }
  next.run(req).await
}
