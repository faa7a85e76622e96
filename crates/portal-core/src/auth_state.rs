//! AuthenticationState: who is really logged in, and whom they are viewing.
//!
//! Built once per request from the session record and never mutated. A new
//! request produces a new state. Privilege lookups that need I/O live in
//! `portal-feed`; everything here is a pure derivation.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::IntoStaticStr;

use crate::identity::Uid;

/// Marker reported as the real user id of an LTI-only session.
pub const LTI_AUTHENTICATED_ONLY: &str = "Authenticated through LTI";

/// Session keys consumed by [`AuthenticationState`].
pub mod session_key {
  pub const USER_ID: &str = "user_id";
  pub const ORIGINAL_USER_ID: &str = "original_user_id";
  pub const ORIGINAL_ADVISOR_USER_ID: &str = "original_advisor_user_id";
  pub const ORIGINAL_DELEGATE_USER_ID: &str = "original_delegate_user_id";
  pub const CANVAS_MASQUERADING_USER_ID: &str = "canvas_masquerading_user_id";
  pub const LTI_AUTHENTICATED_ONLY: &str = "lti_authenticated_only";
}

// ─── Session record ──────────────────────────────────────────────────────────

/// Read-only mapping of session keys to scalar values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionRecord(BTreeMap<String, Value>);

impl SessionRecord {
  pub fn new() -> Self { Self::default() }

  pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
    self.0.insert(key.to_owned(), value.into());
    self
  }

  pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
    self.0.insert(key.to_owned(), value.into());
  }

  pub fn get(&self, key: &str) -> Option<&Value> { self.0.get(key) }

  /// A present, non-blank id. Numbers are accepted and rendered as strings.
  fn id(&self, key: &str) -> Option<Uid> {
    match self.0.get(key)? {
      Value::String(s) if !s.trim().is_empty() => Some(Uid::new(s.trim())),
      Value::Number(n) => Some(Uid::new(n.to_string())),
      _ => None,
    }
  }

  fn flag(&self, key: &str) -> bool {
    match self.0.get(key) {
      Some(Value::Bool(b)) => *b,
      Some(Value::String(s)) => matches!(s.trim(), "true" | "1"),
      Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
      _ => false,
    }
  }
}

// ─── View modes ──────────────────────────────────────────────────────────────

/// Classification of one immutable session snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ViewMode {
  Anonymous,
  DirectlyAuthenticated,
  ViewingAsAdvisor,
  ViewingAsDelegate,
  ViewingAsPlainOriginal,
  LtiOnly,
  LtiMasquerade,
}

/// Whose authority governs the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorityTarget {
  /// Resolve the authority record of this uid.
  User(Uid),
  /// Public permissions only.
  Public,
}

// ─── AuthenticationState ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthenticationState {
  pub user_id:                     Option<Uid>,
  pub original_user_id:            Option<Uid>,
  pub original_advisor_user_id:    Option<Uid>,
  pub original_delegate_user_id:   Option<Uid>,
  pub canvas_masquerading_user_id: Option<Uid>,
  pub lti_authenticated_only:      bool,
}

impl AuthenticationState {
  pub fn from_session(session: &SessionRecord) -> Self {
    Self {
      user_id:                     session.id(session_key::USER_ID),
      original_user_id:            session.id(session_key::ORIGINAL_USER_ID),
      original_advisor_user_id:    session
        .id(session_key::ORIGINAL_ADVISOR_USER_ID),
      original_delegate_user_id:   session
        .id(session_key::ORIGINAL_DELEGATE_USER_ID),
      canvas_masquerading_user_id: session
        .id(session_key::CANVAS_MASQUERADING_USER_ID),
      lti_authenticated_only:      session
        .flag(session_key::LTI_AUTHENTICATED_ONLY),
    }
  }

  /// A directly authenticated session for `uid`.
  pub fn direct(uid: impl Into<Uid>) -> Self {
    Self {
      user_id: Some(uid.into()),
      ..Default::default()
    }
  }

  fn originals(&self) -> [Option<&Uid>; 3] {
    [
      self.original_user_id.as_ref(),
      self.original_advisor_user_id.as_ref(),
      self.original_delegate_user_id.as_ref(),
    ]
  }

  /// First populated "original" id, in precedence order: plain original,
  /// advisor, delegate.
  pub fn original_uid(&self) -> Option<&Uid> {
    self.originals().into_iter().flatten().next()
  }

  pub fn authenticated_as_delegate(&self) -> bool {
    self.original_delegate_user_id.is_some()
  }

  pub fn authenticated_as_advisor(&self) -> bool {
    self.original_advisor_user_id.is_some()
  }

  /// A user id is present, the session was not established only through an
  /// LTI handshake, and no view-as substitution is active.
  pub fn directly_authenticated(&self) -> bool {
    let Some(user_id) = &self.user_id else {
      return false;
    };
    !self.lti_authenticated_only
      && self
        .originals()
        .into_iter()
        .flatten()
        .all(|original| original == user_id)
  }

  /// The id of the person actually at the keyboard, for logging and audit.
  pub fn real_user_id(&self) -> Option<String> {
    self.user_id.as_ref()?;
    if let Some(original) = self.original_uid() {
      Some(original.to_string())
    } else if let Some(canvas_id) = &self.canvas_masquerading_user_id {
      Some(format!(
        "{LTI_AUTHENTICATED_ONLY}: masquerading Canvas ID {canvas_id}"
      ))
    } else if self.lti_authenticated_only {
      Some(LTI_AUTHENTICATED_ONLY.to_owned())
    } else {
      self.user_id.as_ref().map(Uid::to_string)
    }
  }

  /// Whose authority record governs this request. `None` when nobody is
  /// logged in.
  pub fn real_user_auth(&self) -> Option<AuthorityTarget> {
    let user_id = self.user_id.as_ref()?;
    if let Some(original) = self.original_uid() {
      Some(AuthorityTarget::User(original.clone()))
    } else if self.lti_authenticated_only {
      Some(AuthorityTarget::Public)
    } else {
      Some(AuthorityTarget::User(user_id.clone()))
    }
  }

  /// An original id is present and differs from the current user id.
  pub fn viewing_as(&self) -> bool {
    match (&self.user_id, self.original_uid()) {
      (Some(user_id), Some(original)) => original != user_id,
      _ => false,
    }
  }

  pub fn view_mode(&self) -> ViewMode {
    if self.user_id.is_none() {
      return ViewMode::Anonymous;
    }
    if self.viewing_as() {
      return if self.original_user_id.is_some() {
        ViewMode::ViewingAsPlainOriginal
      } else if self.authenticated_as_advisor() {
        ViewMode::ViewingAsAdvisor
      } else {
        ViewMode::ViewingAsDelegate
      };
    }
    if self.lti_authenticated_only {
      return if self.canvas_masquerading_user_id.is_some() {
        ViewMode::LtiMasquerade
      } else {
        ViewMode::LtiOnly
      };
    }
    ViewMode::DirectlyAuthenticated
  }
}

impl fmt::Display for AuthenticationState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let props = [
      (session_key::USER_ID, self.user_id.as_ref()),
      (session_key::ORIGINAL_USER_ID, self.original_user_id.as_ref()),
      (
        session_key::ORIGINAL_ADVISOR_USER_ID,
        self.original_advisor_user_id.as_ref(),
      ),
      (
        session_key::ORIGINAL_DELEGATE_USER_ID,
        self.original_delegate_user_id.as_ref(),
      ),
      (
        session_key::CANVAS_MASQUERADING_USER_ID,
        self.canvas_masquerading_user_id.as_ref(),
      ),
    ];
    let mut parts: Vec<String> = props
      .iter()
      .filter_map(|(key, value)| value.map(|v| format!("{key}={v}")))
      .collect();
    if self.lti_authenticated_only {
      parts.push(format!("{}=true", session_key::LTI_AUTHENTICATED_ONLY));
    }
    write!(f, "AuthenticationState {}", parts.join(", "))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn state(pairs: &[(&str, Value)]) -> AuthenticationState {
    let mut session = SessionRecord::new();
    for (key, value) in pairs {
      session.insert(key, value.clone());
    }
    AuthenticationState::from_session(&session)
  }

  fn s(v: &str) -> Value { Value::from(v) }

  // ── directly_authenticated ────────────────────────────────────────────

  #[test]
  fn normal_login_is_direct() {
    let st = state(&[(session_key::USER_ID, s("A"))]);
    assert!(st.directly_authenticated());
    assert_eq!(st.view_mode(), ViewMode::DirectlyAuthenticated);
  }

  #[test]
  fn any_view_as_is_not_direct() {
    for key in [
      session_key::ORIGINAL_USER_ID,
      session_key::ORIGINAL_ADVISOR_USER_ID,
      session_key::ORIGINAL_DELEGATE_USER_ID,
    ] {
      let st = state(&[(session_key::USER_ID, s("A")), (key, s("B"))]);
      assert!(!st.directly_authenticated(), "{key}");
      assert!(st.viewing_as(), "{key}");
    }
  }

  #[test]
  fn original_equal_to_user_is_still_direct() {
    let st = state(&[
      (session_key::USER_ID, s("A")),
      (session_key::ORIGINAL_USER_ID, s("A")),
    ]);
    assert!(st.directly_authenticated());
    assert!(!st.viewing_as());
  }

  #[test]
  fn lti_only_is_not_direct() {
    let st = state(&[
      (session_key::USER_ID, s("A")),
      (session_key::LTI_AUTHENTICATED_ONLY, Value::Bool(true)),
    ]);
    assert!(!st.directly_authenticated());
    assert!(!st.viewing_as());
    assert!(!st.authenticated_as_delegate());
    assert_eq!(st.view_mode(), ViewMode::LtiOnly);
  }

  #[test]
  fn anonymous_session() {
    let st = state(&[]);
    assert!(!st.directly_authenticated());
    assert!(!st.viewing_as());
    assert!(st.real_user_id().is_none());
    assert!(st.real_user_auth().is_none());
    assert_eq!(st.view_mode(), ViewMode::Anonymous);
  }

  #[test]
  fn blank_ids_are_absent() {
    let st = state(&[
      (session_key::USER_ID, s("A")),
      (session_key::ORIGINAL_DELEGATE_USER_ID, s("  ")),
    ]);
    assert!(st.original_delegate_user_id.is_none());
    assert!(st.directly_authenticated());
  }

  // ── real_user_id ──────────────────────────────────────────────────────

  #[test]
  fn real_user_id_precedence() {
    let st = state(&[(session_key::USER_ID, s("A"))]);
    assert_eq!(st.real_user_id().as_deref(), Some("A"));

    let st = state(&[
      (session_key::USER_ID, s("A")),
      (session_key::ORIGINAL_USER_ID, s("B")),
    ]);
    assert_eq!(st.real_user_id().as_deref(), Some("B"));

    let st = state(&[
      (session_key::USER_ID, s("A")),
      (session_key::ORIGINAL_DELEGATE_USER_ID, s("D")),
      (session_key::ORIGINAL_ADVISOR_USER_ID, s("C")),
    ]);
    assert_eq!(st.real_user_id().as_deref(), Some("C"));
  }

  #[test]
  fn real_user_id_under_lti() {
    let st = state(&[
      (session_key::USER_ID, s("A")),
      (session_key::LTI_AUTHENTICATED_ONLY, Value::Bool(true)),
    ]);
    assert_eq!(st.real_user_id().as_deref(), Some(LTI_AUTHENTICATED_ONLY));

    let st = state(&[
      (session_key::USER_ID, s("A")),
      (session_key::LTI_AUTHENTICATED_ONLY, Value::Bool(true)),
      (session_key::CANVAS_MASQUERADING_USER_ID, Value::from(99)),
    ]);
    assert_eq!(
      st.real_user_id().as_deref(),
      Some("Authenticated through LTI: masquerading Canvas ID 99")
    );
    assert_eq!(st.view_mode(), ViewMode::LtiMasquerade);
  }

  // ── real_user_auth ────────────────────────────────────────────────────

  #[test]
  fn real_user_auth_targets() {
    let st = state(&[
      (session_key::USER_ID, s("A")),
      (session_key::ORIGINAL_DELEGATE_USER_ID, s("D")),
    ]);
    assert_eq!(st.real_user_auth(), Some(AuthorityTarget::User(Uid::from("D"))));
    assert_eq!(st.view_mode(), ViewMode::ViewingAsDelegate);

    let st = state(&[
      (session_key::USER_ID, s("A")),
      (session_key::LTI_AUTHENTICATED_ONLY, s("true")),
    ]);
    assert_eq!(st.real_user_auth(), Some(AuthorityTarget::Public));

    let st = AuthenticationState::direct("A");
    assert_eq!(st.real_user_auth(), Some(AuthorityTarget::User(Uid::from("A"))));
  }

  #[test]
  fn advisor_view_mode() {
    let st = state(&[
      (session_key::USER_ID, s("A")),
      (session_key::ORIGINAL_ADVISOR_USER_ID, s("C")),
    ]);
    assert!(st.authenticated_as_advisor());
    assert!(!st.authenticated_as_delegate());
    assert_eq!(st.view_mode(), ViewMode::ViewingAsAdvisor);
  }

  #[test]
  fn display_lists_populated_fields() {
    let st = state(&[
      (session_key::USER_ID, s("A")),
      (session_key::ORIGINAL_USER_ID, s("B")),
    ]);
    assert_eq!(
      st.to_string(),
      "AuthenticationState user_id=A, original_user_id=B"
    );
  }
}
