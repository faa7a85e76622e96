//! JSON API for the student portal.
//!
//! Exposes an axum [`Router`] backed by a [`FeedService`]. The session record
//! is supplied by the caller as a request extension; TLS and sign-on are the
//! caller's responsibility.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/my/status` | ETag / `If-None-Match` |
//! | `POST`   | `/my/preferred_name` | |
//! | `POST`   | `/my/record_first_login` | |
//! | `GET`    | `/my/academics` | Filtered for delegates |
//! | `GET`    | `/my/delegate_students` | |
//! | `DELETE` | `/admin/users/{uid}` | Administrators only |

pub mod academics;
pub mod admin;
pub mod delegates;
pub mod error;
pub mod session;
pub mod status;
pub mod user_data;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use portal_core::source::{CacheGate, CampusSystems, UserDataStore};
use portal_feed::FeedService;

pub use error::ApiError;

/// Build the API router for `service`.
pub fn api_router<C, S, G>(service: Arc<FeedService<C, S, G>>) -> Router<()>
where
  C: CampusSystems + 'static,
  S: UserDataStore + 'static,
  G: CacheGate + 'static,
{
  Router::new()
    .route("/my/status", get(status::handler::<C, S, G>))
    .route("/my/preferred_name", post(user_data::preferred_name::<C, S, G>))
    .route("/my/record_first_login", post(user_data::record_first_login::<C, S, G>))
    .route("/my/academics", get(academics::handler::<C, S, G>))
    .route("/my/delegate_students", get(delegates::handler::<C, S, G>))
    .route("/admin/users/{uid}", delete(admin::delete_user::<C, S, G>))
    .with_state(service)
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use portal_core::{
    attributes::{AttributeBag, Field},
    auth_state::{SessionRecord, session_key},
    delegation::{DelegateStudent, DelegationPrivilegeSet},
    identity::CorrelatedIds,
    roles::Role,
    source::{Lookup, UserAuth},
  };
  use portal_feed::{FeedConfig, MemoryCache, memory::MemorySystems};
  use portal_store_sqlite::SqliteUserDataStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use super::*;

  type Service = FeedService<MemorySystems, SqliteUserDataStore, MemoryCache>;

  fn systems() -> MemorySystems {
    let mut systems = MemorySystems::new();
    systems.legacy.insert(
      "61889",
      Lookup::Found(
        AttributeBag::new()
          .with(Field::PersonName, "Joe Bloggs")
          .with(Field::FirstName, "Joe")
          .with(Field::LastName, "Bloggs")
          .with(Field::StudentId, "11667051")
          .with_roles([Role::Student].into_iter().collect()),
      ),
    );
    systems.crosswalk.insert(
      "61889".into(),
      Lookup::Found(CorrelatedIds {
        campus_solutions_id: Some("24363318".into()),
        ..Default::default()
      }),
    );
    systems.academics.insert(
      "61889".into(),
      Lookup::Found(
        serde_json::from_value(json!({
          "semesters": [{ "name": "Fall 2015", "classes": [{ "sections": [{ "grade": "B+" }] }] }],
          "gpaUnits": { "cumulativeGpa": "3.2" }
        }))
        .unwrap(),
      ),
    );
    systems.delegates.insert(
      "1000".into(),
      Lookup::Found(vec![DelegateStudent {
        campus_solutions_id: "24363318".into(),
        uid:                 Some("61889".into()),
        full_name:           None,
        privileges:          DelegationPrivilegeSet {
          financial: true,
          ..Default::default()
        },
      }]),
    );
    systems.auth.insert(
      "2040".into(),
      Lookup::Found(UserAuth {
        is_superuser: true,
        is_viewer:    true,
        active:       true,
      }),
    );
    systems
  }

  async fn service() -> Arc<Service> {
    let store = SqliteUserDataStore::open_in_memory().await.unwrap();
    Arc::new(FeedService::new(
      systems(),
      store,
      MemoryCache::new(),
      FeedConfig::default(),
    ))
  }

  fn signed_in(uid: &str) -> SessionRecord {
    SessionRecord::new().with(session_key::USER_ID, uid)
  }

  fn delegate_view() -> SessionRecord {
    signed_in("61889").with(session_key::ORIGINAL_DELEGATE_USER_ID, "1000")
  }

  async fn send(
    service: &Arc<Service>,
    method: &str,
    uri: &str,
    session: Option<SessionRecord>,
    headers: Vec<(header::HeaderName, &str)>,
    body: Option<Value>,
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
      builder = builder.header(k, v);
    }
    if let Some(session) = session {
      builder = builder.extension(session);
    }
    let body = match body {
      Some(json) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(json.to_string())
      }
      None => Body::empty(),
    };
    api_router(service.clone())
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap()
  }

  async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  // ── Status ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn anonymous_status_is_401() {
    let service = service().await;
    let resp = send(&service, "GET", "/my/status", None, vec![], None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(json_body(resp).await["error"].is_string());
  }

  #[tokio::test]
  async fn status_returns_feed_with_etag() {
    let service = service().await;
    let resp = send(&service, "GET", "/my/status", Some(signed_in("61889")), vec![], None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let etag = resp.headers().get(header::ETAG).unwrap().to_str().unwrap().to_owned();
    let feed = json_body(resp).await;
    assert_eq!(feed["uid"], json!("61889"));
    assert_eq!(feed["preferredName"], json!("Joe Bloggs"));
    assert_eq!(feed["hasAcademicsTab"], json!(true));
    assert_eq!(format!("\"{}\"", feed["lastModified"]["hash"].as_str().unwrap()), etag);

    let resp = send(
      &service,
      "GET",
      "/my/status",
      Some(signed_in("61889")),
      vec![(header::IF_NONE_MATCH, etag.as_str())],
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
  }

  #[tokio::test]
  async fn delegate_status_carries_privileges() {
    let service = service().await;
    let resp = send(&service, "GET", "/my/status", Some(delegate_view()), vec![], None).await;
    let feed = json_body(resp).await;
    assert_eq!(feed["delegateViewAsPrivileges"]["financial"], json!(true));
    assert_eq!(feed["hasAcademicsTab"], json!(false));
    assert_eq!(feed["hasFinancialsTab"], json!(true));
    assert_eq!(feed["hasDashboardTab"], json!(false));
  }

  // ── User data ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn preferred_name_round_trip() {
    let service = service().await;
    let resp = send(
      &service,
      "POST",
      "/my/preferred_name",
      Some(signed_in("61889")),
      vec![],
      Some(json!({ "preferredName": " Joey " })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["preferredName"], json!("Joey"));

    let resp = send(&service, "GET", "/my/status", Some(signed_in("61889")), vec![], None).await;
    assert_eq!(json_body(resp).await["preferredName"], json!("Joey"));
  }

  #[tokio::test]
  async fn view_as_preferred_name_is_403() {
    let service = service().await;
    let resp = send(
      &service,
      "POST",
      "/my/preferred_name",
      Some(delegate_view()),
      vec![],
      Some(json!({ "preferredName": "Nope" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn first_login_recorded() {
    let service = service().await;
    let resp = send(
      &service,
      "POST",
      "/my/record_first_login",
      Some(signed_in("61889")),
      vec![],
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(json_body(resp).await["firstLoginAt"].is_string());
  }

  // ── Academics ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn financial_delegate_academics_is_403() {
    let service = service().await;
    let resp = send(&service, "GET", "/my/academics", Some(delegate_view()), vec![], None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn own_academics_include_grades() {
    let service = service().await;
    let resp = send(&service, "GET", "/my/academics", Some(signed_in("61889")), vec![], None).await;
    let feed = json_body(resp).await;
    assert_eq!(feed["gpaUnits"]["cumulativeGpa"], json!("3.2"));
    assert_eq!(feed["semesters"][0]["classes"][0]["sections"][0]["grade"], json!("B+"));
  }

  // ── Delegates ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn delegate_students_listed() {
    let service = service().await;
    let resp = send(
      &service,
      "GET",
      "/my/delegate_students",
      Some(signed_in("1000")),
      vec![],
      None,
    )
    .await;
    let body = json_body(resp).await;
    assert_eq!(body["students"][0]["campusSolutionsId"], json!("24363318"));
    assert_eq!(body["students"][0]["delegateAccess"], json!(true));
  }

  // ── Admin ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn delete_user_requires_superuser() {
    let service = service().await;
    let resp = send(
      &service,
      "DELETE",
      "/admin/users/61889",
      Some(signed_in("61889")),
      vec![],
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    send(
      &service,
      "POST",
      "/my/preferred_name",
      Some(signed_in("61889")),
      vec![],
      Some(json!({ "preferredName": "Joey" })),
    )
    .await;
    let resp = send(
      &service,
      "DELETE",
      "/admin/users/61889",
      Some(signed_in("2040")),
      vec![],
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["deleted"], json!(true));
  }

  #[test]
  fn etag_matching() {
    assert!(status::etag_matches("\"abc\"", "\"abc\""));
    assert!(status::etag_matches("\"x\", \"abc\"", "\"abc\""));
    assert!(status::etag_matches("W/\"abc\"", "\"abc\""));
    assert!(status::etag_matches("*", "\"abc\""));
    assert!(!status::etag_matches("\"abd\"", "\"abc\""));
  }
}
