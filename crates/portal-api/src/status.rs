//! `GET /my/status`: the composed user feed.
//!
//! The feed's content hash doubles as a strong ETag; a matching
//! `If-None-Match` gets `304 Not Modified` with no body.

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
  http::{HeaderMap, StatusCode, header},
  response::{IntoResponse, Response},
};
use portal_core::source::{CacheGate, CampusSystems, UserDataStore};
use portal_feed::FeedService;

use crate::{error::ApiError, session::Session};

/// True if `etag` is listed in an `If-None-Match` header value.
pub fn etag_matches(if_none_match: &str, etag: &str) -> bool {
  if_none_match
    .split(',')
    .map(str::trim)
    .any(|candidate| candidate == "*" || candidate.trim_start_matches("W/") == etag)
}

/// `GET /my/status`
pub async fn handler<C, S, G>(
  State(service): State<Arc<FeedService<C, S, G>>>,
  Session(session): Session,
  headers: HeaderMap,
) -> Result<Response, ApiError>
where
  C: CampusSystems,
  S: UserDataStore,
  G: CacheGate,
{
  let ctx = service.authenticate(&session).await;
  let feed = service.get_feed(&ctx).await?;

  let Some(etag) = feed.last_modified.as_ref().map(|lm| format!("\"{}\"", lm.hash)) else {
    return Ok(Json(feed).into_response());
  };
  let not_modified = headers
    .get(header::IF_NONE_MATCH)
    .and_then(|v| v.to_str().ok())
    .is_some_and(|v| etag_matches(v, &etag));

  if not_modified {
    Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response())
  } else {
    Ok(([(header::ETAG, etag)], Json(feed)).into_response())
  }
}
