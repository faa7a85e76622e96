//! `GET /my/academics`: the academics feed, filtered for delegates.

use std::sync::Arc;

use axum::{Json, extract::State};
use portal_core::{
  academics::AcademicsFeed,
  source::{CacheGate, CampusSystems, UserDataStore},
};
use portal_feed::FeedService;

use crate::{error::ApiError, session::Session};

/// `GET /my/academics`: 403 for a delegate without enrollment or grade
/// privileges.
pub async fn handler<C, S, G>(
  State(service): State<Arc<FeedService<C, S, G>>>,
  Session(session): Session,
) -> Result<Json<AcademicsFeed>, ApiError>
where
  C: CampusSystems,
  S: UserDataStore,
  G: CacheGate,
{
  let ctx = service.authenticate(&session).await;
  Ok(Json(service.academics(&ctx).await?))
}
