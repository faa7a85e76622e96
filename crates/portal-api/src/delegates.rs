//! `GET /my/delegate_students`

use std::sync::Arc;

use axum::{Json, extract::State};
use portal_core::{
  delegation::DelegateStudentView,
  source::{CacheGate, CampusSystems, UserDataStore},
};
use portal_feed::FeedService;
use serde::Serialize;

use crate::{error::ApiError, session::Session};

#[derive(Debug, Serialize)]
pub struct DelegateStudentsResponse {
  pub students: Vec<DelegateStudentView>,
}

pub async fn handler<C, S, G>(
  State(service): State<Arc<FeedService<C, S, G>>>,
  Session(session): Session,
) -> Result<Json<DelegateStudentsResponse>, ApiError>
where
  C: CampusSystems,
  S: UserDataStore,
  G: CacheGate,
{
  let ctx = service.authenticate(&session).await;
  let students = service.delegate_students(&ctx).await?;
  Ok(Json(DelegateStudentsResponse { students }))
}
