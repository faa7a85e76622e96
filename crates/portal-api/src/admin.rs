//! `DELETE /admin/users/{uid}`: remove all stored data for a user.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use portal_core::{
  identity::Uid,
  source::{CacheGate, CampusSystems, UserDataStore},
};
use portal_feed::FeedService;
use serde_json::{Value, json};

use crate::{error::ApiError, session::Session};

/// Responds `{"deleted": bool}`; `false` when nothing was stored.
pub async fn delete_user<C, S, G>(
  State(service): State<Arc<FeedService<C, S, G>>>,
  Session(session): Session,
  Path(uid): Path<String>,
) -> Result<Json<Value>, ApiError>
where
  C: CampusSystems,
  S: UserDataStore,
  G: CacheGate,
{
  let ctx = service.authenticate(&session).await;
  let deleted = service.delete_user(&ctx, &Uid::new(uid)).await?;
  Ok(Json(json!({ "deleted": deleted })))
}
