//! Handlers for the locally stored user data.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/my/preferred_name` | Body: `{"preferredName":"..."}`; blank clears |
//! | `POST` | `/my/record_first_login` | Kept from the first call only |

use std::sync::Arc;

use axum::{Json, extract::State};
use portal_core::source::{CacheGate, CampusSystems, UserData, UserDataStore};
use portal_feed::FeedService;
use serde::Deserialize;

use crate::{error::ApiError, session::Session};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferredNameBody {
  #[serde(default)]
  pub preferred_name: Option<String>,
}

/// `POST /my/preferred_name`
pub async fn preferred_name<C, S, G>(
  State(service): State<Arc<FeedService<C, S, G>>>,
  Session(session): Session,
  Json(body): Json<PreferredNameBody>,
) -> Result<Json<UserData>, ApiError>
where
  C: CampusSystems,
  S: UserDataStore,
  G: CacheGate,
{
  let ctx = service.authenticate(&session).await;
  let data = service
    .update_preferred_name(&ctx, body.preferred_name.as_deref().unwrap_or_default())
    .await?;
  Ok(Json(data))
}

/// `POST /my/record_first_login`
pub async fn record_first_login<C, S, G>(
  State(service): State<Arc<FeedService<C, S, G>>>,
  Session(session): Session,
) -> Result<Json<UserData>, ApiError>
where
  C: CampusSystems,
  S: UserDataStore,
  G: CacheGate,
{
  let ctx = service.authenticate(&session).await;
  Ok(Json(service.record_first_login(&ctx).await?))
}
