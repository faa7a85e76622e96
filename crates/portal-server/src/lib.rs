//! Student portal server.
//!
//! Wires the fixture-backed campus systems, the SQLite user-data store, and
//! the in-process cache into a [`FeedService`], and mounts the API behind
//! the session gateway.

pub mod fixtures;
pub mod gateway;
pub mod normalize;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{Router, middleware};
use portal_core::{
  flags::FeatureFlags,
  source::{CacheGate, CampusSystems, UserDataStore},
};
use portal_feed::{FeedConfig, FeedService};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `PORTAL_*` environment variables.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                    String,
  pub port:                    u16,
  pub store_path:              PathBuf,
  /// Root of the per-collaborator fixture directories.
  pub fixtures_dir:            PathBuf,
  pub upstream_timeout_ms:     u64,
  pub cache_ttl_secs:          u64,
  /// Lifetime of a feed composed while an upstream was failing.
  pub failure_ttl_secs:        u64,
  pub held_applicant_ttl_secs: u64,
  pub features:                FeatureFlags,
}

impl Default for ServerConfig {
  fn default() -> Self {
    let feed = FeedConfig::default();
    Self {
      host:                    "127.0.0.1".to_owned(),
      port:                    3000,
      store_path:              PathBuf::from("portal.db"),
      fixtures_dir:            PathBuf::from("fixtures"),
      upstream_timeout_ms:     feed.upstream_timeout.as_millis() as u64,
      cache_ttl_secs:          feed.cache_ttl.as_secs(),
      failure_ttl_secs:        feed.failure_ttl.as_secs(),
      held_applicant_ttl_secs: feed.held_applicant_ttl.as_secs(),
      features:                feed.flags,
    }
  }
}

impl ServerConfig {
  pub fn feed_config(&self) -> FeedConfig {
    FeedConfig {
      flags:              self.features,
      upstream_timeout:   Duration::from_millis(self.upstream_timeout_ms),
      cache_ttl:          Duration::from_secs(self.cache_ttl_secs),
      failure_ttl:        Duration::from_secs(self.failure_ttl_secs),
      held_applicant_ttl: Duration::from_secs(self.held_applicant_ttl_secs),
    }
  }
}

// ─── Application ──────────────────────────────────────────────────────────────

/// The API router behind the session gateway, with request tracing.
pub fn app<C, S, G>(service: Arc<FeedService<C, S, G>>) -> Router
where
  C: CampusSystems + 'static,
  S: UserDataStore + 'static,
  G: CacheGate + 'static,
{
  portal_api::api_router(service)
    .layer(middleware::from_fn(gateway::attach_session))
    .layer(TraceLayer::new_for_http())
}
