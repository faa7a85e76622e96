//! Content-hash change detection for composed feeds.
//!
//! The stamp for a feed only moves when its content hash changes, so a cache
//! re-warm that recomputes identical content keeps the old timestamp.

use std::time::Duration;

use chrono::Utc;
use portal_core::{feed::LastModified, source::CacheGate};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::Result;

/// Stamps outlive the cached feeds they describe.
pub const LAST_MODIFIED_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Hex SHA-256 of the JSON serialisation of `value`.
pub fn content_hash<T: Serialize>(value: &T) -> Result<String> {
  let bytes = serde_json::to_vec(value)?;
  Ok(hex::encode(Sha256::digest(&bytes)))
}

/// The stamp for `hash` under `key`, advancing the timestamp only if the
/// stored hash differs.
pub async fn stamp<G: CacheGate>(cache: &G, key: &str, hash: String) -> LastModified {
  let previous = cache
    .read(key)
    .await
    .and_then(|raw| serde_json::from_str::<LastModified>(&raw).ok());
  if let Some(previous) = previous.filter(|p| p.hash == hash) {
    return previous;
  }

  let current = LastModified {
    hash,
    timestamp: Utc::now(),
  };
  match serde_json::to_string(&current) {
    Ok(raw) => cache.write(key, raw, LAST_MODIFIED_TTL).await,
    Err(e) => tracing::warn!(key, error = %e, "last-modified stamp not stored"),
  }
  current
}
