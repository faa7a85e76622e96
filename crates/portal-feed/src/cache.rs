//! In-process [`CacheGate`] and the `get_or_compute` helper.
//!
//! Keys are `/`-separated paths rooted at the identity, so invalidating
//! `users/{uid}` drops every cached view of that identity at once. Ids are
//! escaped before they become path segments.

use std::{collections::BTreeMap, future::Future, time::Duration};

use portal_core::{identity::Uid, source::CacheGate};
use serde::{Serialize, de::DeserializeOwned};
use tokio::{sync::RwLock, time::Instant};

// ─── Keys ────────────────────────────────────────────────────────────────────

pub mod keys {
  use super::Uid;

  /// One path segment. `%` and `/` are percent-encoded so that no id can
  /// reach into another id's subtree.
  fn segment(raw: &str) -> String { raw.replace('%', "%25").replace('/', "%2F") }

  /// Root of everything cached for `uid`.
  pub fn user(uid: &Uid) -> String { format!("users/{}", segment(uid.as_str())) }

  /// The status feed of `uid` as seen from one viewing context.
  pub fn status(uid: &Uid, view: &str) -> String {
    format!("{}/status/{}", user(uid), segment(view))
  }

  pub fn academics(uid: &Uid) -> String { format!("{}/academics", user(uid)) }

  pub fn auth_validation(uid: &Uid) -> String { format!("{}/auth-validation", user(uid)) }

  /// Lives outside `users/` so that it survives invalidation.
  pub fn last_modified(uid: &Uid, view: &str) -> String {
    format!("{}/{}", last_modified_root(uid), segment(view))
  }

  pub fn last_modified_root(uid: &Uid) -> String {
    format!("last-modified/{}", segment(uid.as_str()))
  }
}

// ─── MemoryCache ─────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Entry {
  value:      String,
  expires_at: Instant,
}

/// A process-local cache. Last write wins.
#[derive(Debug, Default)]
pub struct MemoryCache {
  entries: RwLock<BTreeMap<String, Entry>>,
}

impl MemoryCache {
  pub fn new() -> Self { Self::default() }
}

impl CacheGate for MemoryCache {
  async fn read(&self, key: &str) -> Option<String> {
    let entries = self.entries.read().await;
    entries
      .get(key)
      .filter(|e| e.expires_at > Instant::now())
      .map(|e| e.value.clone())
  }

  async fn write(&self, key: &str, value: String, ttl: Duration) {
    let now = Instant::now();
    let mut entries = self.entries.write().await;
    entries.retain(|_, e| e.expires_at > now);
    entries.insert(key.to_owned(), Entry {
      value,
      expires_at: now + ttl,
    });
  }

  async fn invalidate(&self, key: &str) {
    let prefix = format!("{key}/");
    let mut entries = self.entries.write().await;
    entries.retain(|k, _| k != key && !k.starts_with(&prefix));
    tracing::debug!(key, "cache invalidated");
  }
}

// ─── get_or_compute ──────────────────────────────────────────────────────────

/// Return the cached value under `key`, or run `compute` and cache its
/// success for `ttl`. Errors are returned uncached. An undecodable entry is
/// treated as a miss.
///
/// Concurrent misses on the same key may each compute; the last write wins.
pub async fn get_or_compute<C, T, E, F, Fut>(
  cache: &C,
  key: &str,
  ttl: Duration,
  compute: F,
) -> Result<T, E>
where
  C: CacheGate,
  T: Serialize + DeserializeOwned,
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<T, E>>,
{
  get_or_compute_with_ttl(cache, key, || async move { compute().await.map(|value| (value, ttl)) })
    .await
}

/// As [`get_or_compute`], with `compute` choosing how long its value lives.
pub async fn get_or_compute_with_ttl<C, T, E, F, Fut>(
  cache: &C,
  key: &str,
  compute: F,
) -> Result<T, E>
where
  C: CacheGate,
  T: Serialize + DeserializeOwned,
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<(T, Duration), E>>,
{
  if let Some(raw) = cache.read(key).await {
    match serde_json::from_str(&raw) {
      Ok(value) => {
        tracing::trace!(key, "cache hit");
        return Ok(value);
      }
      Err(e) => tracing::warn!(key, error = %e, "discarding undecodable cache entry"),
    }
  }

  let (value, ttl) = compute().await?;
  match serde_json::to_string(&value) {
    Ok(raw) => cache.write(key, raw, ttl).await,
    Err(e) => tracing::warn!(key, error = %e, "value not cached"),
  }
  Ok(value)
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;

  const TTL: Duration = Duration::from_secs(60);

  #[tokio::test]
  async fn invalidate_drops_prefix_only() {
    let cache = MemoryCache::new();
    let uid = Uid::from("61889");
    cache.write(&keys::status(&uid, "self"), "1".into(), TTL).await;
    cache.write(&keys::academics(&uid), "2".into(), TTL).await;
    cache.write(&keys::last_modified(&uid, "self"), "3".into(), TTL).await;
    cache.write("users/618890/academics", "4".into(), TTL).await;

    cache.invalidate(&keys::user(&uid)).await;

    assert!(cache.read(&keys::status(&uid, "self")).await.is_none());
    assert!(cache.read(&keys::academics(&uid)).await.is_none());
    assert_eq!(cache.read(&keys::last_modified(&uid, "self")).await.as_deref(), Some("3"));
    assert_eq!(cache.read("users/618890/academics").await.as_deref(), Some("4"));
  }

  #[tokio::test]
  async fn expired_entries_read_as_missing() {
    let cache = MemoryCache::new();
    cache.write("k", "v".into(), Duration::ZERO).await;
    assert!(cache.read("k").await.is_none());
  }

  #[tokio::test]
  async fn slash_in_id_stays_inside_its_subtree() {
    let cache = MemoryCache::new();
    let plain = Uid::from("a");
    let nested = Uid::from("a/b");
    cache.write(&keys::status(&nested, "self"), "1".into(), TTL).await;
    cache.write(&keys::last_modified(&nested, "self"), "2".into(), TTL).await;
    cache.write(&keys::status(&plain, "view/as"), "3".into(), TTL).await;
    assert_ne!(keys::status(&plain, "b/status/self"), keys::status(&nested, "self"));

    cache.invalidate(&keys::user(&plain)).await;
    cache.invalidate(&keys::last_modified_root(&plain)).await;

    assert_eq!(cache.read(&keys::status(&nested, "self")).await.as_deref(), Some("1"));
    assert_eq!(cache.read(&keys::last_modified(&nested, "self")).await.as_deref(), Some("2"));
    assert!(cache.read(&keys::status(&plain, "view/as")).await.is_none());
  }

  #[tokio::test]
  async fn computed_ttl_applies() {
    let cache = MemoryCache::new();
    let short: Result<u8, ()> =
      get_or_compute_with_ttl(&cache, "k", || async { Ok((1, Duration::ZERO)) }).await;
    assert_eq!(short, Ok(1));
    assert!(cache.read("k").await.is_none());

    let long: Result<u8, ()> = get_or_compute_with_ttl(&cache, "k", || async { Ok((2, TTL)) }).await;
    assert_eq!(long, Ok(2));
    assert_eq!(cache.read("k").await.as_deref(), Some("2"));
  }

  #[tokio::test]
  async fn get_or_compute_caches_success() {
    let cache = MemoryCache::new();
    let calls = AtomicUsize::new(0);
    for _ in 0..3 {
      let value: Result<Vec<u8>, ()> = get_or_compute(&cache, "k", TTL, || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![1, 2, 3])
      })
      .await;
      assert_eq!(value, Ok(vec![1, 2, 3]));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn get_or_compute_does_not_cache_errors() {
    let cache = MemoryCache::new();
    let failed: Result<u8, &str> = get_or_compute(&cache, "k", TTL, || async { Err("down") }).await;
    assert_eq!(failed, Err("down"));
    assert!(cache.read("k").await.is_none());

    let ok: Result<u8, &str> = get_or_compute(&cache, "k", TTL, || async { Ok(7) }).await;
    assert_eq!(ok, Ok(7));
  }

  #[tokio::test]
  async fn undecodable_entry_is_recomputed() {
    let cache = MemoryCache::new();
    cache.write("k", "not json".into(), TTL).await;
    let value: Result<u8, ()> = get_or_compute(&cache, "k", TTL, || async { Ok(9) }).await;
    assert_eq!(value, Ok(9));
    assert_eq!(cache.read("k").await.as_deref(), Some("9"));
  }
}
