//! Request-scoped orchestration of the student-portal feed.
//!
//! [`FeedService`] fans out to the upstream campus systems with bounded
//! timeouts, reconciles and composes the result through `portal-core`, and
//! caches it behind a [`CacheGate`](portal_core::source::CacheGate).
//! User-data writes go through the same service so that every write
//! invalidates the identity's cache entries.

pub mod cache;
pub mod context;
pub mod error;
pub mod fanout;
pub mod last_modified;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod privileges;
pub mod service;
pub mod validator;

pub use cache::MemoryCache;
pub use context::RequestContext;
pub use error::{Error, Result};
pub use service::{FeedConfig, FeedService};
