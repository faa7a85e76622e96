//! SQLite backend for the portal's local user data.
//!
//! The preferred-name override and the first-login stamp are the only state
//! the portal persists itself. Everything else is recomputed from upstream.
//! Access goes through [`tokio_rusqlite`] so queries run off the async
//! runtime.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteUserDataStore;
