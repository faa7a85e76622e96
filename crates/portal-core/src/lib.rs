//! Core types and logic for the student-portal identity and feed layer.
//!
//! This crate is deliberately free of HTTP, database, and runtime
//! dependencies. Upstream campus systems, local storage, and the cache are
//! reached only through the traits in [`source`]; everything else here is a
//! pure function of its inputs.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod academics;
pub mod affiliation;
pub mod attributes;
pub mod auth_state;
pub mod delegation;
pub mod error;
pub mod feed;
pub mod flags;
pub mod identity;
pub mod reconcile;
pub mod roles;
pub mod source;

pub use error::{Error, Result};
