//! # jotter-store
//!
//! Document-store access layer for the Jotter notes service, backed by
//! MongoDB.
//!
//! The crate exposes an owned, cloneable [`Store`] handle that wraps a
//! `mongodb::Database` and provides typed CRUD helpers for the `notes`
//! collection plus read-only lookups against `users`.  The handle is meant
//! to be constructed once at startup and passed into the HTTP layer as
//! application state; there is no module-global connection.

pub mod models;
pub mod store;

mod error;
mod notes;
mod users;

pub use error::{Result, StoreError};
pub use models::{Note, User};
pub use store::Store;

// Re-exported so callers don't need a direct bson dependency.
pub use mongodb::bson::{self, oid::ObjectId, DateTime};
