//! Domain model structs persisted in the document store.
//!
//! Field names are camelCase on the wire to match the collection schema
//! (`createdAt`, `updatedAt`); `_id` is omitted from serialization until
//! the store has assigned one.

use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Note
// ---------------------------------------------------------------------------

/// A single note record in the `notes` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Store-assigned identifier; `None` until inserted, immutable after.
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Owning user's id.  Referential existence is not enforced here.
    pub user: ObjectId,
    /// Unique under en-locale strength-2 collation (case/accent folding).
    pub title: String,
    /// Free-text body.
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Note {
    /// Build a fresh, not-yet-persisted note. `completed` starts false.
    pub fn new(user: ObjectId, title: String, text: String) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            user,
            title,
            text,
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// The slice of a `users` document this service reads.  User records are
/// created and managed elsewhere; only `username` is consumed here, to
/// enrich note listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub username: String,
}
