//! Typed CRUD helpers for the `notes` collection.

use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::{Collation, CollationStrength};

use crate::error::{is_duplicate_key, Result, StoreError};
use crate::models::Note;
use crate::store::Store;

/// Comparison rule for title matching: English locale, strength 2, so
/// "Groceries", "GROCERIES" and "Grocerîes" all collide.
pub(crate) fn title_collation() -> Collation {
    Collation::builder()
        .locale("en")
        .strength(CollationStrength::Secondary)
        .build()
}

impl Store {
    /// Fetch every note in the store's natural order.
    pub async fn list_notes(&self) -> Result<Vec<Note>> {
        let cursor = self.notes().find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn get_note(&self, id: ObjectId) -> Result<Option<Note>> {
        Ok(self.notes().find_one(doc! { "_id": id }).await?)
    }

    /// Look up a note whose title collates equal to `title`, optionally
    /// excluding one id (so a note may keep or re-case its own title).
    pub async fn find_by_title(
        &self,
        title: &str,
        exclude: Option<ObjectId>,
    ) -> Result<Option<Note>> {
        let mut filter = doc! { "title": title };
        if let Some(id) = exclude {
            filter.insert("_id", doc! { "$ne": id });
        }
        Ok(self
            .notes()
            .find_one(filter)
            .collation(title_collation())
            .await?)
    }

    /// Insert a new note, returning its assigned id.
    ///
    /// A duplicate-key error from the unique title index maps to
    /// [`StoreError::DuplicateTitle`] so the race the pre-check cannot
    /// close still reports as a conflict, not a server fault.
    pub async fn insert_note(&self, note: &Note) -> Result<ObjectId> {
        let result = self.notes().insert_one(note).await.map_err(|e| {
            if is_duplicate_key(&e) {
                StoreError::DuplicateTitle
            } else {
                StoreError::Mongo(e)
            }
        })?;
        // Note leaves `_id` unset, so the driver generates an ObjectId;
        // anything else and the assigned id cannot be reported truthfully.
        result
            .inserted_id
            .as_object_id()
            .ok_or(StoreError::MissingInsertId)
    }

    /// Persist the four mutable fields of `note` wholesale, refreshing
    /// `updatedAt`.  The note must already carry its id.
    pub async fn update_note(&self, id: ObjectId, note: &Note) -> Result<()> {
        let update = doc! {
            "$set": {
                "user": note.user,
                "title": note.title.as_str(),
                "text": note.text.as_str(),
                "completed": note.completed,
                "updatedAt": note.updated_at,
            }
        };
        self.notes()
            .update_one(doc! { "_id": id }, update)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    StoreError::DuplicateTitle
                } else {
                    StoreError::Mongo(e)
                }
            })?;
        Ok(())
    }

    /// Delete by id; returns whether a record was actually removed.
    pub async fn delete_note(&self, id: ObjectId) -> Result<bool> {
        let result = self.notes().delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}
