//! Read-only lookups against the `users` collection.

use std::collections::HashMap;

use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};

use crate::error::Result;
use crate::models::User;
use crate::store::Store;

impl Store {
    /// Resolve a batch of user ids to usernames in one query.
    ///
    /// Ids that match no user are simply absent from the map; callers
    /// treat that as "owner unknown" rather than an error.
    pub async fn usernames_by_id(&self, ids: &[ObjectId]) -> Result<HashMap<ObjectId, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let filter = doc! { "_id": { "$in": ids.to_vec() } };
        let cursor = self.users().find(filter).await?;
        let users: Vec<User> = cursor.try_collect().await?;
        Ok(users.into_iter().map(|u| (u.id, u.username)).collect())
    }
}
