//! Store handle construction and startup bootstrap.
//!
//! [`Store::connect`] only validates the URI and builds the client; the
//! driver establishes sockets lazily, so a down database surfaces as an
//! error on the first query rather than here.  Callers that want an eager
//! health signal run [`Store::ping`] and decide for themselves whether a
//! failure is fatal.

use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};

use crate::error::Result;
use crate::models::{Note, User};
use crate::notes::title_collation;

/// Cloneable handle to the `notes` / `users` collections.  Cloning is
/// cheap; all clones share one connection pool.
#[derive(Debug, Clone)]
pub struct Store {
    db: Database,
}

impl Store {
    /// Build a store handle from a finished connection URI (placeholder
    /// substitution is the config layer's job) and a database name.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        Ok(Self {
            db: client.database(db_name),
        })
    }

    /// Round-trip a `ping` command to verify the deployment is reachable.
    pub async fn ping(&self) -> Result<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    /// Create the unique title index (en locale, strength 2) if missing.
    ///
    /// This index is the authoritative uniqueness guarantee; the handler
    /// level duplicate lookup is only a fast path for a friendlier message.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let options = IndexOptions::builder()
            .unique(true)
            .collation(title_collation())
            .build();
        let model = IndexModel::builder()
            .keys(doc! { "title": 1 })
            .options(options)
            .build();
        self.notes().create_index(model).await?;
        tracing::debug!("unique title index ensured");
        Ok(())
    }

    /// Drop the backing database.  Intended for test teardown and ops
    /// tooling, never called on the request path.
    pub async fn drop_database(&self) -> Result<()> {
        self.db.drop().await?;
        Ok(())
    }

    pub(crate) fn notes(&self) -> Collection<Note> {
        self.db.collection("notes")
    }

    pub(crate) fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    use crate::error::StoreError;
    use crate::models::{Note, User};

    // These tests need a reachable deployment and run only when
    // DATABASE_URI is set; without it each returns early.  Every test
    // uses a throwaway database and drops it on the way out.
    async fn live_store() -> Option<Store> {
        let uri = std::env::var("DATABASE_URI").ok()?;
        let name = format!("jst_{}", ObjectId::new().to_hex());
        let store = Store::connect(&uri, &name).await.ok()?;
        store.ping().await.ok()?;
        store.ensure_indexes().await.ok()?;
        Some(store)
    }

    #[tokio::test]
    async fn test_unique_title_index_folds_case() {
        let Some(store) = live_store().await else {
            return;
        };

        let first = Note::new(ObjectId::new(), "Errands".into(), "bank".into());
        let id = store.insert_note(&first).await.unwrap();
        // The returned id is the stored one, not an invented value.
        assert!(store.get_note(id).await.unwrap().is_some());

        let clash = Note::new(ObjectId::new(), "ERRANDS".into(), "post office".into());
        assert!(matches!(
            store.insert_note(&clash).await,
            Err(StoreError::DuplicateTitle)
        ));

        // The collated lookup folds case too, and excluding the note's
        // own id clears the match (self-rename support).
        assert!(store.find_by_title("errands", None).await.unwrap().is_some());
        assert!(store
            .find_by_title("errands", Some(id))
            .await
            .unwrap()
            .is_none());

        store.drop_database().await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let Some(store) = live_store().await else {
            return;
        };

        let note = Note::new(ObjectId::new(), "Ephemeral".into(), "soon gone".into());
        let id = store.insert_note(&note).await.unwrap();

        assert!(store.delete_note(id).await.unwrap());
        assert!(store.get_note(id).await.unwrap().is_none());
        assert!(!store.delete_note(id).await.unwrap());

        store.drop_database().await.unwrap();
    }

    #[tokio::test]
    async fn test_usernames_resolve_known_ids_only() {
        let Some(store) = live_store().await else {
            return;
        };

        let user = User {
            id: ObjectId::new(),
            username: "dana".into(),
        };
        store.users().insert_one(&user).await.unwrap();

        let unknown = ObjectId::new();
        let map = store.usernames_by_id(&[user.id, unknown]).await.unwrap();
        assert_eq!(map.get(&user.id).map(String::as_str), Some("dana"));
        assert!(!map.contains_key(&unknown));

        store.drop_database().await.unwrap();
    }
}
