use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, Document};

use crate::data::schema::ID_FIELD;
use crate::store::{DocumentStore, StoreError};

/// In-process store with MongoDB-like semantics for `_id` assignment and
/// empty inserts. Single-threaded, like the CLI.
#[derive(Debug, Default)]
pub struct MemoryStore {
    database: String,
    collections: RefCell<BTreeMap<String, Vec<Document>>>,
    fail_inserts: Cell<bool>,
}

impl MemoryStore {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::default()
        }
    }

    /// Seeds `collection` with `documents`, assigning ids where missing.
    pub fn with_collection(self, collection: &str, documents: Vec<Document>) -> Self {
        let seeded = documents.into_iter().map(assign_id).collect();
        self.collections
            .borrow_mut()
            .insert(collection.to_string(), seeded);
        self
    }

    /// Makes every later `insert_many` fail, leaving the collection as it is.
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.set(fail);
    }

    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .borrow()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

impl DocumentStore for MemoryStore {
    fn database_name(&self) -> &str {
        &self.database
    }

    fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn list_collection_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.collections.borrow().keys().cloned().collect())
    }

    fn count(&self, collection: &str) -> Result<u64, StoreError> {
        let collections = self.collections.borrow();
        Ok(collections.get(collection).map_or(0, |docs| docs.len() as u64))
    }

    fn find_limited(&self, collection: &str, limit: i64) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.borrow();
        let Some(documents) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        // Like MongoDB: 0 means no limit, a negative limit caps at its magnitude.
        let take = match limit {
            0 => documents.len(),
            limit => usize::try_from(limit.unsigned_abs()).unwrap_or(usize::MAX),
        };
        Ok(documents.iter().take(take).cloned().collect())
    }

    fn delete_all(&self, collection: &str) -> Result<u64, StoreError> {
        let mut collections = self.collections.borrow_mut();
        let deleted = collections
            .get_mut(collection)
            .map(|docs| std::mem::take(docs).len() as u64)
            .unwrap_or(0);
        Ok(deleted)
    }

    fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<Vec<Bson>, StoreError> {
        if self.fail_inserts.get() {
            return Err(StoreError::operation("insert_many", "simulated insert failure"));
        }
        if documents.is_empty() {
            return Err(StoreError::operation(
                "insert_many",
                "cannot insert an empty batch",
            ));
        }

        let mut collections = self.collections.borrow_mut();
        let target = collections.entry(collection.to_string()).or_default();
        let mut ids = Vec::with_capacity(documents.len());
        for document in documents {
            let document = assign_id(document);
            ids.push(document.get(ID_FIELD).cloned().unwrap_or(Bson::Null));
            target.push(document);
        }
        Ok(ids)
    }
}

fn assign_id(mut document: Document) -> Document {
    if !document.contains_key(ID_FIELD) {
        document.insert(ID_FIELD, ObjectId::new());
    }
    document
}
