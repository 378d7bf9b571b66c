use mongodb::bson::{doc, Bson, Document};
use mongodb::sync::{Client, Collection, Database};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::store::{DocumentStore, StoreError};

/// Blocking MongoDB client bound to one database. The client is released
/// when the store is dropped, so each command holds it for its own duration.
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    pub fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(&config.connection_string)
            .map_err(|err| StoreError::Connection(err.to_string()))?;

        let database = match config.database.as_deref() {
            Some(name) => client.database(name),
            None => client.default_database().ok_or_else(|| {
                StoreError::Connection(
                    "connection string does not name a database; pass --database".to_string(),
                )
            })?,
        };

        info!(database = database.name(), "opened MongoDB client");
        Ok(Self { client, database })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection::<Document>(name)
    }
}

impl Drop for MongoStore {
    fn drop(&mut self) {
        debug!(database = self.database.name(), "releasing MongoDB client");
    }
}

impl DocumentStore for MongoStore {
    fn database_name(&self) -> &str {
        self.database.name()
    }

    fn ping(&self) -> Result<(), StoreError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .run()
            .map_err(|err| StoreError::Connection(err.to_string()))?;
        Ok(())
    }

    fn list_collection_names(&self) -> Result<Vec<String>, StoreError> {
        let mut names = self
            .database
            .list_collection_names()
            .run()
            .map_err(|err| StoreError::operation("list_collection_names", err))?;
        names.sort();
        Ok(names)
    }

    fn count(&self, collection: &str) -> Result<u64, StoreError> {
        self.collection(collection)
            .count_documents(doc! {})
            .run()
            .map_err(|err| StoreError::operation("count_documents", err))
    }

    fn find_limited(&self, collection: &str, limit: i64) -> Result<Vec<Document>, StoreError> {
        let cursor = self
            .collection(collection)
            .find(doc! {})
            .limit(limit)
            .run()
            .map_err(|err| StoreError::operation("find", err))?;
        cursor
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| StoreError::operation("find", err))
    }

    fn delete_all(&self, collection: &str) -> Result<u64, StoreError> {
        let result = self
            .collection(collection)
            .delete_many(doc! {})
            .run()
            .map_err(|err| StoreError::operation("delete_many", err))?;
        debug!(collection, deleted = result.deleted_count, "deleted documents");
        Ok(result.deleted_count)
    }

    fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<Vec<Bson>, StoreError> {
        let result = self
            .collection(collection)
            .insert_many(documents)
            .run()
            .map_err(|err| StoreError::operation("insert_many", err))?;

        let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(index, _)| *index);
        debug!(collection, inserted = ids.len(), "inserted documents");
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }
}
