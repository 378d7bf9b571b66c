//! Document store boundary. The importer and inspection helpers only see
//! [`DocumentStore`]; `mongo` backs it with a MongoDB database and `memory`
//! with an in-process map.

use mongodb::bson::{Bson, Document};

pub mod inspect;
pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("{operation} failed: {message}")]
    Operation {
        operation: &'static str,
        message: String,
    },
}

impl StoreError {
    pub fn operation(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Operation {
            operation,
            message: err.to_string(),
        }
    }
}

/// Operations the tool needs from a document database, scoped to one database.
pub trait DocumentStore {
    fn database_name(&self) -> &str;

    fn ping(&self) -> Result<(), StoreError>;

    fn list_collection_names(&self) -> Result<Vec<String>, StoreError>;

    fn count(&self, collection: &str) -> Result<u64, StoreError>;

    fn find_limited(&self, collection: &str, limit: i64) -> Result<Vec<Document>, StoreError>;

    /// Removes every document; returns how many were deleted.
    fn delete_all(&self, collection: &str) -> Result<u64, StoreError>;

    /// Inserts in order; the store assigns `_id`. Returns the assigned ids.
    fn insert_many(&self, collection: &str, documents: Vec<Document>)
        -> Result<Vec<Bson>, StoreError>;
}
