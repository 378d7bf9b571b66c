//! Read-mostly helpers behind the `ping`, `list` and `clear` commands.

use std::fmt;

use mongodb::bson::{Bson, Document};
use serde_json::Value;
use tracing::info;

use crate::store::{DocumentStore, StoreError};

pub const DEFAULT_LIST_LIMIT: i64 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSummary {
    pub database: String,
    pub collections: Vec<String>,
    pub collection: String,
    pub document_count: u64,
}

impl fmt::Display for ConnectionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "connection ok")?;
        writeln!(f, "database: {}", self.database)?;
        writeln!(f, "collections: {}", self.collections.join(", "))?;
        write!(
            f,
            "collection '{}' documents: {}",
            self.collection, self.document_count
        )
    }
}

pub fn test_connection<S: DocumentStore + ?Sized>(
    store: &S,
    collection: &str,
) -> Result<ConnectionSummary, StoreError> {
    store.ping()?;
    let collections = store.list_collection_names()?;
    let document_count = store.count(collection)?;
    info!(collection, document_count, "connection test passed");

    Ok(ConnectionSummary {
        database: store.database_name().to_string(),
        collections,
        collection: collection.to_string(),
        document_count,
    })
}

/// Up to `limit` documents as JSON, with ids and datetimes rendered as strings.
pub fn list_documents<S: DocumentStore + ?Sized>(
    store: &S,
    collection: &str,
    limit: i64,
) -> Result<Vec<Value>, StoreError> {
    let documents = store.find_limited(collection, limit)?;
    Ok(documents.into_iter().map(display_document).collect())
}

pub fn clear_collection<S: DocumentStore + ?Sized>(
    store: &S,
    collection: &str,
) -> Result<u64, StoreError> {
    let deleted = store.delete_all(collection)?;
    info!(collection, deleted, "collection cleared");
    Ok(deleted)
}

pub fn display_document(document: Document) -> Value {
    display_value(Bson::Document(document)).into_relaxed_extjson()
}

fn display_value(value: Bson) -> Bson {
    match value {
        Bson::ObjectId(id) => Bson::String(id.to_hex()),
        Bson::DateTime(datetime) => Bson::String(
            datetime
                .try_to_rfc3339_string()
                .unwrap_or_else(|_| datetime.to_string()),
        ),
        Bson::Document(document) => Bson::Document(
            document
                .into_iter()
                .map(|(key, value)| (key, display_value(value)))
                .collect(),
        ),
        Bson::Array(items) => Bson::Array(items.into_iter().map(display_value).collect()),
        other => other,
    }
}
