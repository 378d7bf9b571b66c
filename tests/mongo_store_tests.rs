//! Runs against a live MongoDB only when NEWSLOADER_TEST_URI is set, e.g.
//! `NEWSLOADER_TEST_URI=mongodb://localhost:27017/newsloader_test cargo test`.

use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;

use newsloader::config::StoreConfig;
use newsloader::data::import::import_file;
use newsloader::data::schema::{PrimaryLanguage, RecordSchema};
use newsloader::data::timestamp::TimestampPolicy;
use newsloader::store::inspect::{clear_collection, list_documents, test_connection};
use newsloader::store::{DocumentStore, MongoStore};

fn test_store(collection: &str) -> Option<(MongoStore, StoreConfig)> {
    let Ok(uri) = std::env::var("NEWSLOADER_TEST_URI") else {
        eprintln!("Skipping: NEWSLOADER_TEST_URI not set");
        return None;
    };
    let config = StoreConfig {
        connection_string: uri,
        collection: collection.to_string(),
        database: None,
    };
    let store = MongoStore::connect(&config).expect("test database should be reachable");
    Some((store, config))
}

fn unique_name(prefix: &str) -> String {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    format!("{prefix}_{stamp}")
}

#[test]
fn import_list_and_clear_round_trip() {
    let collection = unique_name("news");
    let Some((store, config)) = test_store(&collection) else {
        return;
    };

    let path = std::env::temp_dir().join(format!("{collection}.json"));
    let payload = json!([
        {
            "_id": "will-be-dropped",
            "semanticId": "a1",
            "title": {"cn": "标题", "en": "Title"},
            "summary": {"cn": "摘要", "en": "Summary"},
            "category": {"cn": "分类", "en": "Cat"},
            "views": 5,
            "publishTime": "2024-01-01T00:00:00Z"
        }
    ]);
    fs::write(&path, payload.to_string()).expect("fixture should be written");

    let schema = RecordSchema::import(PrimaryLanguage::Cn);
    for _ in 0..2 {
        let report = import_file(&store, &config.collection, &path, &schema, TimestampPolicy::Substitute)
            .expect("import should succeed");
        assert_eq!(report.inserted_count, 1);
    }

    let summary = test_connection(&store, &config.collection).expect("ping should succeed");
    assert_eq!(summary.document_count, 1);
    assert!(summary.collections.contains(&config.collection));

    let documents = list_documents(&store, &config.collection, 50).expect("find should succeed");
    assert_eq!(documents.len(), 1);
    assert_ne!(documents[0]["_id"], "will-be-dropped");
    assert_eq!(documents[0]["publishTime"], "2024-01-01T00:00:00Z");

    assert_eq!(clear_collection(&store, &config.collection).expect("clear should succeed"), 1);
    assert_eq!(store.count(&config.collection).expect("count should succeed"), 0);

    let _ = fs::remove_file(path);
}
