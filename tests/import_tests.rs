use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use mongodb::bson::{doc, Bson};
use serde_json::{json, Value};

use newsloader::data::import::{import_file, plan_records, ImportError, PREVIEW_LIMIT};
use newsloader::data::schema::{PrimaryLanguage, RecordSchema};
use newsloader::data::timestamp::TimestampPolicy;
use newsloader::store::{DocumentStore, MemoryStore};

const COLLECTION: &str = "news";

fn unique_temp_path(name: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("newsloader-{name}-{stamp}.json"))
}

fn write_fixture(name: &str, payload: &Value) -> PathBuf {
    let path = unique_temp_path(name);
    fs::write(&path, payload.to_string()).expect("fixture should be written");
    path
}

fn record(semantic_id: &str, publish_time: &str) -> Value {
    json!({
        "semanticId": semantic_id,
        "title": {"cn": format!("标题 {semantic_id}"), "en": "Title"},
        "summary": {"cn": "摘要", "en": "Summary"},
        "category": {"cn": "分类", "en": "Cat"},
        "views": 5,
        "publishTime": publish_time
    })
}

fn seeded_store() -> MemoryStore {
    MemoryStore::new("ai-news").with_collection(
        COLLECTION,
        vec![
            doc! { "semanticId": "old-1" },
            doc! { "semanticId": "old-2" },
            doc! { "semanticId": "old-3" },
        ],
    )
}

fn schema() -> RecordSchema {
    RecordSchema::import(PrimaryLanguage::Cn)
}

#[test]
fn import_replaces_collection_and_parses_utc_timestamp() {
    let store = seeded_store();
    let path = write_fixture("example", &json!([record("a1", "2024-01-01T00:00:00Z")]));

    let report = import_file(&store, COLLECTION, &path, &schema(), TimestampPolicy::Substitute)
        .expect("import should succeed");

    assert_eq!(report.inserted_count, 1);
    assert_eq!(report.deleted_count, 3);
    assert!(report.repairs.is_empty());

    let documents = store.documents(COLLECTION);
    assert_eq!(documents.len(), 1);
    let stored = &documents[0];
    assert!(matches!(stored.get("_id"), Some(Bson::ObjectId(_))));
    assert_eq!(stored.get_str("semanticId").ok(), Some("a1"));
    let publish_time = stored
        .get_datetime("publishTime")
        .expect("publishTime should be a datetime");
    assert_eq!(publish_time.timestamp_millis(), 1_704_067_200_000);

    let _ = fs::remove_file(path);
}

#[test]
fn existing_ids_are_dropped_before_insert() {
    let store = MemoryStore::new("ai-news");
    let mut with_id = record("a1", "2024-01-01T00:00:00Z");
    with_id["_id"] = json!("67a1b2c3d4e5f67890123456");
    let path = write_fixture("with-id", &json!([with_id]));

    import_file(&store, COLLECTION, &path, &schema(), TimestampPolicy::Substitute)
        .expect("import should succeed");

    let documents = store.documents(COLLECTION);
    assert!(matches!(documents[0].get("_id"), Some(Bson::ObjectId(_))));

    let _ = fs::remove_file(path);
}

#[test]
fn importing_twice_gives_the_same_count() {
    let store = seeded_store();
    let payload = json!([
        record("a1", "2024-01-01T00:00:00Z"),
        record("a2", "2024-02-01T08:00:00+08:00"),
    ]);
    let path = write_fixture("twice", &payload);

    for _ in 0..2 {
        import_file(&store, COLLECTION, &path, &schema(), TimestampPolicy::Substitute)
            .expect("import should succeed");
        assert_eq!(store.count(COLLECTION).unwrap(), 2);
    }

    let _ = fs::remove_file(path);
}

#[test]
fn validation_failure_leaves_collection_untouched() {
    let store = seeded_store();
    let path = write_fixture("invalid", &json!([{"semanticId": "a1"}]));
    let before = store.count(COLLECTION).unwrap();

    let err = import_file(&store, COLLECTION, &path, &schema(), TimestampPolicy::Substitute)
        .expect_err("import should be rejected");

    match err {
        ImportError::ValidationFailure { message, report } => {
            assert!(message.contains("document 1 missing required field: views"));
            assert!(report.has_errors());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.count(COLLECTION).unwrap(), before);

    let _ = fs::remove_file(path);
}

#[test]
fn unparseable_timestamp_is_replaced_with_import_time() {
    let store = MemoryStore::new("ai-news");
    let path = write_fixture("bad-time", &json!([record("a1", "last week")]));
    let started = Utc::now().timestamp_millis();

    let report = import_file(&store, COLLECTION, &path, &schema(), TimestampPolicy::Substitute)
        .expect("import should still succeed");

    assert_eq!(report.inserted_count, 1);
    assert_eq!(report.repairs.len(), 1);
    assert_eq!(report.repairs[0].document, 1);
    assert_eq!(report.repairs[0].original, "last week");

    let documents = store.documents(COLLECTION);
    let stored = documents[0]
        .get_datetime("publishTime")
        .expect("publishTime should be a datetime");
    assert!(stored.timestamp_millis() >= started);

    let _ = fs::remove_file(path);
}

#[test]
fn loose_iso_forms_are_kept_rather_than_replaced() {
    let store = MemoryStore::new("ai-news");
    let path = write_fixture(
        "loose-iso",
        &json!([
            record("a1", "2024-03-02 08:15"),
            record("a2", "2024-03-02T08"),
            record("a3", "2024-03-02 08:15+08:00"),
        ]),
    );

    let report = import_file(&store, COLLECTION, &path, &schema(), TimestampPolicy::Reject)
        .expect("every timestamp should parse");
    assert!(report.repairs.is_empty());

    let millis: Vec<i64> = store
        .documents(COLLECTION)
        .iter()
        .map(|document| {
            document
                .get_datetime("publishTime")
                .expect("publishTime should be a datetime")
                .timestamp_millis()
        })
        .collect();
    assert_eq!(millis, vec![1_709_367_300_000, 1_709_366_400_000, 1_709_338_500_000]);

    let _ = fs::remove_file(path);
}

#[test]
fn strict_policy_rejects_bad_timestamp_before_deleting() {
    let store = seeded_store();
    let path = write_fixture(
        "strict",
        &json!([record("a1", "2024-01-01T00:00:00Z"), record("a2", "soon")]),
    );

    let err = import_file(&store, COLLECTION, &path, &schema(), TimestampPolicy::Reject)
        .expect_err("strict import should fail");

    assert!(matches!(
        err,
        ImportError::InvalidTimestamp { document: 2, ref value } if value == "soon"
    ));
    assert_eq!(store.count(COLLECTION).unwrap(), 3);

    let _ = fs::remove_file(path);
}

#[test]
fn missing_file_and_malformed_json_are_reported() {
    let store = seeded_store();

    let missing = unique_temp_path("missing");
    let err = import_file(&store, COLLECTION, &missing, &schema(), TimestampPolicy::Substitute)
        .expect_err("missing file should fail");
    assert!(matches!(err, ImportError::FileNotFound(ref path) if path == &missing));

    let malformed = unique_temp_path("malformed");
    fs::write(&malformed, "[{\"semanticId\": ").expect("fixture should be written");
    let err = import_file(&store, COLLECTION, &malformed, &schema(), TimestampPolicy::Substitute)
        .expect_err("malformed json should fail");
    assert!(matches!(err, ImportError::MalformedInput(_)));
    assert!(err.to_string().contains("cannot be parsed"));

    assert_eq!(store.count(COLLECTION).unwrap(), 3);
    let _ = fs::remove_file(malformed);
}

#[test]
fn failed_insert_reports_partial_replace() {
    let store = seeded_store();
    store.fail_inserts(true);
    let path = write_fixture("partial", &json!([record("a1", "2024-01-01T00:00:00Z")]));

    let err = import_file(&store, COLLECTION, &path, &schema(), TimestampPolicy::Substitute)
        .expect_err("insert failure should surface");

    match err {
        ImportError::PartialReplace {
            collection,
            deleted,
            ..
        } => {
            assert_eq!(collection, COLLECTION);
            assert_eq!(deleted, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.count(COLLECTION).unwrap(), 0);

    let _ = fs::remove_file(path);
}

#[test]
fn empty_batch_clears_collection_without_inserting() {
    let store = seeded_store();
    let path = write_fixture("empty", &json!([]));

    let report = import_file(&store, COLLECTION, &path, &schema(), TimestampPolicy::Substitute)
        .expect("empty import should succeed");

    assert_eq!(report.inserted_count, 0);
    assert_eq!(report.deleted_count, 3);
    assert_eq!(store.count(COLLECTION).unwrap(), 0);

    let _ = fs::remove_file(path);
}

#[test]
fn plan_previews_first_five_records() {
    let records: Vec<Value> = (1..=7)
        .map(|index| record(&format!("n{index}"), "2024-01-01"))
        .collect();

    let plan = plan_records(
        Value::Array(records),
        Path::new("news_data.json"),
        &schema(),
        TimestampPolicy::Substitute,
        Utc::now(),
    )
    .expect("plan should succeed");

    assert_eq!(plan.documents.len(), 7);
    assert_eq!(plan.preview.len(), PREVIEW_LIMIT);
    assert_eq!(plan.preview[0].semantic_id.as_deref(), Some("n1"));
    assert_eq!(plan.preview[0].title.as_deref(), Some("标题 n1"));

    let rendered = plan.to_string();
    assert!(rendered.contains("documents ready: 7"));
    assert!(rendered.contains("document 5: n5 - 标题 n5"));
    assert!(rendered.contains("... 2 more documents"));
}

#[test]
fn report_lists_counts_and_source() {
    let store = MemoryStore::new("ai-news");
    let path = write_fixture("report", &json!([record("a1", "2024-01-01T00:00:00Z")]));

    let report = import_file(&store, COLLECTION, &path, &schema(), TimestampPolicy::Substitute)
        .expect("import should succeed");
    let rendered = report.to_string();

    assert!(rendered.starts_with("import complete"));
    assert!(rendered.contains(&format!("file: {}", path.display())));
    assert!(rendered.contains("inserted documents: 1"));
    assert!(rendered.contains("validation: validation passed"));
    assert!(rendered.contains("document 1: a1 - 标题 a1"));

    let _ = fs::remove_file(path);
}
