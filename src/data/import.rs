use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use mongodb::bson::{self, Document};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::data::schema::{
    PrimaryLanguage, RecordSchema, ID_FIELD, PUBLISH_TIME_FIELD, SEMANTIC_ID_FIELD, TITLE_FIELD,
};
use crate::data::timestamp::{parse_iso8601, to_bson_datetime, TimestampPolicy};
use crate::data::validate::{validate_records, ValidationReport, NOT_AN_ARRAY};
use crate::store::{DocumentStore, StoreError};

/// Number of imported records listed in the summary.
pub const PREVIEW_LIMIT: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("JSON file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to read '{}': {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON file is malformed and cannot be parsed: {0}")]
    MalformedInput(#[source] serde_json::Error),

    #[error("validation failed:\n{message}")]
    ValidationFailure {
        message: String,
        report: ValidationReport,
    },

    #[error("document {document} has unparseable publishTime '{value}'")]
    InvalidTimestamp { document: usize, value: String },

    #[error("document {document} cannot be stored: {message}")]
    Conversion { document: usize, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(
        "collection '{collection}' was emptied ({deleted} documents removed) but the new batch \
         was not inserted; the collection is incomplete: {source}"
    )]
    PartialReplace {
        collection: String,
        deleted: u64,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampRepair {
    pub document: usize,
    pub original: String,
    pub replacement: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPreview {
    pub semantic_id: Option<String>,
    pub title: Option<String>,
}

impl RecordPreview {
    pub fn from_object(object: &Map<String, Value>, language: PrimaryLanguage) -> Self {
        Self {
            semantic_id: object
                .get(SEMANTIC_ID_FIELD)
                .and_then(Value::as_str)
                .map(str::to_string),
            title: object
                .get(TITLE_FIELD)
                .and_then(|title| title.get(language.key()))
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

impl fmt::Display for RecordPreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.semantic_id.as_deref().unwrap_or("<no id>"),
            self.title.as_deref().unwrap_or("<no title>")
        )
    }
}

/// A validated, fully transformed batch. Nothing has been written yet.
#[derive(Debug, Clone)]
pub struct ImportPlan {
    pub source_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub validation: ValidationReport,
    pub documents: Vec<Document>,
    pub repairs: Vec<TimestampRepair>,
    pub preview: Vec<RecordPreview>,
}

impl fmt::Display for ImportPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "dry run: nothing was written")?;
        writeln!(f, "file: {}", self.source_path.display())?;
        writeln!(f, "documents ready: {}", self.documents.len())?;
        writeln!(f, "validation: {}", self.validation.message())?;
        write_repairs(f, &self.repairs)?;
        write_preview(f, &self.preview, self.documents.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub source_path: String,
    pub collection: String,
    pub inserted_count: usize,
    pub deleted_count: u64,
    pub imported_at: String,
    pub validation_message: String,
    pub repairs: Vec<TimestampRepair>,
    pub preview: Vec<RecordPreview>,
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "import complete")?;
        writeln!(f, "file: {}", self.source_path)?;
        writeln!(f, "collection: {}", self.collection)?;
        writeln!(f, "inserted documents: {}", self.inserted_count)?;
        writeln!(f, "removed documents: {}", self.deleted_count)?;
        writeln!(f, "validation: {}", self.validation_message)?;
        writeln!(f, "imported at: {}", self.imported_at)?;
        write_repairs(f, &self.repairs)?;
        write_preview(f, &self.preview, self.inserted_count)
    }
}

fn write_repairs(f: &mut fmt::Formatter<'_>, repairs: &[TimestampRepair]) -> fmt::Result {
    if repairs.is_empty() {
        return Ok(());
    }
    writeln!(f, "replaced publishTime values: {}", repairs.len())?;
    for repair in repairs {
        writeln!(
            f,
            "  document {}: '{}' -> {}",
            repair.document, repair.original, repair.replacement
        )?;
    }
    Ok(())
}

fn write_preview(f: &mut fmt::Formatter<'_>, preview: &[RecordPreview], total: usize) -> fmt::Result {
    if preview.is_empty() {
        return Ok(());
    }
    write!(f, "documents:")?;
    for (offset, entry) in preview.iter().enumerate() {
        write!(f, "\ndocument {}: {entry}", offset + 1)?;
    }
    if total > preview.len() {
        write!(f, "\n... {} more documents", total - preview.len())?;
    }
    Ok(())
}

/// Reads and parses a JSON file, distinguishing a missing file from bad JSON.
pub fn read_payload(path: &Path) -> Result<Value, ImportError> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.to_path_buf()));
    }
    let raw = fs::read_to_string(path).map_err(|source| ImportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(ImportError::MalformedInput)
}

pub fn plan_import(
    path: &Path,
    schema: &RecordSchema,
    policy: TimestampPolicy,
) -> Result<ImportPlan, ImportError> {
    let started_at = Utc::now();
    let payload = read_payload(path)?;
    plan_records(payload, path, schema, policy, started_at)
}

/// Validates `payload` and converts every record to a BSON document:
/// `_id` is dropped and string `publishTime` values become datetimes.
pub fn plan_records(
    payload: Value,
    source_path: &Path,
    schema: &RecordSchema,
    policy: TimestampPolicy,
    started_at: DateTime<Utc>,
) -> Result<ImportPlan, ImportError> {
    let validation = validate_records(&payload, schema);
    if validation.has_errors() {
        warn!(
            path = %source_path.display(),
            errors = validation.errors().count(),
            "import rejected by validation"
        );
        return Err(ImportError::ValidationFailure {
            message: validation.message(),
            report: validation,
        });
    }
    for warning in validation.warnings() {
        debug!(%warning, "validation warning");
    }

    let Value::Array(records) = payload else {
        return Err(ImportError::ValidationFailure {
            message: NOT_AN_ARRAY.to_string(),
            report: validation,
        });
    };

    let mut documents = Vec::with_capacity(records.len());
    let mut repairs = Vec::new();
    let mut preview = Vec::new();

    for (offset, record) in records.into_iter().enumerate() {
        let position = offset + 1;
        let Value::Object(mut object) = record else {
            return Err(ImportError::Conversion {
                document: position,
                message: "not an object".to_string(),
            });
        };
        object.remove(ID_FIELD);

        let publish_time = match object.get(PUBLISH_TIME_FIELD) {
            Some(Value::String(raw)) => Some(normalize_publish_time(
                raw,
                position,
                policy,
                started_at,
                &mut repairs,
            )?),
            _ => None,
        };

        if preview.len() < PREVIEW_LIMIT {
            preview.push(RecordPreview::from_object(&object, schema.primary_language));
        }

        let mut document = bson::to_document(&object).map_err(|err| ImportError::Conversion {
            document: position,
            message: err.to_string(),
        })?;
        if let Some(publish_time) = publish_time {
            document.insert(PUBLISH_TIME_FIELD, publish_time);
        }
        documents.push(document);
    }

    Ok(ImportPlan {
        source_path: source_path.to_path_buf(),
        started_at,
        validation,
        documents,
        repairs,
        preview,
    })
}

fn normalize_publish_time(
    raw: &str,
    position: usize,
    policy: TimestampPolicy,
    started_at: DateTime<Utc>,
    repairs: &mut Vec<TimestampRepair>,
) -> Result<bson::DateTime, ImportError> {
    if let Some(parsed) = parse_iso8601(raw) {
        return Ok(to_bson_datetime(&parsed));
    }

    match policy {
        TimestampPolicy::Reject => Err(ImportError::InvalidTimestamp {
            document: position,
            value: raw.to_string(),
        }),
        TimestampPolicy::Substitute => {
            let replacement = started_at.to_rfc3339_opts(SecondsFormat::Millis, true);
            warn!(
                document = position,
                original = raw,
                replacement = %replacement,
                "publishTime is not ISO-8601; substituting import time"
            );
            repairs.push(TimestampRepair {
                document: position,
                original: raw.to_string(),
                replacement,
            });
            Ok(to_bson_datetime(&started_at))
        }
    }
}

/// Replaces the contents of `collection` with the planned batch.
pub fn apply_import<S: DocumentStore + ?Sized>(
    store: &S,
    collection: &str,
    plan: ImportPlan,
) -> Result<ImportReport, ImportError> {
    let deleted_count = store.delete_all(collection)?;
    info!(collection, deleted = deleted_count, "cleared collection for import");

    let ImportPlan {
        source_path,
        started_at,
        validation,
        documents,
        repairs,
        preview,
    } = plan;

    let inserted_count = if documents.is_empty() {
        0
    } else {
        store
            .insert_many(collection, documents)
            .map_err(|source| {
                warn!(
                    collection,
                    deleted = deleted_count,
                    "insert failed after the collection was emptied"
                );
                ImportError::PartialReplace {
                    collection: collection.to_string(),
                    deleted: deleted_count,
                    source,
                }
            })?
            .len()
    };
    info!(collection, inserted = inserted_count, path = %source_path.display(), "import complete");

    Ok(ImportReport {
        source_path: source_path.display().to_string(),
        collection: collection.to_string(),
        inserted_count,
        deleted_count,
        imported_at: started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        validation_message: validation.message(),
        repairs,
        preview,
    })
}

/// Destructive-replace import: validate and transform the file, then empty
/// `collection` and insert the batch. Validation and timestamp failures
/// leave the collection untouched.
pub fn import_file<S: DocumentStore + ?Sized>(
    store: &S,
    collection: &str,
    path: &Path,
    schema: &RecordSchema,
    policy: TimestampPolicy,
) -> Result<ImportReport, ImportError> {
    let plan = plan_import(path, schema, policy)?;
    apply_import(store, collection, plan)
}
