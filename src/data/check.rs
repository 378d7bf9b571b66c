//! Offline check of a record file: same validator, looser schema, no store.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::data::import::{read_payload, ImportError, RecordPreview};
use crate::data::schema::RecordSchema;
use crate::data::validate::{validate_records, ValidationReport};

/// Number of documents summarized after a passing check.
pub const CHECK_PREVIEW_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckPreview {
    pub record: RecordPreview,
    pub category: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CheckSummary {
    pub source_path: PathBuf,
    pub is_array: bool,
    pub report: ValidationReport,
    pub previews: Vec<CheckPreview>,
}

impl CheckSummary {
    pub fn passed(&self) -> bool {
        self.report.passed()
    }
}

impl fmt::Display for CheckSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_array {
            writeln!(
                f,
                "found {} documents in {}",
                self.report.document_count,
                self.source_path.display()
            )?;
        }
        if !self.passed() {
            write!(f, "validation failed:")?;
            for line in self.report.rendered_errors() {
                write!(f, "\n  - {line}")?;
            }
            return Ok(());
        }

        write!(f, "{}", self.report.message())?;
        if !self.previews.is_empty() {
            write!(f, "\n\ndocument preview:")?;
        }
        for (offset, preview) in self.previews.iter().enumerate() {
            write!(
                f,
                "\ndocument {}: {}",
                offset + 1,
                preview.record.semantic_id.as_deref().unwrap_or("<no id>")
            )?;
            write!(
                f,
                "\n  title: {}",
                preview.record.title.as_deref().unwrap_or("<no title>")
            )?;
            write!(
                f,
                "\n  category: {}",
                preview.category.as_deref().unwrap_or("<no category>")
            )?;
        }
        Ok(())
    }
}

pub fn check_file(path: &Path, schema: &RecordSchema) -> Result<CheckSummary, ImportError> {
    let payload = read_payload(path)?;
    Ok(check_payload(&payload, path, schema))
}

pub fn check_payload(payload: &Value, source_path: &Path, schema: &RecordSchema) -> CheckSummary {
    let report = validate_records(payload, schema);
    let previews = if report.passed() {
        payload
            .as_array()
            .map(|records| {
                records
                    .iter()
                    .take(CHECK_PREVIEW_LIMIT)
                    .filter_map(Value::as_object)
                    .map(|object| CheckPreview {
                        record: RecordPreview::from_object(object, schema.primary_language),
                        category: object.get("category").map(render_category),
                    })
                    .collect()
            })
            .unwrap_or_default()
    } else {
        Vec::new()
    };

    CheckSummary {
        source_path: source_path.to_path_buf(),
        is_array: payload.is_array(),
        report,
        previews,
    }
}

fn render_category(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
