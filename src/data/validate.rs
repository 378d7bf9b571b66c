use std::fmt;

use serde_json::{Map, Value};

use crate::data::schema::{RecordSchema, PUBLISH_TIME_FIELD, SECONDARY_LANGUAGE_KEY};
use crate::data::timestamp::parse_iso8601;

pub const VALIDATION_PASSED: &str = "validation passed";
pub const NOT_AN_ARRAY: &str = "expected an array";
/// Errors beyond this many are summarized as `... N more`.
pub const MAX_RENDERED_ERRORS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationSeverity {
    Error,
    Warning,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDiagnostic {
    pub severity: ValidationSeverity,
    /// 1-based position of the offending element; `None` for batch-level issues.
    pub document: Option<usize>,
    pub message: String,
}

impl fmt::Display for ValidationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub document_count: usize,
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    pub fn push(
        &mut self,
        severity: ValidationSeverity,
        document: Option<usize>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(ValidationDiagnostic {
            severity,
            document,
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diag| diag.severity == ValidationSeverity::Error)
    }

    pub fn passed(&self) -> bool {
        !self.has_errors()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationDiagnostic> {
        self.diagnostics
            .iter()
            .filter(|diag| diag.severity == ValidationSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationDiagnostic> {
        self.diagnostics
            .iter()
            .filter(|diag| diag.severity == ValidationSeverity::Warning)
    }

    /// First [`MAX_RENDERED_ERRORS`] error lines plus a `... N more` line when truncated.
    pub fn rendered_errors(&self) -> Vec<String> {
        let errors: Vec<&ValidationDiagnostic> = self.errors().collect();
        let mut lines: Vec<String> = errors
            .iter()
            .take(MAX_RENDERED_ERRORS)
            .map(|diag| diag.message.clone())
            .collect();
        if errors.len() > MAX_RENDERED_ERRORS {
            lines.push(format!("... {} more", errors.len() - MAX_RENDERED_ERRORS));
        }
        lines
    }

    pub fn message(&self) -> String {
        if self.passed() {
            VALIDATION_PASSED.to_string()
        } else {
            self.rendered_errors().join("\n")
        }
    }

    pub fn outcome(&self) -> (bool, String) {
        (self.passed(), self.message())
    }
}

/// Checks a parsed JSON payload against `schema`, collecting every problem in one pass.
pub fn validate_records(payload: &Value, schema: &RecordSchema) -> ValidationReport {
    let mut report = ValidationReport::default();

    let Some(entries) = payload.as_array() else {
        report.push(ValidationSeverity::Error, None, NOT_AN_ARRAY);
        return report;
    };
    report.document_count = entries.len();

    for (offset, entry) in entries.iter().enumerate() {
        let position = offset + 1;
        let Some(object) = entry.as_object() else {
            report.push(
                ValidationSeverity::Error,
                Some(position),
                format!("element {position} is not a dictionary"),
            );
            continue;
        };

        for field in &schema.required_fields {
            if !object.contains_key(*field) {
                report.push(
                    ValidationSeverity::Error,
                    Some(position),
                    format!("document {position} missing required field: {field}"),
                );
            }
        }

        for field in &schema.bilingual_fields {
            validate_bilingual_field(&mut report, object, field, position, schema);
        }

        if schema.checks_publish_time() {
            if let Some(raw) = object.get(PUBLISH_TIME_FIELD).and_then(Value::as_str) {
                if parse_iso8601(raw).is_none() {
                    report.push(
                        ValidationSeverity::Warning,
                        Some(position),
                        format!("document {position} {PUBLISH_TIME_FIELD} '{raw}' is not ISO-8601"),
                    );
                }
            }
        }
    }

    report
}

fn validate_bilingual_field(
    report: &mut ValidationReport,
    object: &Map<String, Value>,
    field: &str,
    position: usize,
    schema: &RecordSchema,
) {
    let Some(value) = object.get(field) else {
        return;
    };
    let Some(languages) = value.as_object() else {
        report.push(
            ValidationSeverity::Error,
            Some(position),
            format!("document {position} field {field} should be an object"),
        );
        return;
    };

    let primary = schema.primary_language.key();
    if !languages.contains_key(primary) || !languages.contains_key(SECONDARY_LANGUAGE_KEY) {
        report.push(
            ValidationSeverity::Error,
            Some(position),
            format!("document {position} field {field} missing {primary} or {SECONDARY_LANGUAGE_KEY} language"),
        );
    }
}
