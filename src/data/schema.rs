//! Record shape description interpreted by the validator.
//! Field names are the camelCase keys used in the news/article JSON exports.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::Deserialize;

pub const SEMANTIC_ID_FIELD: &str = "semanticId";
pub const TITLE_FIELD: &str = "title";
pub const PUBLISH_TIME_FIELD: &str = "publishTime";
pub const ID_FIELD: &str = "_id";
pub const SECONDARY_LANGUAGE_KEY: &str = "en";

const IMPORT_REQUIRED_FIELDS: &[&str] = &[
    SEMANTIC_ID_FIELD,
    TITLE_FIELD,
    "summary",
    "category",
    "views",
    PUBLISH_TIME_FIELD,
];
const IMPORT_BILINGUAL_FIELDS: &[&str] = &[TITLE_FIELD, "summary", "category", "tags", "locales"];

const CHECK_REQUIRED_FIELDS: &[&str] = &[SEMANTIC_ID_FIELD, TITLE_FIELD, "summary", "category"];
const CHECK_BILINGUAL_FIELDS: &[&str] = &[TITLE_FIELD, "summary"];

/// Key of the non-English language in bilingual fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryLanguage {
    #[default]
    Cn,
    Zh,
}

impl PrimaryLanguage {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Cn => "cn",
            Self::Zh => "zh",
        }
    }
}

impl fmt::Display for PrimaryLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for PrimaryLanguage {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "cn" => Ok(Self::Cn),
            "zh" => Ok(Self::Zh),
            other => Err(format!("unsupported primary language '{other}' (expected cn or zh)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaProfile {
    /// Full shape required before a record may be written to the store.
    Import,
    /// Looser shape used by the offline checker.
    Check,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    pub profile: SchemaProfile,
    pub required_fields: Vec<&'static str>,
    pub bilingual_fields: Vec<&'static str>,
    pub primary_language: PrimaryLanguage,
}

impl RecordSchema {
    pub fn import(primary_language: PrimaryLanguage) -> Self {
        Self {
            profile: SchemaProfile::Import,
            required_fields: IMPORT_REQUIRED_FIELDS.to_vec(),
            bilingual_fields: IMPORT_BILINGUAL_FIELDS.to_vec(),
            primary_language,
        }
    }

    pub fn check(primary_language: PrimaryLanguage) -> Self {
        Self {
            profile: SchemaProfile::Check,
            required_fields: CHECK_REQUIRED_FIELDS.to_vec(),
            bilingual_fields: CHECK_BILINGUAL_FIELDS.to_vec(),
            primary_language,
        }
    }

    pub fn checks_publish_time(&self) -> bool {
        self.profile == SchemaProfile::Import
    }
}
