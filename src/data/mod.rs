//! Record data: schema description, validation, timestamp normalization,
//! and the file-to-collection import pipeline.

pub mod check;
pub mod import;
pub mod schema;
pub mod timestamp;
pub mod validate;
