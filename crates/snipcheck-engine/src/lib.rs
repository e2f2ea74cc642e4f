//! snipcheck engine - validation and pipeline
//!
//! This crate ties the pieces together:
//! - Loading the reference schema and collection seed
//! - Validating relational snippets against the schema
//! - Validating document-store snippets against the seed
//! - Running documents through extraction and validation into a report

pub mod reference;
pub mod relational;
pub mod document;
pub mod pipeline;

pub use reference::{load_schema, load_seed};
pub use relational::RelationalValidator;
pub use document::{DocumentQueryValidator, ALLOWED_OPERATIONS};
pub use pipeline::Pipeline;
