//! Course document loading and query-block extraction
//!
//! This crate handles:
//! - Discovering markdown documents under the input paths
//! - Reading documents (unreadable documents become per-document input errors)
//! - Extracting fenced query blocks with their heading and line span

pub mod document;
pub mod fence;

pub use document::{Document, InputError, discover};
pub use fence::{Extraction, FenceExtractor};
