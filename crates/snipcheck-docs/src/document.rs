//! Document discovery and loading

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File extensions treated as course documents when walking directories
const DOCUMENT_EXTENSIONS: &[&str] = &["md", "markdown"];

/// A course document read into memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Path as given (used in reports and diagnostics)
    pub path: String,

    /// Full text
    pub text: String,
}

impl Document {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// Read a document from disk
    pub fn load(path: &Path) -> Result<Self, InputError> {
        let text = std::fs::read_to_string(path).map_err(|e| InputError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Ok(Self::new(path.display().to_string(), text))
    }
}

/// A document that could not be read
///
/// Fatal for that document only; the run continues with the others.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cannot read {path}: {message}")]
pub struct InputError {
    pub path: String,
    pub message: String,
}

/// Expand input paths into a sorted, de-duplicated list of documents
///
/// Files are taken as given (whatever their extension), so a missing file
/// surfaces later as an [`InputError`]. Directories are walked recursively
/// for markdown files.
pub fn discover(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut documents = BTreeSet::new();

    for input in inputs {
        if !input.is_dir() {
            documents.insert(input.clone());
            continue;
        }

        for entry in WalkDir::new(input).into_iter() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("skipping unreadable directory entry: {}", e);
                    continue;
                }
            };

            if entry.file_type().is_file() && is_document(entry.path()) {
                documents.insert(entry.path().to_path_buf());
            }
        }
    }

    tracing::debug!("discovered {} documents", documents.len());
    documents.into_iter().collect()
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| DOCUMENT_EXTENSIONS.iter().any(|d| d.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn discover_walks_directories_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("week2")).unwrap();
        std::fs::write(dir.path().join("week2/joins.md"), "# Joins").unwrap();
        std::fs::write(dir.path().join("intro.md"), "# Intro").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let found = discover(&[dir.path().to_path_buf()]);
        assert_eq!(
            found,
            vec![dir.path().join("intro.md"), dir.path().join("week2/joins.md")]
        );
    }

    #[test]
    fn discover_keeps_explicit_files_and_dedups() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.md");
        std::fs::write(&file, "").unwrap();
        let missing = dir.path().join("missing.md");

        let found = discover(&[file.clone(), missing.clone(), dir.path().to_path_buf()]);
        assert_eq!(found, vec![file, missing]);
    }

    #[test]
    fn load_missing_document_is_input_error() {
        let err = Document::load(Path::new("/definitely/not/here.md")).unwrap_err();
        assert_eq!(err.path, "/definitely/not/here.md");
        assert!(err.to_string().starts_with("Cannot read"));
    }

    #[test]
    fn load_reads_text() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"# Title\n").unwrap();

        let doc = Document::load(file.path()).unwrap();
        assert_eq!(doc.text, "# Title\n");
        assert_eq!(doc.path, file.path().display().to_string());
    }
}
