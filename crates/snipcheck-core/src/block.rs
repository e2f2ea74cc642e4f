//! Code blocks extracted from course documents

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Query language a fenced block was recognised as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LanguageTag {
    /// Relational query (SQL)
    Sql,

    /// Document-store query (mongo shell style)
    DocumentQuery,
}

impl std::fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sql => write!(f, "sql"),
            Self::DocumentQuery => write!(f, "document-query"),
        }
    }
}

/// Inclusive line range of a fenced block, fences included (1-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineSpan {
    /// Line of the opening fence
    pub start: usize,

    /// Line of the closing fence
    pub end: usize,
}

impl LineSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// First line of the block body
    pub fn content_start(&self) -> usize {
        self.start + 1
    }
}

impl std::fmt::Display for LineSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A fenced query block and where it came from
///
/// Created once by the extractor; there is no way to mutate one afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    source_document: String,
    heading: String,
    language: LanguageTag,
    fence_tag: String,
    text: String,
    span: LineSpan,
    position: usize,
}

impl CodeBlock {
    pub fn new(
        source_document: impl Into<String>,
        heading: impl Into<String>,
        language: LanguageTag,
        fence_tag: impl Into<String>,
        text: impl Into<String>,
        span: LineSpan,
        position: usize,
    ) -> Self {
        Self {
            source_document: source_document.into(),
            heading: heading.into(),
            language,
            fence_tag: fence_tag.into(),
            text: text.into(),
            span,
            position,
        }
    }

    pub fn source_document(&self) -> &str {
        &self.source_document
    }

    /// Nearest heading above the block (empty when the document has none)
    pub fn heading(&self) -> &str {
        &self.heading
    }

    pub fn language(&self) -> LanguageTag {
        self.language
    }

    /// Info-string word the fence was tagged with, as written
    pub fn fence_tag(&self) -> &str {
        &self.fence_tag
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn span(&self) -> LineSpan {
        self.span
    }

    /// Index of the block among the recognised blocks of its document
    pub fn position(&self) -> usize {
        self.position
    }

    /// Short content hash identifying this block within a run
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.source_document.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.position.to_le_bytes());
        hasher.update([0u8]);
        hasher.update(self.text.as_bytes());
        let digest = hasher.finalize();
        hex::encode(&digest[..6])
    }

    /// Reference used by validation results
    pub fn to_ref(&self) -> BlockRef {
        BlockRef {
            document: self.source_document.clone(),
            heading: self.heading.clone(),
            language: self.language,
            position: self.position,
            span: self.span,
            fingerprint: self.fingerprint(),
        }
    }
}

/// Identifies exactly one code block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    pub document: String,
    pub heading: String,
    pub language: LanguageTag,
    pub position: usize,
    pub span: LineSpan,
    pub fingerprint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(text: &str, position: usize) -> CodeBlock {
        CodeBlock::new(
            "lessons/select.md",
            "Filtering rows",
            LanguageTag::Sql,
            "sql",
            text,
            LineSpan::new(10, 12),
            position,
        )
    }

    #[test]
    fn fingerprint_is_stable() {
        let a = block("SELECT 1;", 0);
        let b = block("SELECT 1;", 0);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 12);
    }

    #[test]
    fn fingerprint_depends_on_position_and_text() {
        let a = block("SELECT 1;", 0);
        assert_ne!(a.fingerprint(), block("SELECT 1;", 1).fingerprint());
        assert_ne!(a.fingerprint(), block("SELECT 2;", 0).fingerprint());
    }

    #[test]
    fn block_ref_carries_metadata() {
        let r = block("SELECT 1;", 3).to_ref();
        assert_eq!(r.document, "lessons/select.md");
        assert_eq!(r.position, 3);
        assert_eq!(r.span.content_start(), 11);
        assert_eq!(r.language.to_string(), "sql");
    }
}
