//! Fenced code block extraction
//!
//! Follows CommonMark fence rules closely enough for course material:
//! - an opening fence is 3+ backticks or tildes, indented at most 3 spaces
//! - the first word of the info string is the language tag
//! - a closing fence uses the same character, at least as many times, and
//!   nothing but whitespace after it
//!
//! Only blocks whose tag is configured as a query language become
//! [`CodeBlock`]s. A fence left open at the end of a document is reported as
//! a single warning and dropped.

use crate::document::Document;
use snipcheck_core::{
    CodeBlock, Diagnostic, DiagnosticCode, LanguageConfig, LanguageTag, LineSpan, Location, Severity,
};

/// Blocks and warnings extracted from one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Recognised blocks, in order of appearance
    pub blocks: Vec<CodeBlock>,

    /// Extraction warnings (malformed fences)
    pub diagnostics: Vec<Diagnostic>,
}

/// An opening fence waiting for its closing line
struct OpenFence<'a> {
    marker: char,
    length: usize,
    indent: usize,
    info: String,
    language: Option<LanguageTag>,
    start_line: usize,
    body: Vec<&'a str>,
}

/// Extracts query blocks using the configured fence tags
pub struct FenceExtractor {
    languages: LanguageConfig,
}

impl FenceExtractor {
    pub fn new(languages: LanguageConfig) -> Self {
        Self { languages }
    }

    /// Extract every recognised block of one document
    pub fn extract(&self, document: &Document) -> Extraction {
        let mut extraction = Extraction::default();
        let mut heading = String::new();
        let mut open: Option<OpenFence<'_>> = None;

        for (index, line) in document.text.lines().enumerate() {
            let line_no = index + 1;

            if let Some(fence) = open.as_mut() {
                if is_closing_fence(line, fence.marker, fence.length) {
                    if let Some(fence) = open.take() {
                        self.finish(document, &heading, fence, line_no, &mut extraction);
                    }
                } else {
                    fence.body.push(line);
                }
                continue;
            }

            if let Some((marker, length, indent, info)) = parse_opening_fence(line) {
                let tag = fence_tag(info);
                open = Some(OpenFence {
                    marker,
                    length,
                    indent,
                    info: tag.to_string(),
                    language: self.languages.classify(tag),
                    start_line: line_no,
                    body: Vec::new(),
                });
            } else if let Some(text) = parse_heading(line) {
                heading = text.to_string();
            }
        }

        if let Some(fence) = open {
            tracing::warn!(
                "{}:{}: unterminated fence, block skipped",
                document.path,
                fence.start_line
            );

            let shown_tag = if fence.info.is_empty() { "untagged" } else { fence.info.as_str() };
            extraction.diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::ExtractUnterminatedFence,
                    Severity::Warn,
                    format!(
                        "Fenced block ({}) opened at line {} is never closed; block skipped",
                        shown_tag, fence.start_line
                    ),
                )
                .with_location(Location::with_line(document.path.clone(), fence.start_line)),
            );
        }

        tracing::debug!(
            "{}: {} query blocks extracted",
            document.path,
            extraction.blocks.len()
        );
        extraction
    }

    fn finish(
        &self,
        document: &Document,
        heading: &str,
        fence: OpenFence<'_>,
        end_line: usize,
        extraction: &mut Extraction,
    ) {
        let Some(language) = fence.language else {
            return;
        };

        let text = fence
            .body
            .iter()
            .map(|line| strip_indent(line, fence.indent))
            .collect::<Vec<_>>()
            .join("\n");

        let position = extraction.blocks.len();
        extraction.blocks.push(CodeBlock::new(
            document.path.clone(),
            heading,
            language,
            fence.info,
            text,
            LineSpan::new(fence.start_line, end_line),
            position,
        ));
    }

    /// Extract several documents, preserving document order
    pub fn extract_all<'a>(&self, documents: impl IntoIterator<Item = &'a Document>) -> Vec<Extraction> {
        documents.into_iter().map(|d| self.extract(d)).collect()
    }
}

/// Count leading spaces, allowing at most three
fn fence_indent(line: &str) -> Option<usize> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    (indent <= 3).then_some(indent)
}

/// Returns `(marker, length, indent, info)` for an opening fence line
fn parse_opening_fence(line: &str) -> Option<(char, usize, usize, &str)> {
    let indent = fence_indent(line)?;
    let rest = &line[indent..];
    let marker = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let length = rest.len() - rest.trim_start_matches(marker).len();
    if length < 3 {
        return None;
    }

    let info = rest[length..].trim();
    // Backtick fences cannot carry backticks in their info string
    if marker == '`' && info.contains('`') {
        return None;
    }

    Some((marker, length, indent, info))
}

fn is_closing_fence(line: &str, marker: char, min_length: usize) -> bool {
    let Some(indent) = fence_indent(line) else {
        return false;
    };
    let rest = &line[indent..];
    let length = rest.len() - rest.trim_start_matches(marker).len();
    length >= min_length && rest[length..].trim().is_empty()
}

/// First word of the info string, without `{}` wrappers (`{sql}`, `sql title=x`)
fn fence_tag(info: &str) -> &str {
    info.split_whitespace()
        .next()
        .unwrap_or("")
        .trim_matches(|c| c == '{' || c == '}' || c == '.')
}

/// Text of an ATX heading (`# Title`, `## Title ##`)
fn parse_heading(line: &str) -> Option<&str> {
    let indent = fence_indent(line)?;
    let rest = &line[indent..];
    let level = rest.len() - rest.trim_start_matches('#').len();
    if !(1..=6).contains(&level) {
        return None;
    }

    let text = &rest[level..];
    if !text.is_empty() && !text.starts_with(' ') && !text.starts_with('\t') {
        return None;
    }

    Some(text.trim().trim_end_matches('#').trim_end())
}

fn strip_indent(line: &str, indent: usize) -> &str {
    let spaces = line.len() - line.trim_start_matches(' ').len();
    &line[spaces.min(indent)..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extract(text: &str) -> Extraction {
        FenceExtractor::new(LanguageConfig::default()).extract(&Document::new("lesson.md", text))
    }

    #[test]
    fn no_fences_no_blocks() {
        let extraction = extract("# Relational databases\n\nTables have rows and columns.\n");
        assert!(extraction.blocks.is_empty());
        assert!(extraction.diagnostics.is_empty());
    }

    #[test]
    fn extracts_sql_block_with_metadata() {
        let text = "# Basics\n\n## Selecting\n\n```sql\nSELECT customerNumber\nFROM customers;\n```\n";
        let extraction = extract(text);

        assert_eq!(extraction.blocks.len(), 1);
        let block = &extraction.blocks[0];
        assert_eq!(block.source_document(), "lesson.md");
        assert_eq!(block.heading(), "Selecting");
        assert_eq!(block.language(), LanguageTag::Sql);
        assert_eq!(block.fence_tag(), "sql");
        assert_eq!(block.text(), "SELECT customerNumber\nFROM customers;");
        assert_eq!(block.span(), LineSpan::new(5, 8));
        assert_eq!(block.position(), 0);
    }

    #[test]
    fn ignores_unrecognised_languages() {
        let text = "```python\nprint('# not a heading')\n```\n\n```mongodb\ndb.users.find()\n```\n";
        let extraction = extract(text);

        assert_eq!(extraction.blocks.len(), 1);
        assert_eq!(extraction.blocks[0].language(), LanguageTag::DocumentQuery);
        assert_eq!(extraction.blocks[0].heading(), "");
    }

    #[test]
    fn positions_follow_appearance_order() {
        let text = "```sql\nSELECT 1;\n```\n```text\nx\n```\n```SQL\nSELECT 2;\n```\n";
        let extraction = extract(text);

        let positions: Vec<(usize, &str)> = extraction
            .blocks
            .iter()
            .map(|b| (b.position(), b.text()))
            .collect();
        assert_eq!(positions, vec![(0, "SELECT 1;"), (1, "SELECT 2;")]);
    }

    #[test]
    fn unterminated_fence_warns_once_and_emits_nothing() {
        let text = "# Exercise\n\n```sql\nSELECT * FROM customers;\n";
        let extraction = extract(text);

        assert!(extraction.blocks.is_empty());
        assert_eq!(extraction.diagnostics.len(), 1);
        let diag = &extraction.diagnostics[0];
        assert_eq!(diag.code, DiagnosticCode::ExtractUnterminatedFence);
        assert_eq!(diag.severity, Severity::Warn);
        assert_eq!(diag.location.as_ref().and_then(|l| l.line), Some(3));
    }

    #[test]
    fn earlier_blocks_survive_a_later_unterminated_fence() {
        let text = "```sql\nSELECT 1;\n```\n\n```sql\nSELECT 2;\n";
        let extraction = extract(text);
        assert_eq!(extraction.blocks.len(), 1);
        assert_eq!(extraction.diagnostics.len(), 1);
    }

    #[test]
    fn closing_fence_must_match_marker_and_length() {
        let text = "````sql\nSELECT 1;\n```\n~~~~\n````\n";
        let extraction = extract(text);

        assert_eq!(extraction.blocks.len(), 1);
        assert_eq!(extraction.blocks[0].text(), "SELECT 1;\n```\n~~~~");
    }

    #[test]
    fn tilde_fence_and_braced_tag() {
        let text = "~~~{sql}\nSELECT 1;\n~~~\n```sql title=\"demo\"\nSELECT 2;\n```\n";
        let extraction = extract(text);
        assert_eq!(extraction.blocks.len(), 2);
        assert_eq!(extraction.blocks[0].fence_tag(), "sql");
    }

    #[test]
    fn indented_fence_strips_indent() {
        let text = "1. Step one\n\n   ```sql\n   SELECT 1\n     FROM t;\n   ```\n";
        let extraction = extract(text);
        assert_eq!(extraction.blocks[0].text(), "SELECT 1\n  FROM t;");
    }

    #[test]
    fn heading_parsing() {
        assert_eq!(parse_heading("## Joins ##"), Some("Joins"));
        assert_eq!(parse_heading("#hashtag"), None);
        assert_eq!(parse_heading("####### too deep"), None);
        assert_eq!(parse_heading("#"), Some(""));
    }
}
