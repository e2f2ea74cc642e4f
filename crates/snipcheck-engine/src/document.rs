//! Document-store query validation
//!
//! Recognises shell-style calls against the `db` handle:
//!
//! - `db.<collection>.<operation>(...)`
//! - `db.getCollection("<collection>").<operation>(...)`
//! - `db.createCollection("<collection>")`, which makes the collection known
//!   for the rest of the block
//!
//! Comments are stripped first. Brackets and quotes must balance or the block
//! is a parse error.

use regex::Regex;
use snipcheck_core::{CodeBlock, CollectionRegistry, Diagnostic, DiagnosticCode, Location, Severity};
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Operations a course snippet may call on a collection
pub const ALLOWED_OPERATIONS: &[&str] = &[
    "find",
    "findOne",
    "findOneAndUpdate",
    "findOneAndReplace",
    "findOneAndDelete",
    "insert",
    "insertOne",
    "insertMany",
    "update",
    "updateOne",
    "updateMany",
    "replaceOne",
    "delete",
    "deleteOne",
    "deleteMany",
    "remove",
    "aggregate",
    "count",
    "countDocuments",
    "estimatedDocumentCount",
    "distinct",
    "bulkWrite",
    "createIndex",
    "drop",
];

/// Operations whose first argument is a filter document
const FILTER_OPERATIONS: &[&str] = &[
    "find",
    "findOne",
    "findOneAndUpdate",
    "findOneAndReplace",
    "findOneAndDelete",
    "update",
    "updateOne",
    "updateMany",
    "replaceOne",
    "delete",
    "deleteOne",
    "deleteMany",
    "remove",
    "count",
    "countDocuments",
];

/// Fields every stored document has
const IMPLICIT_FIELDS: &[&str] = &["_id"];

static COLLECTION_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bdb\s*\.\s*([A-Za-z_$][\w$]*)\s*\.\s*([A-Za-z_$][\w$]*)\s*\(").expect("valid regex")
});

static GET_COLLECTION_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bdb\s*\.\s*getCollection\s*\(\s*["']([^"']+)["']\s*\)\s*\.\s*([A-Za-z_$][\w$]*)\s*\("#)
        .expect("valid regex")
});

static CREATE_COLLECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bdb\s*\.\s*createCollection\s*\(\s*["']([^"']+)["']"#).expect("valid regex")
});

/// One recognised call, in source order
#[derive(Debug)]
enum Call {
    Create {
        collection: String,
    },
    Operation {
        collection: String,
        operation: String,
        /// Offset just past the opening parenthesis
        arguments: usize,
    },
}

/// Validates document-query blocks against the collection seed
pub struct DocumentQueryValidator<'a> {
    collections: &'a CollectionRegistry,
}

impl<'a> DocumentQueryValidator<'a> {
    pub fn new(collections: &'a CollectionRegistry) -> Self {
        Self { collections }
    }

    /// Validate one block
    pub fn validate(&self, block: &CodeBlock) -> Vec<Diagnostic> {
        let first_line = block.span().content_start();
        let location = |line: usize| Location::with_line(block.source_document(), first_line + line - 1);

        let source = match strip_comments(block.text()) {
            Ok(source) => source,
            Err(error) => {
                return vec![Diagnostic::new(
                    DiagnosticCode::DocQuerySyntaxError,
                    Severity::Error,
                    error.message,
                )
                .with_location(location(error.line))];
            }
        };

        let calls = find_calls(&source);
        if calls.is_empty() {
            return vec![Diagnostic::new(
                DiagnosticCode::DocQueryNoReference,
                Severity::Info,
                "Block references no collection",
            )
            .with_location(location(1))];
        }

        let mut created = BTreeSet::new();
        let mut diagnostics = Vec::new();

        for (offset, call) in calls {
            let line = line_of(&source, offset);
            match call {
                Call::Create { collection } => {
                    created.insert(collection);
                }
                Call::Operation {
                    collection,
                    operation,
                    arguments,
                } => {
                    let seed = self.collections.lookup_collection(&collection);
                    if seed.is_none() && !created.contains(&collection) {
                        diagnostics.push(
                            Diagnostic::new(
                                DiagnosticCode::RefUnknownCollection,
                                Severity::Error,
                                format!("Collection '{}' is not present in the collection seed", collection),
                            )
                            .with_location(location(line)),
                        );
                    }

                    if !ALLOWED_OPERATIONS.contains(&operation.as_str()) {
                        diagnostics.push(
                            Diagnostic::new(
                                DiagnosticCode::RefUnknownOperation,
                                Severity::Error,
                                format!("Operation '{}' is not an allowed operation on '{}'", operation, collection),
                            )
                            .with_comparison("allowed operation", operation.clone())
                            .with_location(location(line)),
                        );
                        continue;
                    }

                    let Some(seed) = seed.filter(|s| !s.fields.is_empty()) else {
                        continue;
                    };
                    if !FILTER_OPERATIONS.contains(&operation.as_str()) {
                        continue;
                    }

                    for field in filter_keys(&source[arguments..]) {
                        if IMPLICIT_FIELDS.contains(&field.as_str()) || seed.has_field(&field) {
                            continue;
                        }
                        diagnostics.push(
                            Diagnostic::new(
                                DiagnosticCode::RefUnknownField,
                                Severity::Warn,
                                format!("Field '{}' was never observed in collection '{}'", field, collection),
                            )
                            .with_location(location(line)),
                        );
                    }
                }
            }
        }

        diagnostics
    }
}

/// Every recognised call, ordered by offset
fn find_calls(source: &str) -> Vec<(usize, Call)> {
    let mut calls = Vec::new();

    for captures in COLLECTION_CALL.captures_iter(source) {
        let (Some(all), Some(collection), Some(operation)) = (captures.get(0), captures.get(1), captures.get(2))
        else {
            continue;
        };
        // db.getCollection(...) and db.createCollection(...) have no second dot
        calls.push((
            all.start(),
            Call::Operation {
                collection: collection.as_str().to_string(),
                operation: operation.as_str().to_string(),
                arguments: all.end(),
            },
        ));
    }

    for captures in GET_COLLECTION_CALL.captures_iter(source) {
        let (Some(all), Some(collection), Some(operation)) = (captures.get(0), captures.get(1), captures.get(2))
        else {
            continue;
        };
        calls.push((
            all.start(),
            Call::Operation {
                collection: collection.as_str().to_string(),
                operation: operation.as_str().to_string(),
                arguments: all.end(),
            },
        ));
    }

    for captures in CREATE_COLLECTION.captures_iter(source) {
        let (Some(all), Some(collection)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        calls.push((
            all.start(),
            Call::Create {
                collection: collection.as_str().to_string(),
            },
        ));
    }

    calls.sort_by_key(|(offset, _)| *offset);
    calls
}

/// Top-level keys of the object literal that opens `arguments`
///
/// Operator keys (`$or`, `$and`, ...) are skipped.
fn filter_keys(arguments: &str) -> Vec<String> {
    let mut keys = Vec::new();
    let Some(body) = arguments.trim_start().strip_prefix('{') else {
        return keys;
    };

    let chars: Vec<char> = body.chars().collect();
    let mut depth = 0usize;
    let mut expect_key = true;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' | '\'' | '`' => {
                let end = skip_string(&chars, i);
                if depth == 0 && expect_key {
                    let key: String = chars[i + 1..end.saturating_sub(1).max(i + 1)].iter().collect();
                    keys.push(key);
                    expect_key = false;
                }
                i = end;
                continue;
            }
            '{' | '[' | '(' => depth += 1,
            '}' | ']' | ')' => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            ',' if depth == 0 => expect_key = true,
            ':' if depth == 0 => expect_key = false,
            c if depth == 0 && expect_key && (c.is_alphanumeric() || c == '_' || c == '$') => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '$' | '.')) {
                    i += 1;
                }
                keys.push(chars[start..i].iter().collect());
                expect_key = false;
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    keys.retain(|k| !k.is_empty() && !k.starts_with('$'));
    keys
}

/// Index just past the string literal starting at `start`
fn skip_string(chars: &[char], start: usize) -> usize {
    let quote = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

/// Unbalanced bracket or quote
#[derive(Debug, Clone, PartialEq, Eq)]
struct SyntaxError {
    message: String,
    line: usize,
}

/// Remove `//` and `/* */` comments, checking bracket and quote balance
///
/// Newlines inside comments are kept so offsets map to the same lines.
fn strip_comments(text: &str) -> Result<String, SyntaxError> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut line = 1;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match c {
            '/' if next == Some('/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            '/' if next == Some('*') => {
                let opened = line;
                i += 2;
                loop {
                    match chars.get(i) {
                        None => {
                            return Err(SyntaxError {
                                message: "Comment opened here is never closed".to_string(),
                                line: opened,
                            })
                        }
                        Some('*') if chars.get(i + 1) == Some(&'/') => {
                            i += 2;
                            break;
                        }
                        Some('\n') => {
                            out.push('\n');
                            line += 1;
                            i += 1;
                        }
                        Some(_) => i += 1,
                    }
                }
                continue;
            }
            '"' | '\'' | '`' => {
                let opened = line;
                out.push(c);
                i += 1;
                loop {
                    match chars.get(i) {
                        None => {
                            return Err(SyntaxError {
                                message: format!("String opened with {} is never closed", c),
                                line: opened,
                            })
                        }
                        Some('\n') if c != '`' => {
                            return Err(SyntaxError {
                                message: format!("String opened with {} is never closed", c),
                                line: opened,
                            })
                        }
                        Some('\\') => {
                            out.push('\\');
                            if let Some(&escaped) = chars.get(i + 1) {
                                out.push(escaped);
                            }
                            i += 2;
                        }
                        Some(&q) if q == c => {
                            out.push(q);
                            i += 1;
                            break;
                        }
                        Some(&other) => {
                            if other == '\n' {
                                line += 1;
                            }
                            out.push(other);
                            i += 1;
                        }
                    }
                }
                continue;
            }
            '(' | '[' | '{' => stack.push((c, line)),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    Some((open, opened)) => {
                        return Err(SyntaxError {
                            message: format!("'{}' opened at line {} is closed by '{}'", open, opened, c),
                            line,
                        })
                    }
                    None => {
                        return Err(SyntaxError {
                            message: format!("Unexpected '{}' with nothing open", c),
                            line,
                        })
                    }
                }
            }
            '\n' => line += 1,
            _ => {}
        }

        out.push(c);
        i += 1;
    }

    if let Some((open, opened)) = stack.pop() {
        return Err(SyntaxError {
            message: format!("'{}' opened here is never closed", open),
            line: opened,
        });
    }

    Ok(out)
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}
