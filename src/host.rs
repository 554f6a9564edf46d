//! Editor host seam
//!
//! The orchestrator never talks to a concrete editor. Everything it needs from
//! one (the active document, message popups, the diagnostics collection and the
//! status indicator) goes through [`EditorHost`].

use crate::diagnostics::DiagnosticRecord;
use crate::status::StatusText;

/// A zero-based position in a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl Position {
    pub fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }
}

/// A zero-based, end-exclusive span in a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start_line: usize, start_char: usize, end_line: usize, end_char: usize) -> Self {
        Self {
            start: Position::new(start_line, start_char),
            end: Position::new(end_line, end_char),
        }
    }
}

/// In-memory snapshot of an open document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    uri: String,
    text: String,
}

impl TextDocument {
    pub fn new(uri: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            text: text.into(),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// File name used for the multipart upload part
    pub fn file_name(&self) -> &str {
        self.uri
            .rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("document.html")
    }

    /// Number of lines, counting a trailing empty line after a final newline.
    /// An empty document has one line.
    pub fn line_count(&self) -> usize {
        self.text.split('\n').count()
    }

    /// Text of a zero-based line without its terminator
    pub fn line(&self, index: usize) -> Option<&str> {
        self.text
            .split('\n')
            .nth(index)
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
    }

    /// Full extent of a zero-based line, excluding the line terminator
    pub fn line_range(&self, index: usize) -> Option<Range> {
        self.line(index)
            .map(|line| Range::new(index, 0, index, line.chars().count()))
    }
}

/// Everything the orchestrator needs from the hosting editor
#[cfg_attr(test, mockall::automock)]
pub trait EditorHost {
    /// The document the user is currently working on, if any
    fn active_document(&self) -> Option<TextDocument>;

    fn show_information(&mut self, message: &str);

    fn show_error(&mut self, message: &str);

    /// Replace the diagnostics attached to `uri`
    fn publish_diagnostics(&mut self, uri: &str, diagnostics: Vec<DiagnosticRecord>);

    fn set_status(&mut self, status: StatusText);
}
