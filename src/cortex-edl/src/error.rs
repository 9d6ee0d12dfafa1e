//! Error types for EDL parsing and execution.

use crate::report::TraceEntry;
use thiserror::Error;

/// Result type for EDL operations.
pub type EdlResult<T> = Result<T, EdlError>;

/// Errors that can occur while parsing or executing an EDL script.
#[derive(Debug, Error)]
pub enum EdlError {
    /// The script could not be tokenized or parsed.
    #[error("Syntax error at line {line}: {message}{}", hint.as_deref().map(|h| format!(" ({h})")).unwrap_or_default())]
    Syntax {
        line: usize,
        column: Option<usize>,
        message: String,
        hint: Option<String>,
    },

    /// A command that needs a file ran before any `file`/`newfile`.
    #[error("No file selected")]
    NoFileSelected,

    /// Line number outside `[1, line_count]`.
    #[error("Line {line} is out of range (document has {line_count} lines)")]
    LineOutOfRange { line: usize, line_count: usize },

    /// Column past the end of its line, or inside a multi-byte character.
    #[error("Column {column} is out of range for line {line}")]
    ColumnOutOfRange { line: usize, column: usize },

    /// Byte offset past the end of the document.
    #[error("Offset {offset} is out of range (document is {len} bytes)")]
    OffsetOutOfRange { offset: usize, len: usize },

    /// An original-file offset now lies inside text replaced by an earlier edit.
    #[error("Original offset {offset} lies inside text already replaced by an earlier edit")]
    StaleCoordinate { offset: usize },

    /// A range pattern whose end resolves before its start.
    #[error("Range {pattern} ends before it starts")]
    InvertedRange { pattern: String },

    /// A pattern matched nothing.
    #[error("Pattern {pattern} matched nothing")]
    NoMatches { pattern: String },

    /// A pattern that had to match exactly once matched several times.
    #[error("Pattern {pattern} matched {count} times, expected exactly one")]
    TooManyMatches { pattern: String, count: usize },

    /// An empty literal would match at every position.
    #[error("Empty literal pattern cannot be used to select text")]
    EmptyLiteral,

    /// A command needs exactly one selected range.
    #[error("{command} requires exactly one selected range, found {count}")]
    SelectionNotSingle { command: &'static str, count: usize },

    /// The selection is empty.
    #[error("Selection is empty")]
    EmptySelection,

    /// `retain_nth` index outside the selection.
    #[error("Index {index} is out of bounds for a selection of {len} ranges")]
    IndexOutOfBounds { index: i64, len: usize },

    /// Mutations cannot be applied to overlapping ranges.
    #[error("Selected ranges overlap; cannot apply {command}")]
    OverlappingRanges { command: &'static str },

    /// Register lookup failed.
    #[error("Register '{name}' does not exist")]
    UnknownRegister { name: String },

    /// `newfile` on a path already loaded in this run.
    #[error("File {path} is already loaded in this script")]
    AlreadyLoaded { path: String },

    /// `newfile` on a path that exists on disk.
    #[error("File {path} already exists")]
    AlreadyExists { path: String },

    /// A path whose earlier section already failed.
    #[error("File {path} was skipped after an earlier failure in this script")]
    FileFailed { path: String },

    /// Failed to read a file.
    #[error("Failed to read file {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file.
    #[error("Failed to write file {path}: {source}")]
    WriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a directory.
    #[error("Failed to create directory {path}: {source}")]
    CreateDirError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// An execution error with no file context to isolate it to.
    #[error("Script aborted at line {line}: {message}")]
    Aborted {
        line: usize,
        message: String,
        trace: Vec<TraceEntry>,
    },
}

impl EdlError {
    /// Create a syntax error without a column or hint.
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            column: None,
            message: message.into(),
            hint: None,
        }
    }

    /// Create a syntax error pointing at a column.
    pub fn syntax_at(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            column: Some(column),
            message: message.into(),
            hint: None,
        }
    }

    /// Attach a remediation hint to a syntax error. Other variants are returned as-is.
    pub fn with_hint(self, hint: impl Into<String>) -> Self {
        match self {
            Self::Syntax {
                line,
                column,
                message,
                ..
            } => Self::Syntax {
                line,
                column,
                message,
                hint: Some(hint.into()),
            },
            other => other,
        }
    }

    pub fn no_matches(pattern: impl ToString) -> Self {
        Self::NoMatches {
            pattern: pattern.to_string(),
        }
    }

    pub fn unknown_register(name: impl Into<String>) -> Self {
        Self::UnknownRegister { name: name.into() }
    }

    /// Check if this error was raised before execution started.
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. })
    }

    /// The remediation hint, if this is a syntax error that has one.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Syntax { hint, .. } => hint.as_deref(),
            _ => None,
        }
    }
}
