//! In-memory text of one file with line/offset conversion.

use crate::error::{EdlError, EdlResult};
use serde::{Deserialize, Serialize};

/// A location in a document: 1-indexed line, 0-indexed byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Half-open byte range `[start, end)` in a document's current content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(end >= start, "range end {end} before start {start}");
        Self { start, end }
    }

    /// A zero-width range at `offset`.
    pub fn point(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `other` lies entirely inside this range.
    pub fn contains_range(&self, other: &Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Text content plus an index of where each line begins.
///
/// `line_starts` always begins with 0 and has one entry per line, so content
/// ending in `\n` has a final empty line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    content: String,
    line_starts: Vec<usize>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let line_starts = compute_line_starts(&content);
        Self {
            content,
            line_starts,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn line_starts(&self) -> &[usize] {
        &self.line_starts
    }

    /// Convert a position to a byte offset.
    pub fn pos_to_offset(&self, pos: Position) -> EdlResult<usize> {
        let line = self.line_range(pos.line)?;
        let offset = line.start + pos.column;
        if offset > line.end || !self.content.is_char_boundary(offset) {
            return Err(EdlError::ColumnOutOfRange {
                line: pos.line,
                column: pos.column,
            });
        }
        Ok(offset)
    }

    /// Convert a byte offset to a position.
    pub fn offset_to_pos(&self, offset: usize) -> EdlResult<Position> {
        if offset > self.content.len() {
            return Err(EdlError::OffsetOutOfRange {
                offset,
                len: self.content.len(),
            });
        }
        let idx = self.line_starts.partition_point(|&start| start <= offset) - 1;
        Ok(Position::new(idx + 1, offset - self.line_starts[idx]))
    }

    /// The range of a 1-indexed line, excluding its terminating newline.
    pub fn line_range(&self, line: usize) -> EdlResult<Range> {
        line_bounds(&self.line_starts, self.content.len(), line).map(|(s, e)| Range::new(s, e))
    }

    /// The range covering the whole document.
    pub fn full_range(&self) -> Range {
        Range::new(0, self.content.len())
    }

    /// Text covered by `range`.
    pub fn text(&self, range: Range) -> &str {
        &self.content[range.start..range.end]
    }

    /// Replace `range` with `replacement` and rebuild the line index.
    pub fn splice(&mut self, range: Range, replacement: &str) {
        self.content
            .replace_range(range.start..range.end, replacement);
        self.line_starts = compute_line_starts(&self.content);
    }
}

/// Offsets where each line begins.
pub(crate) fn compute_line_starts(content: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(content.match_indices('\n').map(|(i, _)| i + 1))
        .collect()
}

/// Start and end (newline excluded) of a 1-indexed line, given a line index.
pub(crate) fn line_bounds(
    line_starts: &[usize],
    len: usize,
    line: usize,
) -> EdlResult<(usize, usize)> {
    if line == 0 || line > line_starts.len() {
        return Err(EdlError::LineOutOfRange {
            line,
            line_count: line_starts.len(),
        });
    }
    let start = line_starts[line - 1];
    let end = line_starts.get(line).map(|next| next - 1).unwrap_or(len);
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_starts() {
        let doc = Document::new("a\nbc\n");
        assert_eq!(doc.line_starts(), &[0, 2, 5]);
        assert_eq!(doc.line_count(), 3);

        let doc = Document::new("");
        assert_eq!(doc.line_count(), 1);
    }

    #[test]
    fn test_line_range_excludes_newline() {
        let doc = Document::new("one\ntwo\nthree");
        assert_eq!(doc.text(doc.line_range(1).unwrap()), "one");
        assert_eq!(doc.text(doc.line_range(2).unwrap()), "two");
        assert_eq!(doc.text(doc.line_range(3).unwrap()), "three");
    }

    #[test]
    fn test_trailing_newline_yields_empty_last_line() {
        let doc = Document::new("one\n");
        let last = doc.line_range(2).unwrap();
        assert!(last.is_empty());
        assert_eq!(last.start, 4);
    }

    #[test]
    fn test_line_out_of_range() {
        let doc = Document::new("one\ntwo");
        assert!(matches!(
            doc.line_range(0),
            Err(EdlError::LineOutOfRange { line: 0, .. })
        ));
        assert!(matches!(
            doc.line_range(3),
            Err(EdlError::LineOutOfRange {
                line: 3,
                line_count: 2
            })
        ));
        assert!(doc.pos_to_offset(Position::new(5, 0)).is_err());
    }

    #[test]
    fn test_column_out_of_range() {
        let doc = Document::new("ab\ncd");
        assert_eq!(doc.pos_to_offset(Position::new(1, 2)).unwrap(), 2);
        assert!(matches!(
            doc.pos_to_offset(Position::new(1, 3)),
            Err(EdlError::ColumnOutOfRange { line: 1, column: 3 })
        ));
    }

    #[test]
    fn test_column_inside_multibyte_char() {
        let doc = Document::new("héllo");
        assert!(doc.pos_to_offset(Position::new(1, 2)).is_err());
        assert_eq!(doc.pos_to_offset(Position::new(1, 3)).unwrap(), 3);
    }

    #[test]
    fn test_position_round_trip() {
        let doc = Document::new("first\n\nthird line\nlast");
        for offset in 0..=doc.len() {
            let pos = doc.offset_to_pos(offset).unwrap();
            assert_eq!(doc.pos_to_offset(pos).unwrap(), offset);
        }
        for line in 1..=doc.line_count() {
            let range = doc.line_range(line).unwrap();
            for column in 0..=range.len() {
                let pos = Position::new(line, column);
                assert_eq!(doc.offset_to_pos(doc.pos_to_offset(pos).unwrap()).unwrap(), pos);
            }
        }
    }

    #[test]
    fn test_offset_past_end() {
        let doc = Document::new("abc");
        assert!(matches!(
            doc.offset_to_pos(4),
            Err(EdlError::OffsetOutOfRange { offset: 4, len: 3 })
        ));
    }

    #[test]
    fn test_splice_recomputes_lines() {
        let mut doc = Document::new("hello world");
        doc.splice(Range::new(5, 6), "\n");
        assert_eq!(doc.content(), "hello\nworld");
        assert_eq!(doc.line_count(), 2);
        assert_eq!(doc.text(doc.line_range(2).unwrap()), "world");

        doc.splice(Range::point(0), ">> ");
        assert_eq!(doc.content(), ">> hello\nworld");
        assert_eq!(doc.line_starts(), &[0, 9]);
    }
}
