//! Mapping original-file offsets forward through applied edits.
//!
//! Every splice applied to a file is logged as a [`Transform`]. Line and
//! line:column patterns are resolved against the file's layout as it was
//! when first loaded, then replayed through the log to land in the current
//! content.

use crate::document::{compute_line_starts, line_bounds};
use crate::error::{EdlError, EdlResult};
use serde::{Deserialize, Serialize};

/// One applied substitution: `[start, before_end)` was replaced by
/// `[start, after_end)`, in the coordinates just before it was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transform {
    pub start: usize,
    pub before_end: usize,
    pub after_end: usize,
}

impl Transform {
    /// Record replacing `[start, end)` with `replacement_len` bytes.
    pub fn splice(start: usize, end: usize, replacement_len: usize) -> Self {
        Self {
            start,
            before_end: end,
            after_end: start + replacement_len,
        }
    }

    fn delta(&self) -> isize {
        self.after_end as isize - self.before_end as isize
    }
}

/// Map an offset in the original content to the current content.
///
/// Fails if the offset falls strictly inside a span some transform replaced.
pub fn resolve_index(original_offset: usize, transforms: &[Transform]) -> EdlResult<usize> {
    transforms.iter().try_fold(original_offset, |offset, t| {
        if offset <= t.start {
            Ok(offset)
        } else if offset < t.before_end {
            Err(EdlError::StaleCoordinate {
                offset: original_offset,
            })
        } else {
            Ok((offset as isize + t.delta()) as usize)
        }
    })
}

/// Line layout of a file frozen at first load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalLayout {
    line_starts: Vec<usize>,
    len: usize,
}

impl OriginalLayout {
    pub fn capture(content: &str) -> Self {
        Self {
            line_starts: compute_line_starts(content),
            len: content.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Original start and end offsets of a 1-indexed line, newline excluded.
    pub fn line_bounds(&self, line: usize) -> EdlResult<(usize, usize)> {
        line_bounds(&self.line_starts, self.len, line)
    }

    /// Original offset of `line:column`.
    pub fn offset_of(&self, line: usize, column: usize) -> EdlResult<usize> {
        let (start, end) = self.line_bounds(line)?;
        if start + column > end {
            return Err(EdlError::ColumnOutOfRange { line, column });
        }
        Ok(start + column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Range};

    /// Apply a splice to `doc` and log it, the way the executor does.
    fn apply(doc: &mut Document, log: &mut Vec<Transform>, range: Range, text: &str) {
        log.push(Transform::splice(range.start, range.end, text.len()));
        doc.splice(range, text);
    }

    #[test]
    fn test_no_transforms_is_identity() {
        assert_eq!(resolve_index(17, &[]).unwrap(), 17);
    }

    #[test]
    fn test_offsets_before_edit_unchanged() {
        let log = [Transform::splice(10, 12, 5)];
        assert_eq!(resolve_index(3, &log).unwrap(), 3);
        assert_eq!(resolve_index(10, &log).unwrap(), 10);
    }

    #[test]
    fn test_offsets_after_edit_shift() {
        let grow = [Transform::splice(10, 12, 5)];
        assert_eq!(resolve_index(12, &grow).unwrap(), 15);
        assert_eq!(resolve_index(20, &grow).unwrap(), 23);

        let shrink = [Transform::splice(2, 8, 0)];
        assert_eq!(resolve_index(8, &shrink).unwrap(), 2);
        assert_eq!(resolve_index(9, &shrink).unwrap(), 3);
    }

    #[test]
    fn test_offset_inside_replaced_span_fails() {
        let log = [Transform::splice(10, 12, 5)];
        assert!(matches!(
            resolve_index(11, &log),
            Err(EdlError::StaleCoordinate { offset: 11 })
        ));
    }

    #[test]
    fn test_insertion_does_not_invalidate_its_point() {
        let log = [Transform::splice(4, 4, 3)];
        assert_eq!(resolve_index(4, &log).unwrap(), 4);
        assert_eq!(resolve_index(5, &log).unwrap(), 8);
    }

    #[test]
    fn test_chained_transforms() {
        let original = "line1\nline2\nline3\nline4\n";
        let layout = OriginalLayout::capture(original);
        let mut doc = Document::new(original);
        let mut log = Vec::new();

        // Replace line 1 with three lines, then delete line 2 by its original number.
        apply(&mut doc, &mut log, Range::new(0, 5), "a\nb\nc");
        let (s, e) = layout.line_bounds(2).unwrap();
        let range = Range::new(
            resolve_index(s, &log).unwrap(),
            resolve_index(e, &log).unwrap(),
        );
        assert_eq!(doc.text(range), "line2");
        apply(&mut doc, &mut log, range, "");

        // Line 4 still resolves to "line4" after both edits.
        let (s, e) = layout.line_bounds(4).unwrap();
        let range = Range::new(
            resolve_index(s, &log).unwrap(),
            resolve_index(e, &log).unwrap(),
        );
        assert_eq!(doc.text(range), "line4");
        assert_eq!(doc.content(), "a\nb\nc\n\nline3\nline4\n");
    }

    #[test]
    fn test_stale_after_chained_edit() {
        let original = "abcdefghij";
        let mut doc = Document::new(original);
        let mut log = Vec::new();
        apply(&mut doc, &mut log, Range::new(0, 2), "XYZW");
        apply(&mut doc, &mut log, Range::new(8, 10), "");
        // Original offset 7 ("h") now sits inside the second deletion.
        assert_eq!(doc.content(), "XYZWcdefij");
        assert!(resolve_index(7, &log).is_err());
        assert_eq!(resolve_index(8, &log).unwrap(), 8);
        assert_eq!(doc.text(Range::new(8, 10)), "ij");
    }

    #[test]
    fn test_layout_offset_of() {
        let layout = OriginalLayout::capture("ab\ncde\n");
        assert_eq!(layout.line_count(), 3);
        assert_eq!(layout.offset_of(2, 3).unwrap(), 6);
        assert!(layout.offset_of(2, 4).is_err());
        assert!(layout.offset_of(4, 0).is_err());
    }
}
