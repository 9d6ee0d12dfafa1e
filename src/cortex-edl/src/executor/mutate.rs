//! Mutation commands.
//!
//! Splices are applied in descending start order so earlier offsets stay
//! valid, and every splice is logged as a transform for line remapping.

use super::Executor;
use super::state::FileState;
use crate::document::Range;
use crate::error::{EdlError, EdlResult};
use crate::parser::{TextSource, abbreviate};

/// Which boundary of each range an insertion goes at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Side {
    Before,
    After,
}

impl Executor<'_> {
    /// The current file and the selection, borrowed together.
    fn target(&mut self) -> EdlResult<(&mut FileState, &mut Vec<Range>)> {
        let path = self.current.as_deref().ok_or(EdlError::NoFileSelected)?;
        let file = self.files.get_mut(path).ok_or(EdlError::NoFileSelected)?;
        Ok((file, &mut self.selection))
    }

    pub(super) fn text_of(&self, source: &TextSource) -> EdlResult<String> {
        match source {
            TextSource::Literal(text) => Ok(text.clone()),
            TextSource::Register(name) => self
                .registers
                .get(name)
                .map(str::to_string)
                .ok_or_else(|| EdlError::unknown_register(name.as_str())),
        }
    }

    pub(super) fn replace(&mut self, text: &str) -> EdlResult<String> {
        let width = self.options.snippet_width;
        let (file, selection) = self.target()?;
        let ranges = sorted_disjoint(selection, "replace")?;

        for range in ranges.iter().rev() {
            let old = file.document.text(*range).to_string();
            file.summary.replacements += 1;
            file.summary.record_line_delta(&old, text);
            file.splice(*range, text);
        }

        let mut delta: isize = 0;
        *selection = ranges
            .iter()
            .map(|range| {
                let start = range.start.saturating_add_signed(delta);
                delta += text.len() as isize - range.len() as isize;
                Range::new(start, start + text.len())
            })
            .collect();

        Ok(format!(
            "{} range(s) replaced with \"{}\"",
            ranges.len(),
            abbreviate(text, width)
        ))
    }

    pub(super) fn delete(&mut self) -> EdlResult<String> {
        let (file, selection) = self.target()?;
        let ranges = sorted_disjoint(selection, "delete")?;

        let mut removed = 0;
        for range in ranges.iter().rev() {
            let old = file.document.text(*range).to_string();
            file.summary.deletions += 1;
            file.summary.record_line_delta(&old, "");
            file.splice(*range, "");
            removed += range.len();
        }

        *selection = vec![Range::point(ranges[0].start)];
        Ok(format!(
            "{} range(s) deleted, {} byte(s) removed",
            ranges.len(),
            removed
        ))
    }

    pub(super) fn insert(&mut self, text: &str, side: Side) -> EdlResult<String> {
        let width = self.options.snippet_width;
        let (file, selection) = self.target()?;
        let ranges = sorted_disjoint(selection, "insert")?;

        let points: Vec<usize> = ranges
            .iter()
            .map(|r| match side {
                Side::Before => r.start,
                Side::After => r.end,
            })
            .collect();

        for &point in points.iter().rev() {
            file.summary.insertions += 1;
            file.summary.record_line_delta("", text);
            file.splice(Range::point(point), text);
        }

        // Keep each range on the text it covered before the insertion.
        let shift = |offset: usize, after_inserted: bool| {
            let count = points
                .iter()
                .filter(|&&p| p < offset || (after_inserted && p == offset))
                .count();
            offset + count * text.len()
        };
        let updated: Vec<Range> = selection
            .iter()
            .map(|r| {
                let (start_after, end_after) = match side {
                    Side::Before => (true, r.is_empty()),
                    Side::After => (!r.is_empty(), false),
                };
                Range::new(shift(r.start, start_after), shift(r.end, end_after))
            })
            .collect();
        *selection = updated;

        Ok(format!(
            "inserted \"{}\" at {} point(s)",
            abbreviate(text, width),
            points.len()
        ))
    }

    pub(super) fn cut(&mut self, register: &str) -> EdlResult<String> {
        let width = self.options.snippet_width;
        let (file, selection) = self.target()?;
        let range = match selection.as_slice() {
            [range] => *range,
            _ => {
                return Err(EdlError::SelectionNotSingle {
                    command: "cut",
                    count: selection.len(),
                });
            }
        };

        let text = file.document.text(range).to_string();
        file.summary.deletions += 1;
        file.summary.record_line_delta(&text, "");
        file.splice(range, "");
        *selection = vec![Range::point(range.start)];

        let snippet = format!(
            "cut \"{}\" into register {register}",
            abbreviate(&text, width)
        );
        self.registers.set(register, text);
        Ok(snippet)
    }
}

/// Selection ranges in ascending order, rejecting overlaps.
fn sorted_disjoint(selection: &[Range], command: &'static str) -> EdlResult<Vec<Range>> {
    if selection.is_empty() {
        return Err(EdlError::EmptySelection);
    }
    let mut ranges = selection.to_vec();
    ranges.sort_by_key(|r| (r.start, r.end));
    if ranges.windows(2).any(|w| w[1].start < w[0].end) {
        return Err(EdlError::OverlappingRanges { command });
    }
    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_disjoint() {
        let sorted =
            sorted_disjoint(&[Range::new(6, 8), Range::new(0, 2)], "replace").unwrap();
        assert_eq!(sorted, vec![Range::new(0, 2), Range::new(6, 8)]);

        // Touching ranges and repeated points are fine.
        assert!(sorted_disjoint(&[Range::new(0, 2), Range::new(2, 4)], "delete").is_ok());
        assert!(sorted_disjoint(&[Range::point(3), Range::point(3)], "insert").is_ok());
    }

    #[test]
    fn test_sorted_disjoint_rejects_overlap() {
        assert!(matches!(
            sorted_disjoint(&[Range::new(0, 5), Range::new(3, 8)], "replace"),
            Err(EdlError::OverlappingRanges { command: "replace" })
        ));
        assert!(matches!(
            sorted_disjoint(&[], "delete"),
            Err(EdlError::EmptySelection)
        ));
    }
}
