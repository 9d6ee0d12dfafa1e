//! Resolving patterns to ranges.

use super::state::FileState;
use crate::document::Range;
use crate::error::{EdlError, EdlResult};
use crate::parser::Pattern;
use crate::remap::resolve_index;
use regex::Regex;

/// All matches of `pattern` inside `within`, in document order.
///
/// Content patterns only match text inside `within`, but regex anchors and
/// word boundaries see the surrounding document. Positional patterns resolve
/// against the whole file and count only if they fall inside `within`.
pub(crate) fn find_matches(
    file: &FileState,
    pattern: &Pattern,
    within: Range,
) -> EdlResult<Vec<Range>> {
    match pattern {
        Pattern::Regex(re) => Ok(regex_matches(&re.regex, file.document.content(), within)),
        Pattern::Literal(text) => {
            if text.is_empty() {
                return Err(EdlError::EmptyLiteral);
            }
            Ok(file
                .document
                .text(within)
                .match_indices(text.as_str())
                .map(|(i, m)| Range::new(within.start + i, within.start + i + m.len()))
                .collect())
        }
        _ => {
            let range = resolve_positional(file, pattern)?;
            Ok(if within.contains_range(&range) {
                vec![range]
            } else {
                Vec::new()
            })
        }
    }
}

/// Non-overlapping matches of `regex` lying inside `within`, searched in the
/// full `content`.
fn regex_matches(regex: &Regex, content: &str, within: Range) -> Vec<Range> {
    let mut found: Vec<Range> = Vec::new();
    let mut at = within.start;
    while let Some(m) = regex.find_at(content, at) {
        if m.start() > within.end {
            break;
        }
        // An empty match right after a non-empty one is skipped, as find_iter does.
        let after_previous = m.is_empty()
            && found
                .last()
                .is_some_and(|prev| !prev.is_empty() && prev.end == m.start());
        let fits = m.end() <= within.end && !after_previous;
        if fits {
            found.push(Range::new(m.start(), m.end()));
        }
        at = if fits && !m.is_empty() {
            m.end()
        } else {
            match content[m.start()..].chars().next() {
                Some(c) => m.start() + c.len_utf8(),
                None => break,
            }
        };
    }
    found
}

/// Resolve a positional pattern to a range in the current content.
pub(crate) fn resolve_positional(file: &FileState, pattern: &Pattern) -> EdlResult<Range> {
    let doc = &file.document;
    let map = |offset: usize| resolve_index(offset, &file.transforms);

    match pattern {
        Pattern::Line(line) => {
            let (start, end) = file.original.line_bounds(*line)?;
            Ok(Range::new(map(start)?, map(end)?))
        }
        Pattern::LineCol(line, column) => {
            let offset = map(file.original.offset_of(*line, *column)?)?;
            if offset > doc.len() || !doc.content().is_char_boundary(offset) {
                return Err(EdlError::ColumnOutOfRange {
                    line: *line,
                    column: *column,
                });
            }
            Ok(Range::point(offset))
        }
        Pattern::Bof => Ok(Range::point(0)),
        Pattern::Eof => Ok(Range::point(doc.len())),
        Pattern::Range(from, to) => {
            let from_range = resolve_positional(file, from)?;
            let to_range = resolve_positional(file, to)?;
            if to_range.end < from_range.start {
                return Err(EdlError::InvertedRange {
                    pattern: pattern.to_string(),
                });
            }
            Ok(Range::new(from_range.start, to_range.end))
        }
        Pattern::Regex(_) | Pattern::Literal(_) => find_matches(file, pattern, doc.full_range())?
            .into_iter()
            .next()
            .ok_or_else(|| EdlError::no_matches(pattern)),
    }
}

/// Reject patterns that would match at every position.
pub(crate) fn ensure_selectable(pattern: &Pattern) -> EdlResult<()> {
    match pattern {
        Pattern::Literal(text) if text.is_empty() => Err(EdlError::EmptyLiteral),
        Pattern::Range(from, to) => {
            ensure_selectable(from)?;
            ensure_selectable(to)
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::RegexPattern;

    fn regex(src: &str) -> Pattern {
        Pattern::Regex(RegexPattern::compile(src, "g").unwrap())
    }

    fn texts(file: &FileState, ranges: &[Range]) -> Vec<String> {
        ranges
            .iter()
            .map(|r| file.document.text(*r).to_string())
            .collect()
    }

    #[test]
    fn test_regex_matches_within_range() {
        let file = FileState::load("f", "ab ab ab".to_string());
        let all = find_matches(&file, &regex("ab"), file.document.full_range()).unwrap();
        assert_eq!(all.len(), 3);

        let inner = find_matches(&file, &regex("ab"), Range::new(2, 8)).unwrap();
        assert_eq!(inner, vec![Range::new(3, 5), Range::new(6, 8)]);
    }

    #[test]
    fn test_regex_sees_text_around_range() {
        let file = FileState::load("f", "foobar bar\n".to_string());
        // `bar` inside `foobar` is not at a word boundary.
        let found = find_matches(&file, &regex(r"\bbar"), Range::new(3, 11)).unwrap();
        assert_eq!(found, vec![Range::new(7, 10)]);

        // The range starts mid-line, so only the real line start matches.
        let file = FileState::load("f", "a = b\nc\n".to_string());
        let line_start = Pattern::Regex(RegexPattern::compile("^", "gm").unwrap());
        let found = find_matches(&file, &line_start, Range::new(3, 7)).unwrap();
        assert_eq!(found, vec![Range::point(6)]);
    }

    #[test]
    fn test_literal_matches() {
        let file = FileState::load("f", "x.y x.y".to_string());
        let found = find_matches(
            &file,
            &Pattern::Literal("x.y".to_string()),
            file.document.full_range(),
        )
        .unwrap();
        assert_eq!(texts(&file, &found), vec!["x.y", "x.y"]);
    }

    #[test]
    fn test_empty_literal_rejected() {
        let file = FileState::load("f", "abc".to_string());
        let empty = Pattern::Literal(String::new());
        assert!(matches!(
            find_matches(&file, &empty, file.document.full_range()),
            Err(EdlError::EmptyLiteral)
        ));
        assert!(ensure_selectable(&empty).is_err());
        assert!(ensure_selectable(&regex("")).is_ok());
    }

    #[test]
    fn test_positional_patterns() {
        let file = FileState::load("f", "one\ntwo\nthree\n".to_string());
        let line = resolve_positional(&file, &Pattern::Line(2)).unwrap();
        assert_eq!(file.document.text(line), "two");

        let point = resolve_positional(&file, &Pattern::LineCol(3, 2)).unwrap();
        assert_eq!(point, Range::point(10));

        assert_eq!(
            resolve_positional(&file, &Pattern::Eof).unwrap(),
            Range::point(14)
        );

        let range = Pattern::Range(Box::new(Pattern::Line(1)), Box::new(Pattern::Line(2)));
        let r = resolve_positional(&file, &range).unwrap();
        assert_eq!(file.document.text(r), "one\ntwo");
    }

    #[test]
    fn test_inverted_range() {
        let file = FileState::load("f", "one\ntwo\n".to_string());
        let range = Pattern::Range(Box::new(Pattern::Line(2)), Box::new(Pattern::Line(1)));
        assert!(matches!(
            resolve_positional(&file, &range),
            Err(EdlError::InvertedRange { .. })
        ));
    }

    #[test]
    fn test_positional_outside_within_is_no_match() {
        let file = FileState::load("f", "one\ntwo\n".to_string());
        let found = find_matches(&file, &Pattern::Line(2), Range::new(0, 3)).unwrap();
        assert!(found.is_empty());
        let found = find_matches(&file, &Pattern::Line(2), Range::new(3, 8)).unwrap();
        assert_eq!(found, vec![Range::new(4, 7)]);
    }

    #[test]
    fn test_line_resolves_through_transforms() {
        let mut file = FileState::load("f", "one\ntwo\nthree\n".to_string());
        file.splice(Range::new(0, 3), "ONE\nAND A HALF");
        let line = resolve_positional(&file, &Pattern::Line(3)).unwrap();
        assert_eq!(file.document.text(line), "three");

        // Column 1 of the original line 1 is gone.
        assert!(matches!(
            resolve_positional(&file, &Pattern::LineCol(1, 1)),
            Err(EdlError::StaleCoordinate { .. })
        ));
    }
}
