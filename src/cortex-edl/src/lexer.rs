//! Tokenizer for EDL scripts.
//!
//! Scripts are line-oriented. Each non-empty, non-comment line yields its
//! tokens followed by a [`TokenKind::Newline`]. A heredoc consumes the lines
//! after its marker up to the terminator line.

use crate::error::{EdlError, EdlResult};

/// A lexical token with the 1-indexed line and 0-indexed column it started at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// A bare whitespace-delimited word.
    Word(String),
    /// A backtick-quoted path.
    Path(String),
    /// `/pattern/flags`. Flags are deduplicated, sorted, and always include `g`.
    Regex { pattern: String, flags: String },
    /// `<<DELIM` or `<<'DELIM'` followed by body lines and the terminator.
    Heredoc { delimiter: String, body: String },
    /// End of a command line.
    Newline,
}

impl TokenKind {
    /// Short description used in syntax errors.
    pub fn describe(&self) -> String {
        match self {
            Self::Word(w) => format!("'{w}'"),
            Self::Path(p) => format!("`{p}`"),
            Self::Regex { pattern, flags } => format!("/{pattern}/{flags}"),
            Self::Heredoc { delimiter, .. } => format!("heredoc <<{delimiter}"),
            Self::Newline => "end of line".to_string(),
        }
    }
}

/// Split a script into tokens.
pub fn tokenize(script: &str) -> EdlResult<Vec<Token>> {
    let lines: Vec<&str> = script.lines().collect();
    let mut tokens = Vec::new();
    let mut idx = 0;

    while idx < lines.len() {
        let line_no = idx + 1;
        let mut cursor = Cursor::new(lines[idx]);
        let mut next_idx = idx + 1;
        let mut emitted = false;

        loop {
            cursor.skip_whitespace();
            let Some(c) = cursor.peek() else { break };
            let column = cursor.pos;

            let kind = match c {
                '#' => break,
                '`' => lex_path(&mut cursor, line_no)?,
                '/' => lex_regex(&mut cursor, line_no)?,
                '<' if cursor.rest().starts_with("<<") => {
                    let delimiter = lex_heredoc_marker(&mut cursor, line_no)?;
                    let (body, terminator_idx) = read_heredoc_body(&lines, idx, &delimiter)?;
                    next_idx = terminator_idx + 1;
                    tokens.push(Token {
                        kind: TokenKind::Heredoc { delimiter, body },
                        line: line_no,
                        column,
                    });
                    emitted = true;
                    break;
                }
                _ => TokenKind::Word(cursor.take_until_whitespace().to_string()),
            };

            tokens.push(Token {
                kind,
                line: line_no,
                column,
            });
            emitted = true;
        }

        if emitted {
            tokens.push(Token {
                kind: TokenKind::Newline,
                line: line_no,
                column: lines[idx].len(),
            });
        }
        idx = next_idx;
    }

    Ok(tokens)
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn take_until_whitespace(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(|c| !c.is_whitespace()) {
            self.bump();
        }
        &self.src[start..self.pos]
    }
}

fn lex_path(cursor: &mut Cursor<'_>, line: usize) -> EdlResult<TokenKind> {
    let column = cursor.pos;
    cursor.bump();
    let rest = cursor.rest();
    let Some(end) = rest.find('`') else {
        return Err(EdlError::syntax_at(
            line,
            column,
            format!("unterminated path literal `{rest}"),
        ));
    };
    let path = rest[..end].to_string();
    if path.is_empty() {
        return Err(EdlError::syntax_at(line, column, "empty path literal"));
    }
    cursor.pos += end + 1;
    Ok(TokenKind::Path(path))
}

fn lex_regex(cursor: &mut Cursor<'_>, line: usize) -> EdlResult<TokenKind> {
    let column = cursor.pos;
    let start_rest = cursor.rest();
    cursor.bump();

    let mut pattern = String::new();
    loop {
        match cursor.bump() {
            None => {
                return Err(EdlError::syntax_at(
                    line,
                    column,
                    format!("unterminated regular expression {start_rest}"),
                ));
            }
            Some('\\') => match cursor.bump() {
                Some('/') => pattern.push('/'),
                Some(c) => {
                    pattern.push('\\');
                    pattern.push(c);
                }
                None => pattern.push('\\'),
            },
            Some('/') => break,
            Some(c) => pattern.push(c),
        }
    }

    let mut flags: Vec<char> = vec!['g'];
    while let Some(c) = cursor.peek().filter(char::is_ascii_alphabetic) {
        cursor.bump();
        flags.push(c);
    }
    if cursor.peek().is_some_and(|c| !c.is_whitespace()) {
        return Err(EdlError::syntax_at(
            line,
            cursor.pos,
            format!(
                "unexpected character after regular expression: {}",
                cursor.rest()
            ),
        ));
    }
    flags.sort_unstable();
    flags.dedup();

    Ok(TokenKind::Regex {
        pattern,
        flags: flags.into_iter().collect(),
    })
}

fn lex_heredoc_marker(cursor: &mut Cursor<'_>, line: usize) -> EdlResult<String> {
    let column = cursor.pos;
    cursor.pos += 2;

    let delimiter = if cursor.peek() == Some('\'') {
        cursor.bump();
        let rest = cursor.rest();
        let Some(end) = rest.find('\'') else {
            return Err(EdlError::syntax_at(
                line,
                column,
                format!("unterminated quoted heredoc marker <<'{rest}"),
            ));
        };
        cursor.pos += end + 1;
        rest[..end].to_string()
    } else {
        cursor.take_until_whitespace().to_string()
    };

    if delimiter.is_empty() || delimiter.chars().any(char::is_whitespace) {
        return Err(EdlError::syntax_at(line, column, "missing heredoc delimiter"));
    }

    cursor.skip_whitespace();
    if !cursor.rest().is_empty() {
        return Err(EdlError::syntax_at(
            line,
            cursor.pos,
            format!(
                "heredoc marker must end the line, found '{}'",
                cursor.rest()
            ),
        ));
    }

    Ok(delimiter)
}

/// Collect body lines after `marker_idx` up to the terminator.
/// Returns the body and the index of the terminator line.
fn read_heredoc_body(
    lines: &[&str],
    marker_idx: usize,
    delimiter: &str,
) -> EdlResult<(String, usize)> {
    let body_start = marker_idx + 1;
    let Some(offset) = lines[body_start.min(lines.len())..]
        .iter()
        .position(|l| *l == delimiter)
    else {
        let err = EdlError::syntax(
            marker_idx + 1,
            format!("unterminated heredoc: no line equal to '{delimiter}'"),
        );
        return Err(match heredoc_hint(lines, marker_idx, delimiter) {
            Some(hint) => err.with_hint(hint),
            None => err,
        });
    };

    let terminator_idx = body_start + offset;
    Ok((lines[body_start..terminator_idx].join("\n"), terminator_idx))
}

/// Explain why a heredoc never terminated, when the script shows a likely cause.
fn heredoc_hint(lines: &[&str], marker_idx: usize, delimiter: &str) -> Option<String> {
    if let Some(conflict) = lines
        .iter()
        .enumerate()
        .find(|(i, l)| *i != marker_idx && **l == delimiter)
        .map(|(i, _)| i + 1)
    {
        return Some(format!(
            "delimiter '{delimiter}' also appears as a content line at line {conflict}; \
             use a unique delimiter such as '{}'",
            unique_delimiter(lines, delimiter)
        ));
    }

    lines
        .iter()
        .enumerate()
        .skip(marker_idx + 1)
        .find(|(_, l)| l.trim() == delimiter)
        .map(|(i, _)| {
            format!(
                "line {} looks like the terminator '{delimiter}' but has surrounding whitespace",
                i + 1
            )
        })
}

/// First `DELIM_N` that does not occur anywhere in the script.
pub(crate) fn unique_delimiter(lines: &[&str], delimiter: &str) -> String {
    (1..)
        .map(|n| format!("{delimiter}_{n}"))
        .find(|candidate| !lines.iter().any(|l| l.contains(candidate.as_str())))
        .unwrap_or_else(|| format!("{delimiter}_UNIQUE"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(script: &str) -> Vec<TokenKind> {
        tokenize(script)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn word(s: &str) -> TokenKind {
        TokenKind::Word(s.to_string())
    }

    #[test]
    fn test_words_and_newlines() {
        assert_eq!(
            kinds("file a.txt\nretain_first\n"),
            vec![
                word("file"),
                word("a.txt"),
                TokenKind::Newline,
                word("retain_first"),
                TokenKind::Newline,
            ]
        );
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        assert_eq!(
            kinds("# header\n\n   \nfile a # trailing\n"),
            vec![word("file"), word("a"), TokenKind::Newline]
        );
    }

    #[test]
    fn test_backtick_path() {
        assert_eq!(
            kinds("file `dir with space/x.rs`"),
            vec![
                word("file"),
                TokenKind::Path("dir with space/x.rs".to_string()),
                TokenKind::Newline
            ]
        );
        assert!(tokenize("file `open").is_err());
    }

    #[test]
    fn test_regex_escapes_and_flags() {
        let tokens = kinds(r"narrow /a\/b\d/iig");
        assert_eq!(
            tokens[1],
            TokenKind::Regex {
                pattern: r"a/b\d".to_string(),
                flags: "gi".to_string(),
            }
        );
    }

    #[test]
    fn test_regex_without_flags_is_global() {
        let tokens = kinds("select /x/");
        assert_eq!(
            tokens[1],
            TokenKind::Regex {
                pattern: "x".to_string(),
                flags: "g".to_string(),
            }
        );
    }

    #[test]
    fn test_unterminated_regex() {
        let err = tokenize("narrow /abc").unwrap_err();
        assert!(err.is_syntax());
        assert!(err.to_string().contains("unterminated regular expression"));
    }

    #[test]
    fn test_heredoc_body() {
        let tokens = tokenize("replace <<EOF\nline one\n\nline three\nEOF\ndelete\n").unwrap();
        assert_eq!(
            tokens[1].kind,
            TokenKind::Heredoc {
                delimiter: "EOF".to_string(),
                body: "line one\n\nline three".to_string(),
            }
        );
        assert_eq!(tokens[2].kind, TokenKind::Newline);
        assert_eq!(tokens[3].kind, word("delete"));
        assert_eq!(tokens[3].line, 6);
    }

    #[test]
    fn test_quoted_heredoc_marker() {
        let tokens = kinds("insert_after <<'END'\n$x\nEND");
        assert_eq!(
            tokens[1],
            TokenKind::Heredoc {
                delimiter: "END".to_string(),
                body: "$x".to_string(),
            }
        );
        let err = tokenize("insert_after <<'END\nx\nEND").unwrap_err();
        assert!(err.to_string().contains("unterminated quoted heredoc marker"));
    }

    #[test]
    fn test_empty_heredoc() {
        let tokens = kinds("replace <<E\nE");
        assert_eq!(
            tokens[1],
            TokenKind::Heredoc {
                delimiter: "E".to_string(),
                body: String::new(),
            }
        );
    }

    #[test]
    fn test_heredoc_marker_must_end_line() {
        let err = tokenize("replace <<EOF extra\nx\nEOF").unwrap_err();
        assert!(err.to_string().contains("must end the line"));
    }

    #[test]
    fn test_unterminated_heredoc_plain() {
        let err = tokenize("replace <<EOF\nno end here").unwrap_err();
        assert!(err.to_string().contains("unterminated heredoc"));
        assert_eq!(err.hint(), None);
    }

    #[test]
    fn test_unterminated_heredoc_conflict_hint() {
        let script = "file a\nreplace <<X\nX\nfile b\ninsert_after <<X\nbody";
        // The first heredoc terminates on line 3; the second never does.
        let err = tokenize(script).unwrap_err();
        let hint = err.hint().expect("hint");
        assert!(hint.contains("'X'"));
        assert!(hint.contains("X_1"));
    }

    #[test]
    fn test_unterminated_heredoc_whitespace_hint() {
        let err = tokenize("replace <<EOF\nbody\n  EOF  \n").unwrap_err();
        let hint = err.hint().expect("hint");
        assert!(hint.contains("line 3"));
        assert!(hint.contains("whitespace"));
    }

    #[test]
    fn test_unique_delimiter_skips_taken_names() {
        let lines = ["EOF", "EOF_1", "x"];
        assert_eq!(unique_delimiter(&lines, "EOF"), "EOF_2");
    }

    #[test]
    fn test_token_positions() {
        let tokens = tokenize("\n  narrow /x/").unwrap();
        assert_eq!((tokens[0].line, tokens[0].column), (2, 2));
        assert_eq!((tokens[1].line, tokens[1].column), (2, 9));
    }
}
