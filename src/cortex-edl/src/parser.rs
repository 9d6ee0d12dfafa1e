//! EDL command grammar.

use crate::error::{EdlError, EdlResult};
use crate::lexer::{Token, TokenKind, tokenize};
use regex::{Regex, RegexBuilder};
use std::fmt;

/// Something that selects text.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// `/pattern/flags`.
    Regex(RegexPattern),
    /// Exact text from a heredoc.
    Literal(String),
    /// `N`: a whole line, newline excluded.
    Line(usize),
    /// `N:C`: a zero-width point.
    LineCol(usize, usize),
    /// `bof`.
    Bof,
    /// `eof`.
    Eof,
    /// `A-B`: from the start of `A` to the end of `B`.
    Range(Box<Pattern>, Box<Pattern>),
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regex(re) => write!(f, "/{}/{}", re.source, re.flags),
            Self::Literal(text) => write!(f, "<<{}>>", abbreviate(text, 40)),
            Self::Line(line) => write!(f, "{line}"),
            Self::LineCol(line, col) => write!(f, "{line}:{col}"),
            Self::Bof => f.write_str("bof"),
            Self::Eof => f.write_str("eof"),
            Self::Range(from, to) => write!(f, "{from}-{to}"),
        }
    }
}

/// A compiled regular expression along with its source text.
#[derive(Debug, Clone)]
pub struct RegexPattern {
    pub source: String,
    pub flags: String,
    pub regex: Regex,
}

impl RegexPattern {
    /// Compile `source` with single-letter `flags`.
    pub fn compile(source: &str, flags: &str) -> Result<Self, String> {
        let mut builder = RegexBuilder::new(source);
        for flag in flags.chars() {
            match flag {
                'g' | 'u' => {}
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                'x' => {
                    builder.ignore_whitespace(true);
                }
                other => return Err(format!("unknown regex flag '{other}'")),
            }
        }
        let regex = builder.build().map_err(|e| e.to_string())?;
        Ok(Self {
            source: source.to_string(),
            flags: flags.to_string(),
            regex,
        })
    }
}

/// Text argument of a mutation: inline heredoc text or a register name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSource {
    Literal(String),
    Register(String),
}

impl fmt::Display for TextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(text) => write!(f, "<<{}>>", abbreviate(text, 40)),
            Self::Register(name) => f.write_str(name),
        }
    }
}

/// One EDL command.
#[derive(Debug, Clone)]
pub enum Command {
    File(String),
    NewFile(String),
    Narrow(Pattern),
    NarrowOne(Pattern),
    Select(Pattern),
    SelectOne(Pattern),
    RetainFirst,
    RetainLast,
    RetainNth(i64),
    SelectNext(Pattern),
    SelectPrev(Pattern),
    ExtendForward(Pattern),
    ExtendBack(Pattern),
    Replace(TextSource),
    Delete,
    InsertBefore(TextSource),
    InsertAfter(TextSource),
    Cut(String),
}

impl Command {
    /// The script keyword for this command.
    pub fn name(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::NewFile(_) => "newfile",
            Self::Narrow(_) => "narrow",
            Self::NarrowOne(_) => "narrow_one",
            Self::Select(_) => "select",
            Self::SelectOne(_) => "select_one",
            Self::RetainFirst => "retain_first",
            Self::RetainLast => "retain_last",
            Self::RetainNth(_) => "retain_nth",
            Self::SelectNext(_) => "select_next",
            Self::SelectPrev(_) => "select_prev",
            Self::ExtendForward(_) => "extend_forward",
            Self::ExtendBack(_) => "extend_back",
            Self::Replace(_) => "replace",
            Self::Delete => "delete",
            Self::InsertBefore(_) => "insert_before",
            Self::InsertAfter(_) => "insert_after",
            Self::Cut(_) => "cut",
        }
    }

    /// The path of a `file`/`newfile` command.
    pub fn file_path(&self) -> Option<&str> {
        match self {
            Self::File(path) | Self::NewFile(path) => Some(path.as_str()),
            _ => None,
        }
    }

    /// Inline text carried by `replace`/`insert_before`/`insert_after`.
    pub fn literal_text(&self) -> Option<&str> {
        match self {
            Self::Replace(TextSource::Literal(text))
            | Self::InsertBefore(TextSource::Literal(text))
            | Self::InsertAfter(TextSource::Literal(text)) => Some(text.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name();
        match self {
            Self::File(path) | Self::NewFile(path) => write!(f, "{name} {path}"),
            Self::Narrow(p)
            | Self::NarrowOne(p)
            | Self::Select(p)
            | Self::SelectOne(p)
            | Self::SelectNext(p)
            | Self::SelectPrev(p)
            | Self::ExtendForward(p)
            | Self::ExtendBack(p) => write!(f, "{name} {p}"),
            Self::RetainNth(n) => write!(f, "{name} {n}"),
            Self::Replace(text) | Self::InsertBefore(text) | Self::InsertAfter(text) => {
                write!(f, "{name} {text}")
            }
            Self::Cut(register) => write!(f, "{name} {register}"),
            Self::RetainFirst | Self::RetainLast | Self::Delete => f.write_str(name),
        }
    }
}

/// A command together with the script line it starts on.
#[derive(Debug, Clone)]
pub struct Statement {
    pub line: usize,
    pub command: Command,
}

/// Argument shape of each command keyword.
enum Signature {
    Bare(Command),
    Path(fn(String) -> Command),
    Pattern(fn(Pattern) -> Command),
    Index(fn(i64) -> Command),
    Text(fn(TextSource) -> Command),
    Register(fn(String) -> Command),
}

fn signature(keyword: &str) -> Option<Signature> {
    Some(match keyword {
        "file" => Signature::Path(Command::File),
        "newfile" => Signature::Path(Command::NewFile),
        "narrow" => Signature::Pattern(Command::Narrow),
        "narrow_one" => Signature::Pattern(Command::NarrowOne),
        "select" => Signature::Pattern(Command::Select),
        "select_one" => Signature::Pattern(Command::SelectOne),
        "retain_first" => Signature::Bare(Command::RetainFirst),
        "retain_last" => Signature::Bare(Command::RetainLast),
        "retain_nth" => Signature::Index(Command::RetainNth),
        "select_next" => Signature::Pattern(Command::SelectNext),
        "select_prev" => Signature::Pattern(Command::SelectPrev),
        "extend_forward" => Signature::Pattern(Command::ExtendForward),
        "extend_back" => Signature::Pattern(Command::ExtendBack),
        "replace" => Signature::Text(Command::Replace),
        "delete" => Signature::Bare(Command::Delete),
        "insert_before" => Signature::Text(Command::InsertBefore),
        "insert_after" => Signature::Text(Command::InsertAfter),
        "cut" => Signature::Register(Command::Cut),
        _ => return None,
    })
}

/// Parse a script into statements.
pub fn parse_script(script: &str) -> EdlResult<Vec<Statement>> {
    let tokens = tokenize(script)?;
    let mut statements = Vec::new();
    let mut delimiters: Vec<&str> = Vec::new();

    for line_tokens in tokens.split(|t| t.kind == TokenKind::Newline) {
        let Some((head, args)) = line_tokens.split_first() else {
            continue;
        };

        let TokenKind::Word(keyword) = &head.kind else {
            return Err(EdlError::syntax_at(
                head.line,
                head.column,
                format!("expected a command, found {}", head.kind.describe()),
            ));
        };

        let Some(sig) = signature(keyword) else {
            let err = EdlError::syntax_at(
                head.line,
                head.column,
                format!("unknown command '{keyword}'"),
            );
            return Err(if delimiters.contains(&keyword.as_str()) {
                let lines: Vec<&str> = script.lines().collect();
                err.with_hint(format!(
                    "'{keyword}' is a heredoc delimiter used earlier; if it was meant as content, \
                     use a unique delimiter such as '{}'",
                    crate::lexer::unique_delimiter(&lines, keyword)
                ))
            } else {
                err
            });
        };

        let command = parse_arguments(head, keyword, sig, args)?;
        statements.push(Statement {
            line: head.line,
            command,
        });

        delimiters.extend(args.iter().filter_map(|t| match &t.kind {
            TokenKind::Heredoc { delimiter, .. } => Some(delimiter.as_str()),
            _ => None,
        }));
    }

    Ok(statements)
}

fn parse_arguments(
    head: &Token,
    keyword: &str,
    sig: Signature,
    args: &[Token],
) -> EdlResult<Command> {
    let expected = match &sig {
        Signature::Bare(_) => 0,
        _ => 1,
    };
    if args.len() < expected {
        return Err(EdlError::syntax_at(
            head.line,
            head.column,
            format!("'{keyword}' expects an argument"),
        ));
    }
    if let Some(extra) = args.get(expected) {
        return Err(EdlError::syntax_at(
            extra.line,
            extra.column,
            format!(
                "unexpected argument {} for '{keyword}'",
                extra.kind.describe()
            ),
        ));
    }

    let mismatch = |token: &Token, what: &str| {
        EdlError::syntax_at(
            token.line,
            token.column,
            format!(
                "'{keyword}' expects {what}, found {}",
                token.kind.describe()
            ),
        )
    };

    Ok(match sig {
        Signature::Bare(command) => command,
        Signature::Path(build) => match &args[0].kind {
            TokenKind::Word(path) | TokenKind::Path(path) => build(path.clone()),
            _ => return Err(mismatch(&args[0], "a path")),
        },
        Signature::Pattern(build) => build(parse_pattern(&args[0])?),
        Signature::Index(build) => match &args[0].kind {
            TokenKind::Word(word) => match word.parse::<i64>() {
                Ok(n) => build(n),
                Err(_) => return Err(mismatch(&args[0], "an integer")),
            },
            _ => return Err(mismatch(&args[0], "an integer")),
        },
        Signature::Text(build) => match &args[0].kind {
            TokenKind::Heredoc { body, .. } => build(TextSource::Literal(body.clone())),
            TokenKind::Word(name) => build(TextSource::Register(name.clone())),
            _ => return Err(mismatch(&args[0], "a heredoc or register name")),
        },
        Signature::Register(build) => match &args[0].kind {
            TokenKind::Word(name) => build(name.clone()),
            _ => return Err(mismatch(&args[0], "a register name")),
        },
    })
}

fn parse_pattern(token: &Token) -> EdlResult<Pattern> {
    match &token.kind {
        TokenKind::Regex { pattern, flags } => RegexPattern::compile(pattern, flags)
            .map(Pattern::Regex)
            .map_err(|e| {
                EdlError::syntax_at(
                    token.line,
                    token.column,
                    format!("invalid regular expression /{pattern}/{flags}: {e}"),
                )
            }),
        TokenKind::Heredoc { body, .. } => Ok(Pattern::Literal(body.clone())),
        TokenKind::Word(word) => parse_word_pattern(word).ok_or_else(|| {
            EdlError::syntax_at(
                token.line,
                token.column,
                format!("malformed pattern '{word}'"),
            )
        }),
        other => Err(EdlError::syntax_at(
            token.line,
            token.column,
            format!("expected a pattern, found {}", other.describe()),
        )),
    }
}

/// `N`, `N:C`, `bof`, `eof`, or `A-B` of two of those.
fn parse_word_pattern(word: &str) -> Option<Pattern> {
    if let Some(pattern) = parse_position(word) {
        return Some(pattern);
    }
    if word.matches('-').count() != 1 {
        return None;
    }
    let (from, to) = word.split_once('-')?;
    Some(Pattern::Range(
        Box::new(parse_position(from)?),
        Box::new(parse_position(to)?),
    ))
}

fn parse_position(word: &str) -> Option<Pattern> {
    match word {
        "bof" => Some(Pattern::Bof),
        "eof" => Some(Pattern::Eof),
        _ => match word.split_once(':') {
            Some((line, col)) => Some(Pattern::LineCol(parse_number(line)?, parse_number(col)?)),
            None => Some(Pattern::Line(parse_number(word)?)),
        },
    }
}

fn parse_number(s: &str) -> Option<usize> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Shorten `text` to at most `max` characters for display.
pub(crate) fn abbreviate(text: &str, max: usize) -> String {
    let escaped = text.replace('\n', "\\n");
    if escaped.chars().count() <= max {
        escaped
    } else {
        let mut out: String = escaped.chars().take(max.saturating_sub(3)).collect();
        out.push_str("...");
        out
    }
}
