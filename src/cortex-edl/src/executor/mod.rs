//! Script interpreter.
//!
//! The executor runs statements in order against per-file state. When a
//! command fails while a file is current, that file's pending work is
//! dropped, the rest of its section is skipped (inline texts are saved to
//! `_saved_N` registers), and execution resumes at the next `file`/`newfile`
//! for a different path. Files are written only after all statements ran.

mod mutate;
mod search;
mod state;

pub use state::FileState;

use crate::config::RunOptions;
use crate::document::Range;
use crate::error::{EdlError, EdlResult};
use crate::io::FileIo;
use crate::parser::{Command, Pattern, Statement, abbreviate};
use crate::registers::Registers;
use crate::report::{
    FileError, FileMutation, ScriptOutcome, SelectedRange, SelectionSnapshot, TraceEntry,
};
use indexmap::IndexMap;
use search::{ensure_selectable, find_matches};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// Interpreter state for one script run.
pub struct Executor<'a> {
    io: &'a dyn FileIo,
    options: RunOptions,
    /// Every path touched so far, in first-touch order.
    files: IndexMap<String, FileState>,
    /// Paths whose section failed.
    failed: HashSet<String>,
    current: Option<String>,
    selection: Vec<Range>,
    registers: Registers,
    trace: Vec<TraceEntry>,
    errors: Vec<FileError>,
}

impl<'a> Executor<'a> {
    pub fn new(io: &'a dyn FileIo, registers: Registers, options: RunOptions) -> Self {
        Self {
            io,
            options,
            files: IndexMap::new(),
            failed: HashSet::new(),
            current: None,
            selection: Vec::new(),
            registers,
            trace: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Execute all statements, then write every file that changed.
    pub async fn run(mut self, statements: &[Statement]) -> EdlResult<ScriptOutcome> {
        let mut idx = 0;
        while idx < statements.len() {
            let stmt = &statements[idx];
            debug!(line = stmt.line, command = %stmt.command, "executing");

            match self.execute(&stmt.command).await {
                Ok(snippet) => {
                    self.trace.push(TraceEntry {
                        line: stmt.line,
                        command: stmt.command.to_string(),
                        path: self.current.clone(),
                        snippet,
                    });
                    idx += 1;
                }
                Err(err) => {
                    let path = stmt
                        .command
                        .file_path()
                        .map(str::to_string)
                        .or_else(|| self.current.clone());
                    let Some(path) = path else {
                        return Err(EdlError::Aborted {
                            line: stmt.line,
                            message: err.to_string(),
                            trace: self.trace,
                        });
                    };
                    idx = self.isolate_failure(statements, idx, path, &err);
                }
            }
        }

        self.finish().await
    }

    /// Drop `path`'s work and skip to the next section for another path.
    /// Returns the index to resume at.
    fn isolate_failure(
        &mut self,
        statements: &[Statement],
        failed_idx: usize,
        path: String,
        err: &EdlError,
    ) -> usize {
        self.failed.insert(path.clone());

        let resume = statements[failed_idx + 1..]
            .iter()
            .position(|s| s.command.file_path().is_some_and(|p| p != path))
            .map(|offset| failed_idx + 1 + offset)
            .unwrap_or(statements.len());

        let saved_registers: Vec<_> = statements[failed_idx..resume]
            .iter()
            .filter_map(|s| s.command.literal_text())
            .map(|text| self.registers.save(text))
            .collect();

        warn!(
            path = %path,
            line = statements[failed_idx].line,
            skipped = resume - failed_idx,
            saved = saved_registers.len(),
            "File section failed: {err}"
        );

        let trace = self
            .trace
            .iter()
            .filter(|e| e.path.as_deref() == Some(path.as_str()))
            .cloned()
            .collect();

        self.errors.push(FileError {
            path,
            line: statements[failed_idx].line,
            message: err.to_string(),
            trace,
            saved_registers,
        });
        self.current = None;
        self.selection.clear();

        resume
    }

    async fn execute(&mut self, command: &Command) -> EdlResult<String> {
        match command {
            Command::File(path) => self.open_file(path).await,
            Command::NewFile(path) => self.create_file(path).await,
            Command::Narrow(p) => self.narrow(p, false),
            Command::NarrowOne(p) => self.narrow(p, true),
            Command::Select(p) => self.select(p, false),
            Command::SelectOne(p) => self.select(p, true),
            Command::RetainFirst => self.retain(0),
            Command::RetainLast => self.retain(-1),
            Command::RetainNth(n) => self.retain(*n),
            Command::SelectNext(p) => self.step(command.name(), p, Direction::Forward, false),
            Command::SelectPrev(p) => self.step(command.name(), p, Direction::Backward, false),
            Command::ExtendForward(p) => self.step(command.name(), p, Direction::Forward, true),
            Command::ExtendBack(p) => self.step(command.name(), p, Direction::Backward, true),
            Command::Replace(src) => {
                let text = self.text_of(src)?;
                self.replace(&text)
            }
            Command::Delete => self.delete(),
            Command::InsertBefore(src) => {
                let text = self.text_of(src)?;
                self.insert(&text, mutate::Side::Before)
            }
            Command::InsertAfter(src) => {
                let text = self.text_of(src)?;
                self.insert(&text, mutate::Side::After)
            }
            Command::Cut(register) => self.cut(register),
        }
    }

    fn file(&self) -> EdlResult<&FileState> {
        self.current
            .as_deref()
            .and_then(|path| self.files.get(path))
            .ok_or(EdlError::NoFileSelected)
    }

    async fn open_file(&mut self, path: &str) -> EdlResult<String> {
        if self.failed.contains(path) {
            return Err(EdlError::FileFailed {
                path: path.to_string(),
            });
        }

        if !self.files.contains_key(path) {
            let content = self
                .io
                .read_file(path)
                .await
                .map_err(|source| EdlError::ReadError {
                    path: path.to_string(),
                    source,
                })?;
            self.files
                .insert(path.to_string(), FileState::load(path, content));
        }

        self.current = Some(path.to_string());
        let file = self.file()?;
        let full = file.document.full_range();
        let snippet = format!(
            "{} line(s), {} byte(s)",
            file.document.line_count(),
            file.document.len()
        );
        self.selection = vec![full];
        Ok(snippet)
    }

    async fn create_file(&mut self, path: &str) -> EdlResult<String> {
        if self.failed.contains(path) {
            return Err(EdlError::FileFailed {
                path: path.to_string(),
            });
        }
        if self.files.contains_key(path) {
            return Err(EdlError::AlreadyLoaded {
                path: path.to_string(),
            });
        }
        let exists = self
            .io
            .file_exists(path)
            .await
            .map_err(|source| EdlError::ReadError {
                path: path.to_string(),
                source,
            })?;
        if exists {
            return Err(EdlError::AlreadyExists {
                path: path.to_string(),
            });
        }

        self.files
            .insert(path.to_string(), FileState::create(path));
        self.current = Some(path.to_string());
        self.selection = vec![Range::point(0)];
        Ok("new empty file".to_string())
    }

    fn narrow(&mut self, pattern: &Pattern, exactly_one: bool) -> EdlResult<String> {
        let file = self.file()?;
        ensure_selectable(pattern)?;
        let mut matches = Vec::new();
        for range in &self.selection {
            matches.extend(find_matches(file, pattern, *range)?);
        }
        // Touching ranges can both contain the same point.
        let mut seen = HashSet::new();
        matches.retain(|r| seen.insert(*r));
        let matches = check_count(pattern, matches, exactly_one)?;
        let snippet = self.describe(file, &matches);
        self.selection = matches;
        Ok(snippet)
    }

    fn select(&mut self, pattern: &Pattern, exactly_one: bool) -> EdlResult<String> {
        let file = self.file()?;
        ensure_selectable(pattern)?;
        let matches = find_matches(file, pattern, file.document.full_range())?;
        let matches = check_count(pattern, matches, exactly_one)?;
        let snippet = self.describe(file, &matches);
        self.selection = matches;
        Ok(snippet)
    }

    fn retain(&mut self, index: i64) -> EdlResult<String> {
        let file = self.file()?;
        let len = self.selection.len();
        if len == 0 {
            return Err(EdlError::EmptySelection);
        }
        let resolved = if index < 0 {
            len as i64 + index
        } else {
            index
        };
        if resolved < 0 || resolved >= len as i64 {
            return Err(EdlError::IndexOutOfBounds { index, len });
        }
        let kept = vec![self.selection[resolved as usize]];
        let snippet = self.describe(file, &kept);
        self.selection = kept;
        Ok(snippet)
    }

    fn step(
        &mut self,
        command: &'static str,
        pattern: &Pattern,
        direction: Direction,
        extend: bool,
    ) -> EdlResult<String> {
        let file = self.file()?;
        ensure_selectable(pattern)?;
        let current = single_range(command, &self.selection)?;

        let found = match direction {
            Direction::Forward => {
                let after = Range::new(current.end, file.document.len());
                find_matches(file, pattern, after)?.into_iter().next()
            }
            Direction::Backward => {
                let before = Range::new(0, current.start);
                find_matches(file, pattern, before)?.into_iter().last()
            }
        }
        .ok_or_else(|| EdlError::no_matches(pattern))?;

        let range = match (extend, direction) {
            (false, _) => found,
            (true, Direction::Forward) => Range::new(current.start, found.end),
            (true, Direction::Backward) => Range::new(found.start, current.end),
        };
        let snippet = self.describe(file, &[range]);
        self.selection = vec![range];
        Ok(snippet)
    }

    /// Summarize ranges for the trace.
    fn describe(&self, file: &FileState, ranges: &[Range]) -> String {
        const SHOWN: usize = 3;
        let width = self.options.snippet_width;
        let mut parts: Vec<String> = ranges
            .iter()
            .take(SHOWN)
            .map(|r| {
                let pos = file
                    .document
                    .offset_to_pos(r.start)
                    .map(|p| p.to_string())
                    .unwrap_or_default();
                format!("{pos} \"{}\"", abbreviate(file.document.text(*r), width))
            })
            .collect();
        if ranges.len() > SHOWN {
            parts.push(format!("+{} more", ranges.len() - SHOWN));
        }
        format!("{} range(s): {}", ranges.len(), parts.join(", "))
    }

    /// Write changed files and assemble the outcome.
    async fn finish(mut self) -> EdlResult<ScriptOutcome> {
        let mut files = Vec::new();
        let mut write_errors = Vec::new();

        for (path, state) in &self.files {
            if self.failed.contains(path) || !state.has_changes() {
                continue;
            }
            if !self.options.dry_run {
                if let Err(err) = write_file(self.io, state).await {
                    warn!(path = %path, "Write failed: {err}");
                    let trace: Vec<TraceEntry> = self
                        .trace
                        .iter()
                        .filter(|e| e.path.as_deref() == Some(path.as_str()))
                        .cloned()
                        .collect();
                    write_errors.push(FileError {
                        path: path.clone(),
                        line: trace.last().map(|e| e.line).unwrap_or(0),
                        message: err.to_string(),
                        trace,
                        saved_registers: Vec::new(),
                    });
                    continue;
                }
                info!(
                    path = %path,
                    mutations = state.summary.total(),
                    "Wrote file"
                );
            }
            files.push(FileMutation {
                path: path.clone(),
                created: state.created,
                summary: state.summary,
                content: state.document.content().to_string(),
            });
        }
        self.errors.extend(write_errors);

        let selection = match self.current.as_deref() {
            Some(path) if !self.failed.contains(path) => match self.files.get(path) {
                Some(state) => Some(snapshot(state, &self.selection)?),
                None => None,
            },
            _ => None,
        };

        info!(
            commands = self.trace.len(),
            files = files.len(),
            errors = self.errors.len(),
            dry_run = self.options.dry_run,
            "EDL script finished"
        );

        Ok(ScriptOutcome {
            trace: self.trace,
            files,
            selection,
            errors: self.errors,
            registers: self.registers,
            dry_run: self.options.dry_run,
        })
    }
}

async fn write_file(io: &dyn FileIo, state: &FileState) -> EdlResult<()> {
    let parent = Path::new(&state.path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty());
    if let (true, Some(parent)) = (state.created, parent) {
        let dir = parent.to_string_lossy().into_owned();
        io.mkdir(&dir)
            .await
            .map_err(|source| EdlError::CreateDirError { path: dir, source })?;
    }
    io.write_file(&state.path, state.document.content())
        .await
        .map_err(|source| EdlError::WriteError {
            path: state.path.clone(),
            source,
        })
}

fn snapshot(state: &FileState, selection: &[Range]) -> EdlResult<SelectionSnapshot> {
    let doc = &state.document;
    let ranges = selection
        .iter()
        .map(|r| {
            Ok(SelectedRange {
                start: doc.offset_to_pos(r.start)?,
                end: doc.offset_to_pos(r.end)?,
                text: doc.text(*r).to_string(),
            })
        })
        .collect::<EdlResult<Vec<_>>>()?;
    Ok(SelectionSnapshot {
        path: state.path.clone(),
        ranges,
    })
}

fn check_count(pattern: &Pattern, matches: Vec<Range>, exactly_one: bool) -> EdlResult<Vec<Range>> {
    match matches.len() {
        0 => Err(EdlError::no_matches(pattern)),
        1 => Ok(matches),
        count if exactly_one => Err(EdlError::TooManyMatches {
            pattern: pattern.to_string(),
            count,
        }),
        _ => Ok(matches),
    }
}

fn single_range(command: &'static str, selection: &[Range]) -> EdlResult<Range> {
    match selection {
        [range] => Ok(*range),
        _ => Err(EdlError::SelectionNotSingle {
            command,
            count: selection.len(),
        }),
    }
}
