//! Cortex EDL - scripted, multi-file text edits.
//!
//! An EDL script picks files, selects text with patterns (literals,
//! regular expressions, line/column coordinates, ranges, `bof`/`eof`), and
//! mutates the selection:
//! - Line numbers keep addressing the original file after earlier edits
//! - Failures are isolated per file; other files are still written
//! - Inline text of skipped commands is kept in `_saved_N` registers
//! - Registers persist across runs when passed back in
//!
//! # Example
//!
//! ```no_run
//! use cortex_edl::{LocalFileIo, run_script};
//!
//! # async fn demo() -> cortex_edl::EdlResult<()> {
//! let script = "file `src/main.rs`\nselect_one /old_name/\nreplace <<E\nnew_name\nE\n";
//! let io = LocalFileIo::new(".");
//! let outcome = run_script(script, &io, None).await?;
//! println!("{}", outcome.format_report());
//! # Ok(())
//! # }
//! ```

mod config;
mod document;
mod error;
mod executor;
mod io;
mod lexer;
mod parser;
mod registers;
mod remap;
mod report;

pub use config::RunOptions;
pub use document::{Document, Position, Range};
pub use error::{EdlError, EdlResult};
pub use executor::{Executor, FileState};
pub use io::{FileIo, LocalFileIo, MemoryFileIo};
pub use lexer::{Token, TokenKind, tokenize};
pub use parser::{Command, Pattern, RegexPattern, Statement, TextSource, parse_script};
pub use registers::{Registers, SAVED_PREFIX, SavedRegister};
pub use remap::{OriginalLayout, Transform, resolve_index};
pub use report::{
    FileError, FileMutation, MutationSummary, ScriptOutcome, SelectedRange, SelectionSnapshot,
    TraceEntry,
};

use tracing::debug;

/// Parse and run a script with default options.
///
/// `registers` carries register contents and the `_saved_N` counter from an
/// earlier run; pass `None` to start fresh. The returned outcome holds the
/// updated registers.
pub async fn run_script(
    script: &str,
    io: &dyn FileIo,
    registers: Option<Registers>,
) -> EdlResult<ScriptOutcome> {
    run_script_with_options(script, io, registers, RunOptions::default()).await
}

/// Parse and run a script with custom options.
///
/// Syntax errors fail before any command runs. Execution errors are reported
/// per file in [`ScriptOutcome::errors`], unless no file was selected yet, in
/// which case the run fails with [`EdlError::Aborted`].
pub async fn run_script_with_options(
    script: &str,
    io: &dyn FileIo,
    registers: Option<Registers>,
    options: RunOptions,
) -> EdlResult<ScriptOutcome> {
    let statements = parse_script(script)?;
    debug!(statements = statements.len(), "Parsed EDL script");

    Executor::new(io, registers.unwrap_or_default(), options)
        .run(&statements)
        .await
}
