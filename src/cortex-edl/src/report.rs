//! Results of a script run.

use crate::document::Position;
use crate::parser::abbreviate;
use crate::registers::{Registers, SavedRegister};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// One executed command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEntry {
    /// Script line of the command.
    pub line: usize,
    /// The command as written, with long text abbreviated.
    pub command: String,
    /// File that was current when the command ran.
    pub path: Option<String>,
    /// What the command selected or changed.
    pub snippet: String,
}

/// Mutation counters for one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationSummary {
    pub insertions: usize,
    pub deletions: usize,
    pub replacements: usize,
    pub lines_added: usize,
    pub lines_removed: usize,
}

impl MutationSummary {
    /// Total number of counted mutations.
    pub fn total(&self) -> usize {
        self.insertions + self.deletions + self.replacements
    }

    /// Account for `old` text being replaced by `new` text.
    pub fn record_line_delta(&mut self, old: &str, new: &str) {
        let before = old.matches('\n').count();
        let after = new.matches('\n').count();
        if after > before {
            self.lines_added += after - before;
        } else {
            self.lines_removed += before - after;
        }
    }
}

/// A file written (or, in a dry run, that would be written).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMutation {
    pub path: String,
    /// Whether the file was created by `newfile`.
    pub created: bool,
    #[serde(flatten)]
    pub summary: MutationSummary,
    /// Resulting file content.
    pub content: String,
}

/// A selected range resolved to positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedRange {
    pub start: Position,
    pub end: Position,
    pub text: String,
}

/// The selection left at the end of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSnapshot {
    pub path: String,
    pub ranges: Vec<SelectedRange>,
}

/// A file whose section failed; none of its mutations were written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileError {
    pub path: String,
    /// Script line of the failing command.
    pub line: usize,
    pub message: String,
    /// Commands executed for this file up to the failure.
    pub trace: Vec<TraceEntry>,
    /// Registers filled with text from skipped commands.
    pub saved_registers: Vec<SavedRegister>,
}

/// Everything a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptOutcome {
    pub trace: Vec<TraceEntry>,
    pub files: Vec<FileMutation>,
    pub selection: Option<SelectionSnapshot>,
    pub errors: Vec<FileError>,
    pub registers: Registers,
    pub dry_run: bool,
}

impl ScriptOutcome {
    /// Check if every file section succeeded.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Find the written file for `path`.
    pub fn file(&self, path: &str) -> Option<&FileMutation> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Find the error reported for `path`.
    pub fn error(&self, path: &str) -> Option<&FileError> {
        self.errors.iter().find(|e| e.path == path)
    }

    /// Get a summary string.
    pub fn summary(&self) -> String {
        let action = if self.dry_run { "Would modify" } else { "Modified" };
        let mut summary = format!(
            "Executed {} command(s). {} {} file(s)",
            self.trace.len(),
            action,
            self.files.len()
        );
        if !self.errors.is_empty() {
            let saved: usize = self.errors.iter().map(|e| e.saved_registers.len()).sum();
            summary.push_str(&format!(
                " ({} file(s) failed, {} register(s) saved)",
                self.errors.len(),
                saved
            ));
        }
        summary
    }

    /// Render the full human-readable report.
    pub fn format_report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.summary());

        if !self.trace.is_empty() {
            let _ = writeln!(out, "\nTrace:");
            for entry in &self.trace {
                write_trace_entry(&mut out, entry, "  ");
            }
        }

        if !self.files.is_empty() {
            let _ = writeln!(out, "\nFiles:");
            for file in &self.files {
                let s = &file.summary;
                let _ = writeln!(
                    out,
                    "  {}{}: {} insertion(s), {} deletion(s), {} replacement(s), +{}/-{} lines",
                    file.path,
                    if file.created { " (new)" } else { "" },
                    s.insertions,
                    s.deletions,
                    s.replacements,
                    s.lines_added,
                    s.lines_removed
                );
            }
        }

        if !self.errors.is_empty() {
            let _ = writeln!(out, "\nErrors:");
            for error in &self.errors {
                let _ = writeln!(
                    out,
                    "  {} (line {}): {}",
                    error.path, error.line, error.message
                );
                for entry in &error.trace {
                    write_trace_entry(&mut out, entry, "    ");
                }
                for saved in &error.saved_registers {
                    let _ = writeln!(
                        out,
                        "    saved text of a skipped command to register {} ({} chars)",
                        saved.name, saved.size
                    );
                }
            }
        }

        if let Some(selection) = &self.selection {
            let _ = writeln!(out, "\nSelection in {}:", selection.path);
            for range in &selection.ranges {
                let _ = writeln!(
                    out,
                    "  {}-{} \"{}\"",
                    range.start,
                    range.end,
                    abbreviate(&range.text, 60)
                );
            }
        }

        out
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn write_trace_entry(out: &mut String, entry: &TraceEntry, indent: &str) {
    let _ = write!(out, "{indent}{:>4}: {}", entry.line, entry.command);
    if entry.snippet.is_empty() {
        let _ = writeln!(out);
    } else {
        let _ = writeln!(out, "  -> {}", entry.snippet);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome() -> ScriptOutcome {
        ScriptOutcome {
            trace: vec![TraceEntry {
                line: 1,
                command: "file a.txt".to_string(),
                path: Some("a.txt".to_string()),
                snippet: "3 lines".to_string(),
            }],
            files: vec![FileMutation {
                path: "a.txt".to_string(),
                created: false,
                summary: MutationSummary {
                    replacements: 2,
                    ..Default::default()
                },
                content: "x".to_string(),
            }],
            selection: None,
            errors: Vec::new(),
            registers: Registers::new(),
            dry_run: false,
        }
    }

    #[test]
    fn test_line_delta() {
        let mut s = MutationSummary::default();
        s.record_line_delta("a\nb\n", "c");
        assert_eq!((s.lines_added, s.lines_removed), (0, 2));
        s.record_line_delta("", "x\ny");
        assert_eq!((s.lines_added, s.lines_removed), (1, 2));
    }

    #[test]
    fn test_summary() {
        let mut report = outcome();
        assert_eq!(
            report.summary(),
            "Executed 1 command(s). Modified 1 file(s)"
        );

        report.errors.push(FileError {
            path: "b.txt".to_string(),
            line: 4,
            message: "boom".to_string(),
            trace: Vec::new(),
            saved_registers: vec![SavedRegister {
                name: "_saved_1".to_string(),
                size: 3,
            }],
        });
        assert!(!report.is_success());
        assert!(report.summary().contains("1 file(s) failed, 1 register(s) saved"));
    }

    #[test]
    fn test_format_report_sections() {
        let text = outcome().format_report();
        assert!(text.contains("Trace:"));
        assert!(text.contains("file a.txt  -> 3 lines"));
        assert!(text.contains("a.txt: 0 insertion(s), 0 deletion(s), 2 replacement(s)"));
        assert!(!text.contains("Errors:"));
    }

    #[test]
    fn test_json_is_camel_case() {
        let json: serde_json::Value =
            serde_json::from_str(&outcome().to_json().unwrap()).unwrap();
        assert_eq!(json["files"][0]["replacements"], 2);
        assert_eq!(json["files"][0]["linesAdded"], 0);
        assert_eq!(json["registers"]["nextSavedId"], 1);
        assert_eq!(json["dryRun"], false);
    }
}
