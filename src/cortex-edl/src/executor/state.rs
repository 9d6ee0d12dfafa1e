//! Per-file execution state.

use crate::document::{Document, Range};
use crate::remap::{OriginalLayout, Transform};
use crate::report::MutationSummary;

/// Everything the executor tracks for one path.
#[derive(Debug, Clone)]
pub struct FileState {
    pub path: String,
    /// Live content.
    pub document: Document,
    /// Line layout at first load; line patterns address this.
    pub original: OriginalLayout,
    /// Splices applied so far, oldest first.
    pub transforms: Vec<Transform>,
    pub summary: MutationSummary,
    /// Created by `newfile` rather than read from storage.
    pub created: bool,
}

impl FileState {
    /// State for a file read from storage.
    pub fn load(path: impl Into<String>, content: String) -> Self {
        Self {
            path: path.into(),
            original: OriginalLayout::capture(&content),
            document: Document::new(content),
            transforms: Vec::new(),
            summary: MutationSummary::default(),
            created: false,
        }
    }

    /// State for a new, empty file.
    pub fn create(path: impl Into<String>) -> Self {
        Self {
            created: true,
            ..Self::load(path, String::new())
        }
    }

    /// Replace `range` with `text`, logging the transform.
    pub fn splice(&mut self, range: Range, text: &str) {
        self.transforms
            .push(Transform::splice(range.start, range.end, text.len()));
        self.document.splice(range, text);
    }

    /// Whether this file has anything to write.
    pub fn has_changes(&self) -> bool {
        self.created || self.summary.total() > 0
    }
}
