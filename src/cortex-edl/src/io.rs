//! Storage capability used by the executor.
//!
//! The engine never touches storage directly. Hosts supply a [`FileIo`]
//! implementation; [`LocalFileIo`] covers the plain filesystem and
//! [`MemoryFileIo`] keeps everything in memory.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::fs;

/// File operations the executor needs from its host.
#[async_trait]
pub trait FileIo: Send + Sync {
    /// Read a whole file as UTF-8 text.
    async fn read_file(&self, path: &str) -> io::Result<String>;

    /// Create or overwrite a file.
    async fn write_file(&self, path: &str, content: &str) -> io::Result<()>;

    /// Check whether a file exists.
    async fn file_exists(&self, path: &str) -> io::Result<bool>;

    /// Create a directory and all of its parents.
    async fn mkdir(&self, path: &str) -> io::Result<()>;
}

/// Filesystem access with relative paths resolved against a root directory.
#[derive(Debug, Clone)]
pub struct LocalFileIo {
    root: PathBuf,
}

impl LocalFileIo {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl FileIo for LocalFileIo {
    async fn read_file(&self, path: &str) -> io::Result<String> {
        fs::read_to_string(self.resolve(path)).await
    }

    async fn write_file(&self, path: &str, content: &str) -> io::Result<()> {
        fs::write(self.resolve(path), content).await
    }

    async fn file_exists(&self, path: &str) -> io::Result<bool> {
        fs::try_exists(self.resolve(path)).await
    }

    async fn mkdir(&self, path: &str) -> io::Result<()> {
        fs::create_dir_all(self.resolve(path)).await
    }
}

/// In-memory files, for previews and tests.
#[derive(Debug, Default)]
pub struct MemoryFileIo {
    files: Mutex<BTreeMap<String, String>>,
    dirs: Mutex<BTreeSet<String>>,
    writes: Mutex<Vec<String>>,
}

impl MemoryFileIo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(path, content)` pairs.
    pub fn with_files<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        let io = Self::new();
        if let Ok(mut map) = io.files.lock() {
            map.extend(files.into_iter().map(|(p, c)| (p.into(), c.into())));
        }
        io
    }

    /// Current content of `path`.
    pub fn get(&self, path: &str) -> Option<String> {
        self.files.lock().ok()?.get(path).cloned()
    }

    /// Paths written so far, in write order.
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Whether `mkdir` was called for `path`.
    pub fn has_dir(&self, path: &str) -> bool {
        self.dirs.lock().is_ok_and(|d| d.contains(path))
    }
}

fn poisoned() -> io::Error {
    io::Error::other("memory file store lock poisoned")
}

#[async_trait]
impl FileIo for MemoryFileIo {
    async fn read_file(&self, path: &str) -> io::Result<String> {
        self.files
            .lock()
            .map_err(|_| poisoned())?
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{path} not found")))
    }

    async fn write_file(&self, path: &str, content: &str) -> io::Result<()> {
        self.files
            .lock()
            .map_err(|_| poisoned())?
            .insert(path.to_string(), content.to_string());
        self.writes
            .lock()
            .map_err(|_| poisoned())?
            .push(path.to_string());
        Ok(())
    }

    async fn file_exists(&self, path: &str) -> io::Result<bool> {
        Ok(self.files.lock().map_err(|_| poisoned())?.contains_key(path))
    }

    async fn mkdir(&self, path: &str) -> io::Result<()> {
        self.dirs
            .lock()
            .map_err(|_| poisoned())?
            .insert(path.to_string());
        Ok(())
    }
}
