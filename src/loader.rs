//! Source loaders - the file-read capability used by the includer
//!
//! `FsLoader` reads from disk, `MemoryLoader` serves from a map (tests, embedding).

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Read a named source and return its full text
pub trait SourceLoader {
    fn load(&self, name: &str) -> io::Result<String>;
}

/// Loads files from the filesystem
///
/// Names are resolved against `base_dir` when set, otherwise against the
/// process working directory.
#[derive(Debug, Clone, Default)]
pub struct FsLoader {
    base_dir: Option<PathBuf>,
}

impl FsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative names against `dir`
    pub fn with_base_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(dir.into()),
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        match &self.base_dir {
            Some(base) if Path::new(name).is_relative() => base.join(name),
            _ => PathBuf::from(name),
        }
    }
}

impl SourceLoader for FsLoader {
    fn load(&self, name: &str) -> io::Result<String> {
        let path = self.path_for(name);
        debug!(path = %path.display(), "Reading source file");
        std::fs::read_to_string(path)
    }
}

/// In-memory loader (name -> text)
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with_file(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.files.insert(name.into(), text.into());
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, name: &str) -> io::Result<String> {
        self.files.get(name).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no such source: {}", name))
        })
    }
}
