//! Collaborators the resolver consumes from its host environment.
//!
//! The resolver never touches the file system or the symbol table directly:
//! existence checks go through [`FileSystem`], and inclusion plus the
//! "is this symbol defined" oracle go through [`Runtime`].

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

/// Existence checks for candidate files.
pub trait FileSystem {
    fn exists(&self, path: &Path) -> bool;
}

/// The host runtime that symbols are loaded into.
pub trait Runtime: FileSystem {
    /// Whether a symbol of any kind (type, interface, trait) is defined.
    fn is_defined(&self, name: &str) -> bool;

    /// Execute the top-level effects of a file.
    ///
    /// Whether the expected symbol got defined is checked separately through
    /// [`Runtime::is_defined`].
    fn include(&mut self, file: &Path) -> io::Result<()>;
}

/// File system backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// In-memory runtime: every virtual file declares the symbols it defines.
///
/// Including a file defines its symbols. Files can be removed after the fact
/// to simulate stale cache entries.
#[derive(Debug, Default, Clone)]
pub struct MemoryRuntime {
    files: HashMap<PathBuf, Vec<String>>,
    defined: HashSet<String>,
    included: Vec<PathBuf>,
}

impl MemoryRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file that defines the given symbols when included.
    pub fn add_file(&mut self, path: impl Into<PathBuf>, symbols: &[&str]) -> &mut Self {
        self.files.insert(
            path.into(),
            symbols.iter().map(|s| normalize_symbol(s)).collect(),
        );
        self
    }

    /// Remove a file; its symbols stay defined if it was already included.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) -> bool {
        self.files.remove(path.as_ref()).is_some()
    }

    /// Mark a symbol as defined without any file.
    pub fn define(&mut self, name: &str) -> &mut Self {
        self.defined.insert(normalize_symbol(name));
        self
    }

    /// Forget every defined symbol and the include log, keeping the files.
    ///
    /// Models starting a fresh process against the same file system.
    pub fn reset(&mut self) {
        self.defined.clear();
        self.included.clear();
    }

    /// Files included so far, in order.
    pub fn included(&self) -> &[PathBuf] {
        &self.included
    }
}

fn normalize_symbol(name: &str) -> String {
    name.trim_start_matches(crate::symbol::NAMESPACE_SEPARATOR)
        .to_string()
}

impl FileSystem for MemoryRuntime {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }
}

impl Runtime for MemoryRuntime {
    fn is_defined(&self, name: &str) -> bool {
        self.defined.contains(&normalize_symbol(name))
    }

    fn include(&mut self, file: &Path) -> io::Result<()> {
        let symbols = self.files.get(file).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", file.display()),
            )
        })?;
        self.included.push(file.to_path_buf());
        self.defined.extend(symbols);
        Ok(())
    }
}
