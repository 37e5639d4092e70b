//! Ordered namespace-to-directory tables.
//!
//! A [`PathTable`] keeps, for every namespace key, the list of directories to
//! search in the order they were added. Keys are kept in first-insertion
//! order, which is also the order the matcher tries them in.
//!
//! A [`VendorTable`] groups sub-namespace bindings by their first segment and
//! keeps each group sorted most-specific-first.

use serde::Serialize;
use std::path::{is_separator, MAIN_SEPARATOR};

use crate::symbol::NAMESPACE_SEPARATOR;

/// Directories registered for a single namespace key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespacePaths {
    /// Normalized key: empty, or trimmed and terminated by exactly one `\`.
    pub namespace: String,
    /// Normalized directories, each terminated by exactly one separator.
    pub directories: Vec<String>,
}

impl NamespacePaths {
    /// Number of namespace segments in the key (zero for the unscoped key).
    pub fn depth(&self) -> usize {
        self.namespace.matches(NAMESPACE_SEPARATOR).count()
    }
}

/// The directories handed to [`PathTable::add`].
///
/// Mirrors the three shapes a caller can register at once: one directory,
/// an ordered list, or a list of `(namespace, directories)` pairs. An empty
/// namespace inside `Keyed` registers unscoped directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSpec {
    Dir(String),
    List(Vec<String>),
    Keyed(Vec<(String, Vec<String>)>),
}

impl PathSpec {
    /// Build a keyed spec from `(namespace, directory)` pairs.
    pub fn keyed<K, D>(pairs: impl IntoIterator<Item = (K, D)>) -> Self
    where
        K: Into<String>,
        D: Into<String>,
    {
        PathSpec::Keyed(
            pairs
                .into_iter()
                .map(|(k, d)| (k.into(), vec![d.into()]))
                .collect(),
        )
    }

    fn into_entries(self) -> Vec<(String, Vec<String>)> {
        match self {
            PathSpec::Dir(dir) => vec![(String::new(), vec![dir])],
            PathSpec::List(dirs) => vec![(String::new(), dirs)],
            PathSpec::Keyed(entries) => entries,
        }
    }

    fn into_directories(self) -> Vec<String> {
        self.into_entries()
            .into_iter()
            .flat_map(|(_, dirs)| dirs)
            .collect()
    }
}

impl From<&str> for PathSpec {
    fn from(dir: &str) -> Self {
        PathSpec::Dir(dir.to_string())
    }
}

impl From<String> for PathSpec {
    fn from(dir: String) -> Self {
        PathSpec::Dir(dir)
    }
}

impl From<&std::path::Path> for PathSpec {
    fn from(dir: &std::path::Path) -> Self {
        PathSpec::Dir(dir.to_string_lossy().into_owned())
    }
}

impl From<Vec<String>> for PathSpec {
    fn from(dirs: Vec<String>) -> Self {
        PathSpec::List(dirs)
    }
}

impl From<Vec<&str>> for PathSpec {
    fn from(dirs: Vec<&str>) -> Self {
        PathSpec::List(dirs.into_iter().map(str::to_string).collect())
    }
}

/// Normalize a namespace key: trim surrounding `\` and append exactly one.
///
/// The empty key (or a key made only of separators) stays empty and applies
/// to every symbol.
pub fn normalize_namespace(namespace: &str) -> String {
    let trimmed = namespace.trim_matches(NAMESPACE_SEPARATOR);
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}{NAMESPACE_SEPARATOR}")
    }
}

/// Normalize a directory so it ends with exactly one separator.
pub fn normalize_directory(directory: &str) -> String {
    let trimmed = directory.trim_end_matches(is_separator);
    format!("{trimmed}{MAIN_SEPARATOR}")
}

/// Ordered mapping from namespace key to directory list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PathTable {
    entries: Vec<NamespacePaths>,
}

impl PathTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add directories under the namespaces carried by a [`PathSpec::Keyed`],
    /// or unscoped for plain directories.
    pub fn add(&mut self, spec: impl Into<PathSpec>) {
        for (namespace, directories) in spec.into().into_entries() {
            self.insert(&namespace, directories);
        }
    }

    /// Add every directory of `spec` under `namespace`, ignoring its own keys.
    pub fn add_scoped(&mut self, namespace: &str, spec: impl Into<PathSpec>) {
        let directories = spec.into().into_directories();
        self.insert(namespace, directories);
    }

    fn insert(&mut self, namespace: &str, directories: Vec<String>) {
        let namespace = normalize_namespace(namespace);
        let directories = directories.iter().map(|d| normalize_directory(d));

        match self.entries.iter_mut().find(|e| e.namespace == namespace) {
            Some(entry) => entry.directories.extend(directories),
            None => self.entries.push(NamespacePaths {
                namespace,
                directories: directories.collect(),
            }),
        }
    }

    /// Directories registered for exactly this namespace key.
    pub fn lookup(&self, namespace: &str) -> Option<&[String]> {
        let namespace = normalize_namespace(namespace);
        self.entries
            .iter()
            .find(|e| e.namespace == namespace)
            .map(|e| e.directories.as_slice())
    }

    /// Entries in table order.
    pub fn iter(&self) -> impl Iterator<Item = &NamespacePaths> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Sub-namespace bindings for one vendor, most specific first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VendorPaths {
    pub vendor: String,
    pub bindings: Vec<NamespacePaths>,
}

/// Vendor-scoped bindings, grouped by the first namespace segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VendorTable {
    vendors: Vec<VendorPaths>,
}

impl VendorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind directories to a vendor or one of its sub-namespaces.
    ///
    /// A new sub-namespace resorts the vendor's bindings so that deeper
    /// namespaces are tried first; directories for a known sub-namespace are
    /// appended to it.
    pub fn add(&mut self, namespace: &str, spec: impl Into<PathSpec>) {
        let namespace = normalize_namespace(namespace);
        if namespace.is_empty() {
            tracing::warn!("Ignoring vendor path without a vendor name");
            return;
        }

        let vendor = namespace
            .split(NAMESPACE_SEPARATOR)
            .next()
            .unwrap_or_default()
            .to_string();
        let directories: Vec<String> = spec
            .into()
            .into_directories()
            .iter()
            .map(|d| normalize_directory(d))
            .collect();

        let index = match self.vendors.iter().position(|v| v.vendor == vendor) {
            Some(index) => index,
            None => {
                self.vendors.push(VendorPaths {
                    vendor,
                    bindings: Vec::new(),
                });
                self.vendors.len() - 1
            }
        };
        let group = &mut self.vendors[index];

        match group.bindings.iter_mut().find(|b| b.namespace == namespace) {
            Some(binding) => binding.directories.extend(directories),
            None => {
                group.bindings.push(NamespacePaths {
                    namespace,
                    directories,
                });
                group.bindings.sort_by(|a, b| {
                    b.depth()
                        .cmp(&a.depth())
                        .then_with(|| b.namespace.len().cmp(&a.namespace.len()))
                });
            }
        }
    }

    /// Bindings for a vendor, most specific first.
    pub fn lookup(&self, vendor: &str) -> Option<&[NamespacePaths]> {
        self.vendors
            .iter()
            .find(|v| v.vendor == vendor)
            .map(|v| v.bindings.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &VendorPaths> {
        self.vendors.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.vendors.is_empty()
    }
}
