//! Matching symbol names against path tables.
//!
//! Every matcher returns a list of [`Lookup`]s: a group of directories plus
//! the relative file name to probe inside each of them. Groups are returned
//! in the order they must be tried. [`find_candidate`] then probes one group,
//! directory outer and extension inner.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::PathBuf;

use crate::host::FileSystem;
use crate::path_table::{PathTable, VendorTable};
use crate::symbol::{namespace_to_path, relative_path, SymbolName, NAMESPACE_SEPARATOR};

/// How directory lists of ancestor namespaces combine under the
/// hierarchical convention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AncestorPaths {
    /// Every key that prefixes the canonical name, in table order. Each
    /// key's directories are exhausted before moving to the next key.
    #[default]
    Ordered,
    /// Directories of every ancestor namespace are merged into one list and
    /// tried most specific first.
    Accumulated,
}

/// Which table a lookup came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupSource {
    Prefix,
    Vendor,
    Base,
    SearchPath,
}

impl std::fmt::Display for LookupSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupSource::Prefix => write!(f, "prefix"),
            LookupSource::Vendor => write!(f, "vendor"),
            LookupSource::Base => write!(f, "base"),
            LookupSource::SearchPath => write!(f, "search path"),
        }
    }
}

/// A group of directories to probe for one relative file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup<'a> {
    pub source: LookupSource,
    /// The namespace key that matched (most specific one when accumulated).
    pub namespace: Cow<'a, str>,
    pub directories: Cow<'a, [String]>,
    /// File name relative to each directory, without extension.
    pub relative: String,
}

/// Lookups from a prefix table: the key is stripped from the raw name and the
/// remainder maps verbatim onto directories, without underscore folding.
pub fn prefix_lookups<'a>(table: &'a PathTable, name: &SymbolName<'_>) -> Vec<Lookup<'a>> {
    let raw = name.as_str();

    table
        .iter()
        .filter_map(|entry| {
            let rest = raw.strip_prefix(entry.namespace.as_str())?;
            if rest.is_empty() {
                return None;
            }
            Some(Lookup {
                source: LookupSource::Prefix,
                namespace: Cow::Borrowed(entry.namespace.as_str()),
                directories: Cow::Borrowed(entry.directories.as_slice()),
                relative: namespace_to_path(rest),
            })
        })
        .collect()
}

/// Lookups from a base table: the full hierarchical path is searched under
/// every namespace that matches.
pub fn hierarchical_lookups<'a>(
    table: &'a PathTable,
    name: &SymbolName<'_>,
    policy: AncestorPaths,
) -> Vec<Lookup<'a>> {
    let relative = name.hierarchical_path();

    match policy {
        AncestorPaths::Ordered => {
            let canonical = name.canonical();
            table
                .iter()
                .filter(|entry| canonical.starts_with(entry.namespace.as_str()))
                .map(|entry| Lookup {
                    source: LookupSource::Base,
                    namespace: Cow::Borrowed(entry.namespace.as_str()),
                    directories: Cow::Borrowed(entry.directories.as_slice()),
                    relative: relative.clone(),
                })
                .collect()
        }
        AncestorPaths::Accumulated => {
            let mut combined = String::new();
            let mut deepest = None;
            let mut directories: Vec<String> = Vec::new();

            if let Some(unscoped) = table.lookup("") {
                directories.extend_from_slice(unscoped);
                deepest = Some(String::new());
            }
            for segment in name.hierarchical_segments() {
                combined.push_str(segment);
                combined.push(NAMESPACE_SEPARATOR);
                if let Some(found) = table.lookup(&combined) {
                    directories.extend_from_slice(found);
                    deepest = Some(combined.clone());
                }
            }

            match deepest {
                Some(namespace) => {
                    directories.reverse();
                    vec![Lookup {
                        source: LookupSource::Base,
                        namespace: Cow::Owned(namespace),
                        directories: Cow::Owned(directories),
                        relative,
                    }]
                }
                None => Vec::new(),
            }
        }
    }
}

/// Lookups from vendor bindings, most specific sub-namespace first.
///
/// Only names with at least two hierarchical segments take part. The matched
/// sub-namespace is removed from the relative path.
pub fn vendor_lookups<'a>(vendors: &'a VendorTable, name: &SymbolName<'_>) -> Vec<Lookup<'a>> {
    let segments = name.hierarchical_segments();
    if segments.len() < 2 {
        return Vec::new();
    }
    let Some(bindings) = vendors.lookup(segments[0]) else {
        return Vec::new();
    };

    let canonical = name.canonical();
    bindings
        .iter()
        .filter(|binding| canonical.starts_with(binding.namespace.as_str()))
        .map(|binding| Lookup {
            source: LookupSource::Vendor,
            namespace: Cow::Borrowed(binding.namespace.as_str()),
            directories: Cow::Borrowed(binding.directories.as_slice()),
            relative: relative_path(&segments[binding.depth()..]),
        })
        .collect()
}

/// Lookup over plain directories that apply to every symbol (the search path).
pub fn search_path_lookup<'a>(directories: Vec<String>, name: &SymbolName<'_>) -> Lookup<'a> {
    Lookup {
        source: LookupSource::SearchPath,
        namespace: Cow::Borrowed(""),
        directories: Cow::Owned(directories),
        relative: name.hierarchical_path(),
    }
}

/// Probe `directory + relative + extension` for every directory, then every
/// extension, returning the first file that exists.
pub fn find_candidate<F: FileSystem + ?Sized>(
    fs: &F,
    directories: &[String],
    relative: &str,
    extensions: &[String],
) -> Option<PathBuf> {
    for directory in directories {
        for extension in extensions {
            let candidate = PathBuf::from(format!("{directory}{relative}{extension}"));
            tracing::trace!("Probing {}", candidate.display());
            if fs.exists(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

/// Probe a list of lookups in order.
pub fn find_in_lookups<F: FileSystem + ?Sized>(
    fs: &F,
    lookups: &[Lookup<'_>],
    extensions: &[String],
) -> Option<PathBuf> {
    lookups.iter().find_map(|lookup| {
        let found = find_candidate(fs, &lookup.directories, &lookup.relative, extensions);
        if let Some(file) = &found {
            tracing::debug!(
                "Matched {} namespace {:?} -> {}",
                lookup.source,
                lookup.namespace,
                file.display()
            );
        }
        found
    })
}
