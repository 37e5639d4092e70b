//! Symbol resolution and loading.
//!
//! A [`Resolver`] owns three tables and walks them in a fixed order:
//! 1. Prefix paths (namespace prefix replaced by a directory)
//! 2. Vendor paths (sub-namespaces of a vendor, most specific first)
//! 3. Base paths (full hierarchical path under every matching namespace)
//! 4. The search path list, when enabled
//!
//! The first existing candidate is included and the runtime is asked whether
//! the symbol is now defined.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::host::{FileSystem, Runtime};
use crate::matcher::{
    find_in_lookups, hierarchical_lookups, prefix_lookups, search_path_lookup, vendor_lookups,
    AncestorPaths,
};
use crate::path_table::{normalize_directory, PathSpec, PathTable, VendorTable};
use crate::symbol::SymbolName;
use crate::{LoadError, Result};

/// Default file extension tried for every candidate.
pub const DEFAULT_EXTENSION: &str = ".php";

/// Environment variable holding the search path list.
pub const SEARCH_PATH_VAR: &str = "PATHLOADER_SEARCH_PATH";

/// Where the search path list comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchPath {
    /// A platform path list (`:` or `;` separated) read from this variable on
    /// every lookup.
    Environment(String),
    /// A fixed list of directories.
    Explicit(Vec<String>),
}

impl Default for SearchPath {
    fn default() -> Self {
        SearchPath::Environment(SEARCH_PATH_VAR.to_string())
    }
}

impl SearchPath {
    /// Normalized directories of the list, skipping empty entries.
    pub fn directories(&self) -> Vec<String> {
        let raw: Vec<String> = match self {
            SearchPath::Environment(var) => std::env::var_os(var)
                .map(|value| {
                    std::env::split_paths(&value)
                        .map(|p| p.to_string_lossy().into_owned())
                        .collect()
                })
                .unwrap_or_default(),
            SearchPath::Explicit(list) => list.clone(),
        };

        raw.iter()
            .filter(|dir| !dir.is_empty())
            .map(|dir| normalize_directory(dir))
            .collect()
    }
}

/// Settings that control lookup and error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Extensions tried for every candidate, in order.
    pub extensions: Vec<String>,
    /// Whether the search path list acts as a trailing base path.
    pub use_include_path: bool,
    pub search_path: SearchPath,
    /// When false, no error ever leaves [`Resolver::load_class`].
    pub verbose: bool,
    /// Whether an included file that did not define the symbol is an error.
    pub error_on_missing_symbol: bool,
    /// Whether a matching vendor binding without a file is an error.
    pub error_on_vendor_miss: bool,
    pub ancestor_paths: AncestorPaths,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            extensions: vec![DEFAULT_EXTENSION.to_string()],
            use_include_path: false,
            search_path: SearchPath::default(),
            verbose: true,
            error_on_missing_symbol: true,
            error_on_vendor_miss: false,
            ancestor_paths: AncestorPaths::default(),
        }
    }
}

/// Resolves symbol names to files and loads them into a runtime.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    options: LoaderOptions,
    base_paths: PathTable,
    prefix_paths: PathTable,
    vendor_paths: VendorTable,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: LoaderOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    pub fn set_verbose(&mut self, enabled: bool) -> &mut Self {
        self.options.verbose = enabled;
        self
    }

    pub fn use_include_path(&mut self, enabled: bool) -> &mut Self {
        self.options.use_include_path = enabled;
        self
    }

    pub fn set_search_path(&mut self, search_path: SearchPath) -> &mut Self {
        self.options.search_path = search_path;
        self
    }

    /// Set the dot-included extensions to try, e.g. `[".php", ".inc"]`.
    pub fn set_file_extensions<I, S>(&mut self, extensions: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn set_error_on_missing_symbol(&mut self, enabled: bool) -> &mut Self {
        self.options.error_on_missing_symbol = enabled;
        self
    }

    pub fn set_error_on_vendor_miss(&mut self, enabled: bool) -> &mut Self {
        self.options.error_on_vendor_miss = enabled;
        self
    }

    pub fn set_ancestor_paths(&mut self, policy: AncestorPaths) -> &mut Self {
        self.options.ancestor_paths = policy;
        self
    }

    /// Add base paths, where directories mirror the full namespace.
    pub fn add_base_path(&mut self, spec: impl Into<PathSpec>) -> &mut Self {
        self.base_paths.add(spec);
        self
    }

    /// Add base paths that only apply to symbols inside `namespace`.
    pub fn add_base_path_scoped(
        &mut self,
        namespace: &str,
        spec: impl Into<PathSpec>,
    ) -> &mut Self {
        self.base_paths.add_scoped(namespace, spec);
        self
    }

    /// Add prefix paths.
    ///
    /// If `Vendor\Foo\Bar` lives in `/usr/lib/Foo/Bar.php`, register it with
    /// `add_prefix_path_scoped("Vendor\\Foo", "/usr/lib/Foo")`.
    pub fn add_prefix_path(&mut self, spec: impl Into<PathSpec>) -> &mut Self {
        self.prefix_paths.add(spec);
        self
    }

    pub fn add_prefix_path_scoped(
        &mut self,
        namespace: &str,
        spec: impl Into<PathSpec>,
    ) -> &mut Self {
        self.prefix_paths.add_scoped(namespace, spec);
        self
    }

    /// Bind directories to a vendor (first segment) or one of its sub-namespaces.
    pub fn add_vendor_path(&mut self, namespace: &str, spec: impl Into<PathSpec>) -> &mut Self {
        self.vendor_paths.add(namespace, spec);
        self
    }

    pub fn base_paths(&self) -> &PathTable {
        &self.base_paths
    }

    pub fn prefix_paths(&self) -> &PathTable {
        &self.prefix_paths
    }

    pub fn vendor_paths(&self) -> &VendorTable {
        &self.vendor_paths
    }

    /// Find the file that should define `name`, without loading it.
    ///
    /// Returns `Ok(None)` for an empty name or when no candidate exists. The
    /// only error is [`LoadError::VendorFileMissing`], raised in verbose mode
    /// when vendor misses are configured to be errors. Silent resolvers fall
    /// through to the base table instead.
    pub fn find_file<F>(&self, fs: &F, name: &str) -> Result<Option<PathBuf>>
    where
        F: FileSystem + ?Sized,
    {
        let symbol = SymbolName::new(name);
        if symbol.is_empty() {
            return Ok(None);
        }
        let extensions = &self.options.extensions;

        let prefixed = prefix_lookups(&self.prefix_paths, &symbol);
        if let Some(file) = find_in_lookups(fs, &prefixed, extensions) {
            return Ok(Some(file));
        }

        let vendored = vendor_lookups(&self.vendor_paths, &symbol);
        if !vendored.is_empty() {
            if let Some(file) = find_in_lookups(fs, &vendored, extensions) {
                return Ok(Some(file));
            }
            if self.options.verbose && self.options.error_on_vendor_miss {
                return Err(LoadError::VendorFileMissing {
                    symbol: symbol.to_string(),
                });
            }
            tracing::debug!("No file for {} in vendor paths, falling back", symbol);
        }

        let based = hierarchical_lookups(&self.base_paths, &symbol, self.options.ancestor_paths);
        if let Some(file) = find_in_lookups(fs, &based, extensions) {
            return Ok(Some(file));
        }

        if self.options.use_include_path {
            let directories = self.options.search_path.directories();
            if !directories.is_empty() {
                let lookup = search_path_lookup(directories, &symbol);
                if let Some(file) = find_in_lookups(fs, &[lookup], extensions) {
                    return Ok(Some(file));
                }
            }
        }

        tracing::debug!("No file found for {}", symbol);
        Ok(None)
    }

    /// Load a symbol, reporting the outcome according to the verbose setting.
    ///
    /// See [`crate::Autoload::autoload`] for the contract.
    pub fn load_class(&self, runtime: &mut dyn Runtime, name: &str) -> Result<bool> {
        self.report(name, self.load_symbol(runtime, name))
    }

    /// Load a symbol and return the file it was loaded from.
    ///
    /// Unlike [`Resolver::load_class`] this always raises errors.
    pub fn load_symbol(&self, runtime: &mut dyn Runtime, name: &str) -> Result<Option<PathBuf>> {
        self.validate(runtime, name)?;
        self.locate_and_include(runtime, name)
    }

    /// Apply the verbose setting to the outcome of a load.
    pub(crate) fn report(&self, name: &str, outcome: Result<Option<PathBuf>>) -> Result<bool> {
        match outcome {
            Ok(file) => Ok(file.is_some()),
            Err(e) if self.options.verbose => Err(e),
            Err(e) => {
                tracing::debug!("Ignoring failure to load {:?}: {}", name, e);
                Ok(false)
            }
        }
    }

    /// Reject empty names and names the runtime already knows.
    pub(crate) fn validate(&self, runtime: &dyn Runtime, name: &str) -> Result<()> {
        if SymbolName::new(name).is_empty() {
            return Err(LoadError::InvalidName);
        }
        if runtime.is_defined(name) {
            return Err(LoadError::AlreadyDefined(name.to_string()));
        }
        Ok(())
    }

    pub(crate) fn locate_and_include(
        &self,
        runtime: &mut dyn Runtime,
        name: &str,
    ) -> Result<Option<PathBuf>> {
        let Some(file) = self.find_file(&*runtime, name)? else {
            return Ok(None);
        };
        let loaded = self.include_file(runtime, name, &file)?;
        Ok(loaded.then_some(file))
    }

    /// Include a file and check that it defined the symbol.
    fn include_file(&self, runtime: &mut dyn Runtime, name: &str, file: &Path) -> Result<bool> {
        runtime.include(file).map_err(|source| LoadError::Include {
            file: file.to_path_buf(),
            source,
        })?;

        if runtime.is_defined(name) {
            tracing::debug!("Loaded {} from {}", name, file.display());
            return Ok(true);
        }
        if self.options.error_on_missing_symbol {
            return Err(LoadError::SymbolNotDefined {
                symbol: name.to_string(),
                file: file.to_path_buf(),
            });
        }
        Ok(false)
    }
}
