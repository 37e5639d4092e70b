//! Project configuration for pathloader.
//!
//! Loads settings from `.pathloader.toml` in the project root, layered over
//! the defaults and under `PATHLOADER_`-prefixed environment variables.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cache::{CachedResolver, FlushPolicy};
use crate::matcher::AncestorPaths;
use crate::path_table::PathSpec;
use crate::resolver::{LoaderOptions, Resolver, SearchPath, DEFAULT_EXTENSION};
use crate::store::{JsonFileStore, DEFAULT_CACHE_NAME, STATE_DIR};

/// Name of the configuration file in the project root.
pub const CONFIG_FILE: &str = ".pathloader.toml";

/// Prefix of environment variables overriding the configuration file.
pub const ENV_PREFIX: &str = "PATHLOADER_";

/// Directories bound to one namespace. An empty namespace is unscoped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PathBinding {
    #[serde(default)]
    pub namespace: String,
    pub paths: Vec<String>,
}

/// pathloader configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Extensions tried for every candidate (default: `[".php"]`).
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    #[serde(default)]
    pub use_include_path: bool,

    /// Fixed search path list; when unset the list is read from
    /// `PATHLOADER_SEARCH_PATH` at lookup time.
    #[serde(default)]
    pub search_path: Option<Vec<String>>,

    #[serde(default = "default_true")]
    pub verbose: bool,

    #[serde(default = "default_true")]
    pub error_on_missing_symbol: bool,

    #[serde(default)]
    pub error_on_vendor_miss: bool,

    #[serde(default)]
    pub ancestor_paths: AncestorPaths,

    /// Hierarchical (PSR-0 style) bindings.
    #[serde(default)]
    pub base: Vec<PathBinding>,

    /// Prefix-replacement (PSR-4 style) bindings.
    #[serde(default)]
    pub prefix: Vec<PathBinding>,

    /// Vendor sub-namespace bindings.
    #[serde(default)]
    pub vendor: Vec<PathBinding>,

    /// Cache file, relative to the project root unless absolute.
    #[serde(default = "default_cache_file")]
    pub cache_file: String,

    #[serde(default)]
    pub flush: FlushPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            use_include_path: false,
            search_path: None,
            verbose: true,
            error_on_missing_symbol: true,
            error_on_vendor_miss: false,
            ancestor_paths: AncestorPaths::default(),
            base: Vec::new(),
            prefix: Vec::new(),
            vendor: Vec::new(),
            cache_file: default_cache_file(),
            flush: FlushPolicy::default(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec![DEFAULT_EXTENSION.to_string()]
}

fn default_true() -> bool {
    true
}

fn default_cache_file() -> String {
    format!("{}/{}", STATE_DIR, DEFAULT_CACHE_NAME)
}

impl Config {
    /// Load configuration from `.pathloader.toml` in the given root directory.
    ///
    /// Returns the defaults if the file doesn't exist or fails to parse.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);

        // defaults <- toml file <- environment
        let figment = Figment::from(Serialized::defaults(Config::default()));
        let figment = if config_path.exists() {
            figment.merge(Toml::file(&config_path))
        } else {
            figment
        };
        // PATHLOADER_SEARCH_PATH is a platform path list read by the resolver
        let figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["search_path"]));

        match figment.extract() {
            Ok(config) => {
                if config_path.exists() {
                    tracing::info!("Loaded config from {:?}", config_path);
                }
                config
            }
            Err(e) => {
                tracing::warn!("Config error: {}", e);
                Self::default()
            }
        }
    }

    /// Resolver options described by this configuration.
    pub fn options(&self, root: &Path) -> LoaderOptions {
        let search_path = match &self.search_path {
            Some(list) => SearchPath::Explicit(list.iter().map(|d| resolve_dir(root, d)).collect()),
            None => SearchPath::default(),
        };
        LoaderOptions {
            extensions: self.extensions.clone(),
            use_include_path: self.use_include_path,
            search_path,
            verbose: self.verbose,
            error_on_missing_symbol: self.error_on_missing_symbol,
            error_on_vendor_miss: self.error_on_vendor_miss,
            ancestor_paths: self.ancestor_paths,
        }
    }

    /// Build a resolver, resolving relative directories against `root`.
    pub fn build_resolver(&self, root: &Path) -> Resolver {
        let mut resolver = Resolver::with_options(self.options(root));

        for binding in &self.base {
            let spec = binding_spec(root, binding);
            if binding.namespace.is_empty() {
                resolver.add_base_path(spec);
            } else {
                resolver.add_base_path_scoped(&binding.namespace, spec);
            }
        }
        for binding in &self.prefix {
            let spec = binding_spec(root, binding);
            if binding.namespace.is_empty() {
                resolver.add_prefix_path(spec);
            } else {
                resolver.add_prefix_path_scoped(&binding.namespace, spec);
            }
        }
        for binding in &self.vendor {
            resolver.add_vendor_path(&binding.namespace, binding_spec(root, binding));
        }

        resolver
    }

    /// Location of the cache file for a project root.
    pub fn cache_path(&self, root: &Path) -> PathBuf {
        root.join(&self.cache_file)
    }

    /// Build a resolver backed by the project's cache file.
    pub fn cached_resolver(&self, root: &Path) -> CachedResolver<JsonFileStore> {
        CachedResolver::new(
            self.build_resolver(root),
            JsonFileStore::new(self.cache_path(root)),
        )
        .with_flush_policy(self.flush)
    }
}

fn resolve_dir(root: &Path, dir: &str) -> String {
    if dir.is_empty() {
        return String::new();
    }
    root.join(dir).to_string_lossy().into_owned()
}

fn binding_spec(root: &Path, binding: &PathBinding) -> PathSpec {
    PathSpec::List(binding.paths.iter().map(|d| resolve_dir(root, d)).collect())
}
