//! pathloader: namespace-to-file resolution for on-demand symbol loading
//!
//! Given a fully qualified symbol name such as `Vendor\Lib\Sub\Class`, this
//! crate computes candidate file locations, checks which one exists, includes
//! it through the host runtime and verifies the symbol got defined:
//! - Base paths map every namespace segment onto a directory (PSR-0 style,
//!   with underscores in the final segment folded into directories)
//! - Prefix paths replace a namespace prefix with a directory (PSR-4 style)
//! - Vendor paths bind sub-namespaces of a vendor, most specific first
//! - A cache decorator remembers resolved files in a persisted JSON file

use std::path::PathBuf;

pub mod cache;
pub mod config;
pub mod hook;
pub mod host;
pub mod matcher;
pub mod path_table;
pub mod resolver;
pub mod store;
pub mod symbol;

// Re-export main types
pub use cache::{CachedResolver, FlushPolicy};
pub use config::Config;
pub use hook::{Autoload, LoaderRegistry};
pub use host::{FileSystem, LocalFileSystem, MemoryRuntime, Runtime};
pub use matcher::AncestorPaths;
pub use path_table::{PathSpec, PathTable, VendorTable};
pub use resolver::{LoaderOptions, Resolver, SearchPath};
pub use store::{CacheEntries, CacheStore, JsonFileStore, MemoryStore, StoreError};
pub use symbol::SymbolName;

/// Errors that can occur while loading a symbol
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Invalid symbol name")]
    InvalidName,

    #[error("Attempting to load '{0}' that already exists")]
    AlreadyDefined(String),

    #[error("Could not load '{symbol}' from any matching vendor path")]
    VendorFileMissing { symbol: String },

    #[error("Included file '{}' did not define '{symbol}'", file.display())]
    SymbolNotDefined { symbol: String, file: PathBuf },

    #[error("Failed to include '{}': {source}", file.display())]
    Include {
        file: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, LoadError>;
