//! pld: inspect namespace-to-file resolution for a project.
//!
//! This CLI provides access to pathloader functionality for:
//! - Finding the file a symbol would be loaded from
//! - Printing the configured base, prefix and vendor tables
//! - Listing, pruning and clearing the persisted symbol cache

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pathloader::{CacheEntries, CacheStore, Config, JsonFileStore, LocalFileSystem, Resolver};
use serde::Serialize;

/// Exit codes for the CLI
///
/// - 0: Success
/// - 1: Not found (valid query, no results)
/// - 2: Error (invalid input, unreadable cache, etc.)
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const NOT_FOUND: u8 = 1;
    pub const ERROR: u8 = 2;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
    Text,
}

/// Namespace-to-file resolution for on-demand symbol loading
#[derive(Parser)]
#[command(name = "pld")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Suppress informational output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the file a symbol would be loaded from
    Find {
        /// Fully qualified symbol name (e.g. 'Vendor\Lib\Class')
        symbol: String,

        /// Project root containing .pathloader.toml
        #[arg(short, long, default_value = ".")]
        root: PathBuf,
    },

    /// Print the configured path tables
    Paths {
        /// Project root containing .pathloader.toml
        #[arg(short, long, default_value = ".")]
        root: PathBuf,
    },

    /// Manage the persisted symbol cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached symbol locations
    List {
        #[arg(short, long, default_value = ".")]
        root: PathBuf,
    },
    /// Drop entries whose file no longer exists
    Prune {
        #[arg(short, long, default_value = ".")]
        root: PathBuf,
    },
    /// Delete the cache file
    Clear {
        #[arg(short, long, default_value = ".")]
        root: PathBuf,
    },
}

#[derive(Serialize)]
struct FindOutput<'a> {
    symbol: &'a str,
    file: &'a Path,
}

#[derive(Serialize)]
struct PruneOutput<'a> {
    cache: &'a Path,
    removed: Vec<String>,
    remaining: usize,
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = cli.format;

    match run(cli.command, format, cli.quiet) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            if format != OutputFormat::Text {
                let error_json = serde_json::json!({
                    "error": "CommandFailed",
                    "message": format!("{:#}", e),
                });
                eprintln!("{}", error_json);
            } else {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

fn run(command: Commands, format: OutputFormat, quiet: bool) -> Result<u8> {
    match command {
        Commands::Find { symbol, root } => cmd_find(&symbol, &root, format, quiet),
        Commands::Paths { root } => cmd_paths(&root, format),
        Commands::Cache { action } => match action {
            CacheAction::List { root } => cmd_cache_list(&root, format, quiet),
            CacheAction::Prune { root } => cmd_cache_prune(&root, format, quiet),
            CacheAction::Clear { root } => cmd_cache_clear(&root, format, quiet),
        },
    }
}

fn print_json<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    let rendered = if format == OutputFormat::Pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", rendered);
    Ok(())
}

fn load_resolver(root: &Path) -> Result<(Config, Resolver)> {
    if !root.is_dir() {
        anyhow::bail!("Project root {} is not a directory", root.display());
    }
    let config = Config::load(root);
    let resolver = config.build_resolver(root);
    Ok((config, resolver))
}

/// Resolve a symbol against the real file system without loading it
fn cmd_find(symbol: &str, root: &Path, format: OutputFormat, quiet: bool) -> Result<u8> {
    let (_, resolver) = load_resolver(root)?;
    let found = resolver
        .find_file(&LocalFileSystem, symbol)
        .with_context(|| format!("Failed to resolve '{}'", symbol))?;

    match found {
        Some(file) => {
            if format == OutputFormat::Text {
                println!("{}", file.display());
            } else {
                print_json(
                    &FindOutput {
                        symbol,
                        file: &file,
                    },
                    format,
                )?;
            }
            Ok(exit_codes::SUCCESS)
        }
        None => {
            if format != OutputFormat::Text {
                print_json(
                    &serde_json::json!({
                        "error": "Symbol not found",
                        "symbol": symbol,
                    }),
                    format,
                )?;
            } else if !quiet {
                eprintln!("No file found for: {}", symbol);
            }
            Ok(exit_codes::NOT_FOUND)
        }
    }
}

fn cmd_paths(root: &Path, format: OutputFormat) -> Result<u8> {
    let (_, resolver) = load_resolver(root)?;

    if format != OutputFormat::Text {
        print_json(
            &serde_json::json!({
                "base": resolver.base_paths(),
                "prefix": resolver.prefix_paths(),
                "vendor": resolver.vendor_paths(),
            }),
            format,
        )?;
        return Ok(exit_codes::SUCCESS);
    }

    let tables = [
        ("base", resolver.base_paths()),
        ("prefix", resolver.prefix_paths()),
    ];
    for (label, table) in tables {
        for entry in table.iter() {
            for dir in &entry.directories {
                println!("{:<7} {:<30} {}", label, display_namespace(&entry.namespace), dir);
            }
        }
    }
    for vendor in resolver.vendor_paths().iter() {
        for binding in &vendor.bindings {
            for dir in &binding.directories {
                println!("{:<7} {:<30} {}", "vendor", binding.namespace, dir);
            }
        }
    }
    Ok(exit_codes::SUCCESS)
}

fn display_namespace(namespace: &str) -> &str {
    if namespace.is_empty() {
        "(any)"
    } else {
        namespace
    }
}

fn open_store(root: &Path) -> JsonFileStore {
    JsonFileStore::new(Config::load(root).cache_path(root))
}

fn load_entries(store: &JsonFileStore) -> Result<CacheEntries> {
    store
        .load()
        .with_context(|| format!("Failed to read cache {}", store.path().display()))
}

fn cmd_cache_list(root: &Path, format: OutputFormat, quiet: bool) -> Result<u8> {
    let store = open_store(root);
    let entries = load_entries(&store)?;

    if format != OutputFormat::Text {
        print_json(&entries, format)?;
    } else if entries.is_empty() {
        if !quiet {
            eprintln!("Cache is empty: {}", store.path().display());
        }
    } else {
        for (symbol, file) in &entries {
            println!("{} -> {}", symbol, file.display());
        }
    }
    Ok(exit_codes::SUCCESS)
}

fn cmd_cache_prune(root: &Path, format: OutputFormat, quiet: bool) -> Result<u8> {
    let mut store = open_store(root);
    let mut entries = load_entries(&store)?;

    let removed: Vec<String> = entries
        .iter()
        .filter(|(_, file)| !file.is_file())
        .map(|(symbol, _)| symbol.clone())
        .collect();
    for symbol in &removed {
        entries.remove(symbol);
    }
    if !removed.is_empty() {
        store
            .save(&entries)
            .with_context(|| format!("Failed to write cache {}", store.path().display()))?;
    }

    if format != OutputFormat::Text {
        print_json(
            &PruneOutput {
                cache: store.path(),
                removed,
                remaining: entries.len(),
            },
            format,
        )?;
    } else if !quiet {
        println!(
            "Pruned {} stale entries ({} remaining)",
            removed.len(),
            entries.len()
        );
    }
    Ok(exit_codes::SUCCESS)
}

fn cmd_cache_clear(root: &Path, format: OutputFormat, quiet: bool) -> Result<u8> {
    let store = open_store(root);
    let removed = store
        .clear()
        .with_context(|| format!("Failed to delete cache {}", store.path().display()))?;

    if format != OutputFormat::Text {
        print_json(
            &serde_json::json!({
                "cache": store.path(),
                "removed": removed,
            }),
            format,
        )?;
    } else if !quiet {
        if removed {
            println!("Removed {}", store.path().display());
        } else {
            println!("No cache at {}", store.path().display());
        }
    }
    Ok(exit_codes::SUCCESS)
}
