use pathloader::{
    Autoload, CacheStore, CachedResolver, Config, FileSystem, JsonFileStore, LoadError,
    LoaderRegistry, LocalFileSystem, Resolver, Runtime,
};
use std::{
    collections::HashSet,
    error::Error,
    fs, io,
    path::{Path, PathBuf},
    rc::Rc,
};
use tempfile::TempDir;

type TestResult<T = ()> = std::result::Result<T, Box<dyn Error>>;

/// Runtime over real files: every `define <Symbol>` line of an included file
/// defines that symbol.
#[derive(Default)]
struct DiskRuntime {
    defined: HashSet<String>,
    included: Vec<PathBuf>,
}

impl FileSystem for DiskRuntime {
    fn exists(&self, path: &Path) -> bool {
        LocalFileSystem.exists(path)
    }
}

impl Runtime for DiskRuntime {
    fn is_defined(&self, name: &str) -> bool {
        self.defined.contains(name.trim_start_matches('\\'))
    }

    fn include(&mut self, file: &Path) -> io::Result<()> {
        let content = fs::read_to_string(file)?;
        self.included.push(file.to_path_buf());
        for line in content.lines() {
            if let Some(symbol) = line.strip_prefix("define ") {
                self.defined.insert(symbol.trim().to_string());
            }
        }
        Ok(())
    }
}

/// A throwaway project with source files on disk.
struct SampleProject {
    dir: TempDir,
}

impl SampleProject {
    fn new() -> TestResult<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn path(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .fold(self.root().to_path_buf(), |path, part| path.join(part))
    }

    /// Writes a source file defining `symbols`, creating parent directories.
    fn write_source(&self, relative: &str, symbols: &[&str]) -> TestResult<PathBuf> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body: String = symbols.iter().map(|s| format!("define {s}\n")).collect();
        fs::write(&path, body)?;
        Ok(path)
    }

    fn dir(&self, relative: &str) -> String {
        self.path(relative).to_string_lossy().into_owned()
    }

    fn cache_file(&self) -> PathBuf {
        self.path(".pathloader/cache.json")
    }
}

#[test]
fn base_and_prefix_paths_resolve_on_disk() -> TestResult {
    let project = SampleProject::new()?;
    let hierarchical = project.write_source("lib/Foo/Bar.php", &["Foo\\Bar"])?;
    let prefixed = project.write_source("src/Sub/Class.php", &["Vendor\\Lib\\Sub\\Class"])?;

    let mut resolver = Resolver::new();
    resolver
        .add_base_path(project.dir("lib"))
        .add_prefix_path_scoped("Vendor\\Lib", project.dir("src"));

    assert_eq!(
        resolver.find_file(&LocalFileSystem, "Foo\\Bar")?,
        Some(hierarchical)
    );
    assert_eq!(
        resolver.find_file(&LocalFileSystem, "\\Vendor\\Lib\\Sub\\Class")?,
        Some(prefixed)
    );
    assert_eq!(resolver.find_file(&LocalFileSystem, "Foo\\Missing")?, None);

    Ok(())
}

#[test]
fn cache_survives_between_processes() -> TestResult {
    let project = SampleProject::new()?;
    let file = project.write_source("lib/Foo/Bar.php", &["Foo\\Bar"])?;

    let mut resolver = Resolver::new();
    resolver.add_base_path(project.dir("lib"));

    let first = CachedResolver::new(resolver, JsonFileStore::new(project.cache_file()));
    let mut runtime = DiskRuntime::default();
    assert!(first.load_class(&mut runtime, "Foo\\Bar")?);
    first.close()?;

    let stored = JsonFileStore::new(project.cache_file()).load()?;
    assert_eq!(stored.get("Foo\\Bar"), Some(&file));

    // A fresh process with no paths configured still finds the symbol
    let second = CachedResolver::new(Resolver::new(), JsonFileStore::new(project.cache_file()));
    let mut runtime = DiskRuntime::default();
    assert!(second.load_class(&mut runtime, "Foo\\Bar")?);
    assert_eq!(runtime.included, vec![file]);
    assert!(!second.is_dirty());

    Ok(())
}

#[test]
fn stale_cache_entry_heals_itself() -> TestResult {
    let project = SampleProject::new()?;
    let old = project.write_source("old/Foo/Bar.php", &["Foo\\Bar"])?;

    let mut resolver = Resolver::new();
    resolver.add_base_path(project.dir("old"));
    let cached = CachedResolver::new(resolver, JsonFileStore::new(project.cache_file()));
    assert!(cached.load_class(&mut DiskRuntime::default(), "Foo\\Bar")?);
    drop(cached);

    // The file moves to a new directory
    fs::remove_file(&old)?;
    let new = project.write_source("new/Foo/Bar.php", &["Foo\\Bar"])?;

    let mut resolver = Resolver::new();
    resolver.add_base_path(project.dir("new"));
    let cached = CachedResolver::new(resolver, JsonFileStore::new(project.cache_file()));
    assert!(cached.load_class(&mut DiskRuntime::default(), "Foo\\Bar")?);

    let stored = JsonFileStore::new(project.cache_file()).load()?;
    assert_eq!(stored.get("Foo\\Bar"), Some(&new));

    Ok(())
}

#[test]
fn corrupt_cache_file_starts_empty() -> TestResult {
    let project = SampleProject::new()?;
    project.write_source("lib/Foo.php", &["Foo"])?;
    fs::create_dir_all(project.path(".pathloader"))?;
    fs::write(project.cache_file(), "not json")?;

    let mut resolver = Resolver::new();
    resolver.add_base_path(project.dir("lib"));
    let cached = CachedResolver::new(resolver, JsonFileStore::new(project.cache_file()));
    assert!(cached.entries().is_empty());

    assert!(cached.load_class(&mut DiskRuntime::default(), "Foo")?);
    assert_eq!(JsonFileStore::new(project.cache_file()).load()?.len(), 1);

    Ok(())
}

#[test]
fn registry_chains_loaders_from_config() -> TestResult {
    let project = SampleProject::new()?;
    project.write_source("lib/App/Kernel.php", &["App\\Kernel"])?;
    project.write_source("vendor/acme/Widget/Button.php", &["Acme\\Widget\\Button"])?;
    fs::write(
        project.path(".pathloader.toml"),
        r#"
verbose = false

[[base]]
paths = ["lib"]

[[vendor]]
namespace = 'Acme'
paths = ["vendor/acme"]
"#,
    )?;

    let config = Config::load(project.root());
    let loader: Rc<dyn Autoload> = Rc::new(config.cached_resolver(project.root()));
    let mut registry = LoaderRegistry::new();
    assert!(registry.register(loader.clone()));

    let mut runtime = DiskRuntime::default();
    assert!(registry.load(&mut runtime, "App\\Kernel")?);
    assert!(registry.load(&mut runtime, "Acme\\Widget\\Button")?);
    assert!(!registry.load(&mut runtime, "Acme\\Widget\\Missing")?);
    assert_eq!(runtime.included.len(), 2);

    assert!(registry.unregister(&loader));
    assert!(registry.is_empty());
    assert_eq!(JsonFileStore::new(project.cache_file()).load()?.len(), 2);

    Ok(())
}

#[test]
fn verbose_loader_reports_missing_symbol() -> TestResult {
    let project = SampleProject::new()?;
    let file = project.write_source("lib/NoClassHere.php", &[])?;

    let mut resolver = Resolver::new();
    resolver.add_base_path(project.dir("lib"));

    match resolver.load_class(&mut DiskRuntime::default(), "NoClassHere") {
        Err(LoadError::SymbolNotDefined { symbol, file: found }) => {
            assert_eq!(symbol, "NoClassHere");
            assert_eq!(found, file);
        }
        other => panic!("expected SymbolNotDefined, got {other:?}"),
    }

    Ok(())
}
