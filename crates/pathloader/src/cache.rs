//! Caching decorator around [`Resolver`].
//!
//! Known symbol locations are served from a [`CacheStore`] without searching
//! any table. A cached file that no longer defines its symbol is evicted and
//! the symbol is resolved again from scratch.

use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell};
use std::path::PathBuf;

use crate::host::Runtime;
use crate::resolver::Resolver;
use crate::store::{CacheEntries, CacheStore, StoreError};
use crate::symbol::SymbolName;
use crate::Result;

/// When newly resolved entries are written to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlushPolicy {
    /// Rewrite the store every time an entry is added.
    #[default]
    Immediate,
    /// Only mark the cache dirty; the owner must call
    /// [`CachedResolver::flush`] or [`CachedResolver::close`].
    Deferred,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: CacheEntries,
    dirty: bool,
}

/// A [`Resolver`] that remembers where symbols were found.
///
/// State lives behind `RefCell` so the resolver can be shared as an
/// [`crate::Autoload`] handle. Not meant for use across threads.
#[derive(Debug)]
pub struct CachedResolver<S: CacheStore> {
    resolver: Resolver,
    store: RefCell<S>,
    state: RefCell<CacheState>,
    policy: FlushPolicy,
}

impl<S: CacheStore> CachedResolver<S> {
    /// Wrap a resolver, reading the current entries from the store.
    ///
    /// An unreadable store starts the cache empty; it is overwritten on the
    /// next save.
    pub fn new(resolver: Resolver, store: S) -> Self {
        let entries = match store.load() {
            Ok(entries) => {
                tracing::info!("Loaded {} cached symbol paths", entries.len());
                entries
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable symbol cache: {}", e);
                CacheEntries::new()
            }
        };

        Self {
            resolver,
            store: RefCell::new(store),
            state: RefCell::new(CacheState {
                entries,
                dirty: false,
            }),
            policy: FlushPolicy::default(),
        }
    }

    pub fn with_flush_policy(mut self, policy: FlushPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut Resolver {
        &mut self.resolver
    }

    pub fn store(&self) -> Ref<'_, S> {
        self.store.borrow()
    }

    /// Snapshot of the current entries.
    pub fn entries(&self) -> CacheEntries {
        self.state.borrow().entries.clone()
    }

    pub fn cached_path(&self, name: &str) -> Option<PathBuf> {
        self.state
            .borrow()
            .entries
            .get(SymbolName::new(name).as_str())
            .cloned()
    }

    /// Whether entries were added since the last write.
    pub fn is_dirty(&self) -> bool {
        self.state.borrow().dirty
    }

    /// Load a symbol, reporting the outcome according to the verbose setting.
    pub fn load_class(&self, runtime: &mut dyn Runtime, name: &str) -> Result<bool> {
        self.resolver.report(name, self.load_symbol(runtime, name))
    }

    /// Load a symbol, serving its file from the cache when possible.
    pub fn load_symbol(&self, runtime: &mut dyn Runtime, name: &str) -> Result<Option<PathBuf>> {
        self.resolver.validate(runtime, name)?;
        let key = SymbolName::new(name).as_str().to_string();

        if let Some(cached) = self.cached_path(&key) {
            if runtime.include(&cached).is_ok() && runtime.is_defined(name) {
                tracing::debug!("Loaded {} from cached path {}", name, cached.display());
                return Ok(Some(cached));
            }

            tracing::warn!("Evicting stale cache entry {} -> {}", key, cached.display());
            self.state.borrow_mut().entries.remove(&key);
            self.persist();
        }

        let loaded = self.resolver.locate_and_include(runtime, name)?;
        if let Some(file) = &loaded {
            let absolute = std::path::absolute(file).unwrap_or_else(|_| file.clone());
            {
                let mut state = self.state.borrow_mut();
                state.entries.insert(key, absolute);
                state.dirty = true;
            }
            if self.policy == FlushPolicy::Immediate {
                self.persist();
            }
        }
        Ok(loaded)
    }

    /// Remove an entry. Returns false if the symbol was not cached.
    pub fn forget(&self, name: &str) -> std::result::Result<bool, StoreError> {
        let removed = self
            .state
            .borrow_mut()
            .entries
            .remove(SymbolName::new(name).as_str())
            .is_some();
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    /// Write pending entries to the store.
    pub fn flush(&self) -> std::result::Result<(), StoreError> {
        if self.is_dirty() {
            self.save()?;
        }
        Ok(())
    }

    /// Flush and give up the cache.
    pub fn close(self) -> std::result::Result<(), StoreError> {
        self.flush()
    }

    fn save(&self) -> std::result::Result<(), StoreError> {
        let state = self.state.borrow();
        self.store.borrow_mut().save(&state.entries)?;
        drop(state);
        self.state.borrow_mut().dirty = false;
        Ok(())
    }

    /// Save without failing the load; a failed write stays dirty for `flush`.
    fn persist(&self) {
        if let Err(e) = self.save() {
            tracing::warn!("Failed to write symbol cache: {}", e);
            self.state.borrow_mut().dirty = true;
        }
    }
}

impl<S: CacheStore> Drop for CachedResolver<S> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if state.dirty {
            tracing::warn!(
                "Symbol cache dropped with unsaved entries ({} total); call flush() before exit",
                state.entries.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryRuntime;
    use crate::store::MemoryStore;
    use crate::LoadError;
    use std::cell::Cell;
    use std::io;
    use std::path::MAIN_SEPARATOR;
    use std::rc::Rc;

    fn native(path: &str) -> String {
        path.replace('/', &MAIN_SEPARATOR.to_string())
    }

    fn resolver() -> Resolver {
        let mut resolver = Resolver::new();
        resolver.add_base_path(native("/lib"));
        resolver
    }

    fn runtime() -> MemoryRuntime {
        let mut runtime = MemoryRuntime::new();
        runtime.add_file(native("/lib/Foo/Bar.php"), &["Foo\\Bar"]);
        runtime
    }

    #[test]
    fn test_miss_records_entry() {
        let mut runtime = runtime();
        let cached = CachedResolver::new(resolver(), MemoryStore::new());

        assert!(cached.load_class(&mut runtime, "Foo\\Bar").unwrap());
        assert_eq!(
            cached.cached_path("Foo\\Bar"),
            Some(PathBuf::from(native("/lib/Foo/Bar.php")))
        );
        assert_eq!(cached.store().saves(), 1);
        assert!(!cached.is_dirty());
    }

    #[test]
    fn test_hit_skips_search() {
        let mut runtime = MemoryRuntime::new();
        runtime.add_file(native("/elsewhere/Bar.php"), &["Foo\\Bar"]);
        let mut entries = CacheEntries::new();
        entries.insert("Foo\\Bar".to_string(), PathBuf::from(native("/elsewhere/Bar.php")));

        // The resolver has no paths at all: only the cache can find the file
        let cached = CachedResolver::new(Resolver::new(), MemoryStore::with_entries(entries));
        assert!(cached.load_class(&mut runtime, "\\Foo\\Bar").unwrap());
        assert_eq!(cached.store().saves(), 0);
    }

    #[test]
    fn test_stale_entry_is_evicted_and_resolved_again() {
        let mut runtime = runtime();
        let mut entries = CacheEntries::new();
        entries.insert("Foo\\Bar".to_string(), PathBuf::from(native("/moved/Bar.php")));
        let cached = CachedResolver::new(resolver(), MemoryStore::with_entries(entries));

        assert!(cached.load_class(&mut runtime, "Foo\\Bar").unwrap());
        assert_eq!(
            cached.store().entries().get("Foo\\Bar"),
            Some(&PathBuf::from(native("/lib/Foo/Bar.php")))
        );
        // One write for the eviction, one for the new entry
        assert_eq!(cached.store().saves(), 2);
    }

    #[test]
    fn test_stale_entry_without_replacement() {
        let mut runtime = MemoryRuntime::new();
        runtime.add_file(native("/old/Gone.php"), &[]);
        let mut entries = CacheEntries::new();
        entries.insert("Gone".to_string(), PathBuf::from(native("/old/Gone.php")));
        let cached = CachedResolver::new(Resolver::new(), MemoryStore::with_entries(entries));

        assert!(!cached.load_class(&mut runtime, "Gone").unwrap());
        assert!(cached.entries().is_empty());
        assert!(cached.store().entries().is_empty());
    }

    #[test]
    fn test_already_defined_is_checked_before_cache() {
        let mut runtime = runtime();
        runtime.define("Foo\\Bar");
        let cached = CachedResolver::new(resolver(), MemoryStore::new());

        let result = cached.load_class(&mut runtime, "Foo\\Bar");
        assert!(matches!(result, Err(LoadError::AlreadyDefined(_))));
        assert!(cached.entries().is_empty());
    }

    #[test]
    fn test_deferred_flush() {
        let mut runtime = runtime();
        let cached = CachedResolver::new(resolver(), MemoryStore::new())
            .with_flush_policy(FlushPolicy::Deferred);

        assert!(cached.load_class(&mut runtime, "Foo\\Bar").unwrap());
        assert!(cached.is_dirty());
        assert_eq!(cached.store().saves(), 0);

        cached.flush().unwrap();
        assert!(!cached.is_dirty());
        assert_eq!(cached.store().saves(), 1);

        // Nothing pending, nothing written
        cached.flush().unwrap();
        assert_eq!(cached.store().saves(), 1);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let mut runtime = MemoryRuntime::new();
        let cached = CachedResolver::new(resolver(), MemoryStore::new());
        assert!(!cached.load_class(&mut runtime, "Foo\\Bar").unwrap());
        assert!(cached.entries().is_empty());
        assert_eq!(cached.store().saves(), 0);
    }

    /// Store whose writes fail while the shared flag is set.
    #[derive(Debug, Default)]
    struct FlakyStore {
        failing: Rc<Cell<bool>>,
        saves: usize,
    }

    impl CacheStore for FlakyStore {
        fn load(&self) -> std::result::Result<CacheEntries, StoreError> {
            Ok(CacheEntries::new())
        }

        fn save(&mut self, _entries: &CacheEntries) -> std::result::Result<(), StoreError> {
            if self.failing.get() {
                return Err(io::Error::other("disk full").into());
            }
            self.saves += 1;
            Ok(())
        }
    }

    #[test]
    fn test_failed_write_stays_dirty_until_flush() {
        let mut runtime = runtime();
        let failing = Rc::new(Cell::new(true));
        let store = FlakyStore {
            failing: failing.clone(),
            saves: 0,
        };
        let cached = CachedResolver::new(resolver(), store);

        // The load itself succeeds even though the write did not
        assert!(cached.load_class(&mut runtime, "Foo\\Bar").unwrap());
        assert!(cached.is_dirty());
        assert_eq!(cached.store().saves, 0);

        failing.set(false);
        cached.flush().unwrap();
        assert_eq!(cached.store().saves, 1);
        assert!(!cached.is_dirty());

        cached.flush().unwrap();
        assert_eq!(cached.store().saves, 1);
    }

    #[test]
    fn test_relative_paths_are_recorded_absolute() {
        let mut runtime = MemoryRuntime::new();
        runtime.add_file(native("lib/Foo/Bar.php"), &["Foo\\Bar"]);
        let mut resolver = Resolver::new();
        resolver.add_base_path("lib");
        let cached = CachedResolver::new(resolver, MemoryStore::new());

        assert!(cached.load_class(&mut runtime, "Foo\\Bar").unwrap());
        let recorded = cached.cached_path("Foo\\Bar").unwrap();
        assert!(recorded.is_absolute());
        assert_eq!(
            recorded,
            std::env::current_dir().unwrap().join(native("lib/Foo/Bar.php"))
        );
        assert_eq!(cached.store().entries().get("Foo\\Bar"), Some(&recorded));
    }

    #[test]
    fn test_forget() {
        let mut runtime = runtime();
        let cached = CachedResolver::new(resolver(), MemoryStore::new());
        cached.load_class(&mut runtime, "Foo\\Bar").unwrap();

        assert!(cached.forget("Foo\\Bar").unwrap());
        assert!(!cached.forget("Foo\\Bar").unwrap());
        assert!(cached.store().entries().is_empty());
    }
}
