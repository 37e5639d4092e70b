//! Registration of loaders with the host's on-demand loading hook.
//!
//! The host keeps an ordered list of loader callbacks and calls them in turn
//! whenever an unknown symbol is used, stopping as soon as one of them
//! defines it. [`LoaderRegistry`] is that list. Loaders are compared by
//! identity, so registering the same instance twice is a no-op.

use std::rc::Rc;

use crate::cache::CachedResolver;
use crate::host::Runtime;
use crate::resolver::Resolver;
use crate::store::CacheStore;
use crate::Result;

/// A loader callback.
pub trait Autoload {
    /// Try to load `name`.
    ///
    /// Verbose loaders return whether the symbol was loaded and raise on
    /// errors. Silent loaders log errors and never return `Err`; their value
    /// is still reported, but [`LoaderRegistry::load`] only trusts
    /// [`Runtime::is_defined`] to decide whether to stop.
    fn autoload(&self, runtime: &mut dyn Runtime, name: &str) -> Result<bool>;
}

impl Autoload for Resolver {
    fn autoload(&self, runtime: &mut dyn Runtime, name: &str) -> Result<bool> {
        self.load_class(runtime, name)
    }
}

impl<S: CacheStore> Autoload for CachedResolver<S> {
    fn autoload(&self, runtime: &mut dyn Runtime, name: &str) -> Result<bool> {
        self.load_class(runtime, name)
    }
}

/// Ordered list of registered loaders.
#[derive(Default)]
pub struct LoaderRegistry {
    loaders: Vec<Rc<dyn Autoload>>,
}

fn same_loader(a: &Rc<dyn Autoload>, b: &Rc<dyn Autoload>) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a loader. Registering an already registered loader succeeds
    /// without adding it again.
    pub fn register(&mut self, loader: Rc<dyn Autoload>) -> bool {
        if !self.is_registered(&loader) {
            self.loaders.push(loader);
        }
        true
    }

    /// Remove a loader. Returns false if it was not registered.
    pub fn unregister(&mut self, loader: &Rc<dyn Autoload>) -> bool {
        let before = self.loaders.len();
        self.loaders.retain(|l| !same_loader(l, loader));
        self.loaders.len() != before
    }

    pub fn is_registered(&self, loader: &Rc<dyn Autoload>) -> bool {
        self.loaders.iter().any(|l| same_loader(l, loader))
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    /// Make `name` available, calling loaders in registration order until
    /// the runtime reports it defined.
    ///
    /// Errors from verbose loaders propagate to the caller.
    pub fn load(&self, runtime: &mut dyn Runtime, name: &str) -> Result<bool> {
        if runtime.is_defined(name) {
            return Ok(true);
        }
        for loader in &self.loaders {
            loader.autoload(runtime, name)?;
            if runtime.is_defined(name) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl std::fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderRegistry")
            .field("loaders", &self.loaders.len())
            .finish()
    }
}
