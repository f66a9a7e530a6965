//! Loaded-module registry
//!
//! Holds every module that completed its load phase, keyed by [`ModuleId`].
//! Written only by the manager during the sequential load pass; read from
//! anywhere through cloneable [`ModuleProvider`] handles. The lock is never
//! held across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::module::traits::{Module, ModuleError, ModuleId};
use crate::utils::lock::{with_read_lock, with_write_lock};

#[derive(Default)]
struct Inner {
    modules: HashMap<ModuleId, Arc<dyn Module>>,
    names: HashMap<String, ModuleId>,
    /// Insertion (= load) order
    order: Vec<(ModuleId, String)>,
    retired: bool,
}

/// Registry of loaded modules
#[derive(Default)]
pub struct ModuleRegistry {
    inner: RwLock<Inner>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a loaded module. Ignored once the registry is retired.
    pub(crate) fn insert(&self, id: ModuleId, name: &str, module: Arc<dyn Module>) {
        with_write_lock(&self.inner, |inner| {
            if inner.retired {
                return;
            }
            inner.modules.insert(id, module);
            inner.names.insert(name.to_string(), id);
            inner.order.push((id, name.to_string()));
        })
    }

    /// Typed lookup; `None` if `T` is not loaded (or the registry is retired)
    pub fn get<T: Module>(&self) -> Option<Arc<T>> {
        let module = self.get_by_id(&ModuleId::of::<T>())?;
        module.as_any_arc().downcast::<T>().ok()
    }

    /// Type-erased lookup by identity
    pub fn get_by_id(&self, id: &ModuleId) -> Option<Arc<dyn Module>> {
        with_read_lock(&self.inner, |inner| inner.modules.get(id).cloned())
    }

    /// Type-erased lookup by descriptor name
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn Module>> {
        with_read_lock(&self.inner, |inner| {
            inner
                .names
                .get(name)
                .and_then(|id| inner.modules.get(id))
                .cloned()
        })
    }

    /// Whether a module with this descriptor name is loaded
    pub fn contains_name(&self, name: &str) -> bool {
        with_read_lock(&self.inner, |inner| inner.names.contains_key(name))
    }

    /// Names of loaded modules in load order
    pub fn names(&self) -> Vec<String> {
        with_read_lock(&self.inner, |inner| {
            inner.order.iter().map(|(_, name)| name.clone()).collect()
        })
    }

    /// Snapshot of loaded modules in load order
    pub(crate) fn entries(&self) -> Vec<(String, Arc<dyn Module>)> {
        with_read_lock(&self.inner, |inner| {
            inner
                .order
                .iter()
                .filter_map(|(id, name)| inner.modules.get(id).map(|m| (name.clone(), Arc::clone(m))))
                .collect()
        })
    }

    /// Empty the registry and refuse further inserts; returns what was loaded, in load order
    pub(crate) fn retire(&self) -> Vec<(String, Arc<dyn Module>)> {
        with_write_lock(&self.inner, |inner| {
            inner.retired = true;
            inner.names.clear();
            let order = std::mem::take(&mut inner.order);
            let mut modules = std::mem::take(&mut inner.modules);
            order
                .into_iter()
                .filter_map(|(id, name)| modules.remove(&id).map(|m| (name, m)))
                .collect()
        })
    }

    pub fn is_retired(&self) -> bool {
        with_read_lock(&self.inner, |inner| inner.retired)
    }

    pub fn len(&self) -> usize {
        with_read_lock(&self.inner, |inner| inner.modules.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read-only handle over the registry, handed to modules through their environment
///
/// Cheap to clone and `Send + Sync`; modules may keep one for later lookups.
#[derive(Clone)]
pub struct ModuleProvider {
    registry: Arc<ModuleRegistry>,
}

impl ModuleProvider {
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self { registry }
    }

    /// Typed lookup; absent modules are `None`
    pub fn get<T: Module>(&self) -> Option<Arc<T>> {
        self.registry.get::<T>()
    }

    /// Fetch a module the caller declared as a required dependency
    ///
    /// An error here is a programming error: a module whose required dependency
    /// is missing never gets constructed, so either the dependency was not
    /// declared or it was declared optional.
    pub fn require<T: Module>(&self) -> Result<Arc<T>, ModuleError> {
        self.get::<T>().ok_or_else(|| ModuleError::NotAvailable {
            module: ModuleId::of::<T>().short_name().to_string(),
        })
    }

    /// Fetch a module that may legitimately be absent
    pub fn optional<T: Module>(&self) -> Option<Arc<T>> {
        self.get::<T>()
    }

    /// Whether a module with this descriptor name is loaded
    pub fn is_loaded(&self, name: &str) -> bool {
        self.registry.contains_name(name)
    }

    /// Names of loaded modules in load order
    pub fn loaded_modules(&self) -> Vec<String> {
        self.registry.names()
    }
}
