//! Module manager for orchestrating all modules
//!
//! Runs the load pass (resolve, filter, sort, then construct and initialize
//! each candidate in order) and dispatches the `ready` and `unload` broadcasts
//! over whatever loaded.
//!
//! Only configuration errors abort the pass. Every per-module failure is
//! isolated: it is recorded in the [`LoadReport`], reported to the diagnostics
//! sink, and the pass moves on to the next candidate.

use futures::FutureExt;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::ManagerConfig;
use crate::module::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::module::environment::{BasicEnvironmentProvider, EnvironmentProvider, ModuleEnvironment};
use crate::module::registry::candidates::{
    CandidateResolver, DefaultCandidateResolver, LoadableModule, ModuleCandidate,
};
use crate::module::registry::dependencies::{DependencySorter, ModuleDependencies};
use crate::module::registry::manifest::{ManifestCatalog, ModuleDescriptor};
use crate::module::registry::store::{ModuleProvider, ModuleRegistry};
use crate::module::report::{LoadFailure, LoadReport, ModuleOutcome};
use crate::module::traits::{ConfigurationError, Module, ModuleError, ModuleId};

fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Builder for [`ModuleManager`]
pub struct ModuleManagerBuilder {
    loadables: Vec<LoadableModule>,
    config: ManagerConfig,
    catalog: Option<ManifestCatalog>,
    resolver: Option<Box<dyn CandidateResolver>>,
    environment: Arc<dyn EnvironmentProvider>,
    sink: Arc<dyn DiagnosticSink>,
}

impl Default for ModuleManagerBuilder {
    fn default() -> Self {
        Self {
            loadables: Vec::new(),
            config: ManagerConfig::default(),
            catalog: None,
            resolver: None,
            environment: Arc::new(BasicEnvironmentProvider),
            sink: Arc::new(TracingSink),
        }
    }
}

impl ModuleManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register module `T` with an inline descriptor
    pub fn module<T, F>(self, descriptor: ModuleDescriptor, factory: F) -> Self
    where
        T: Module,
        F: FnOnce(&ModuleEnvironment) -> Result<T, ModuleError> + Send + 'static,
    {
        self.loadable(LoadableModule::new(descriptor, factory))
    }

    /// Register module `T` whose descriptor comes from the catalog
    pub fn undescribed_module<T, F>(self, factory: F) -> Self
    where
        T: Module,
        F: FnOnce(&ModuleEnvironment) -> Result<T, ModuleError> + Send + 'static,
    {
        self.loadable(LoadableModule::undescribed(factory))
    }

    pub fn loadable(mut self, loadable: LoadableModule) -> Self {
        self.loadables.push(loadable);
        self
    }

    pub fn loadables(mut self, loadables: impl IntoIterator<Item = LoadableModule>) -> Self {
        self.loadables.extend(loadables);
        self
    }

    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Descriptor fallback for undescribed registrations (ignored with a custom resolver)
    pub fn catalog(mut self, catalog: ManifestCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn resolver(mut self, resolver: impl CandidateResolver + 'static) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    pub fn environment_provider(mut self, provider: impl EnvironmentProvider + 'static) -> Self {
        self.environment = Arc::new(provider);
        self
    }

    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Run the load pass
    ///
    /// Fails only on configuration errors (duplicate identity or name, dependency
    /// cycle), in which case no module is constructed.
    pub async fn build(self) -> Result<ModuleManager, ConfigurationError> {
        let ModuleManagerBuilder {
            loadables,
            config,
            catalog,
            resolver,
            environment,
            sink,
        } = self;

        let resolver = resolver.unwrap_or_else(|| {
            Box::new(DefaultCandidateResolver::with_catalog(catalog.unwrap_or_default()))
        });

        let mut pass = LoadPass {
            registry: Arc::new(ModuleRegistry::new()),
            report: LoadReport::new(),
            config,
            environment,
            sink,
        };
        pass.run(loadables, resolver.as_ref()).await?;

        Ok(ModuleManager {
            registry: pass.registry,
            report: pass.report,
            sink: pass.sink,
            ready_fired: AtomicBool::new(false),
            unloaded: false,
        })
    }
}

/// State of one load pass
struct LoadPass {
    registry: Arc<ModuleRegistry>,
    report: LoadReport,
    config: ManagerConfig,
    environment: Arc<dyn EnvironmentProvider>,
    sink: Arc<dyn DiagnosticSink>,
}

impl LoadPass {
    async fn run(
        &mut self,
        loadables: Vec<LoadableModule>,
        resolver: &dyn CandidateResolver,
    ) -> Result<(), ConfigurationError> {
        if loadables.is_empty() {
            self.sink.emit(&Diagnostic::NoModules);
            return Ok(());
        }

        self.check_unique_identities(&loadables)?;

        let resolution = resolver.resolve(loadables, self.sink.as_ref());
        for rejected in resolution.rejected {
            self.report
                .record_rejected(&rejected.key, rejected.id, rejected.failure);
        }

        self.check_unique_names(&resolution.candidates)?;

        let mut enabled = Vec::with_capacity(resolution.candidates.len());
        for candidate in resolution.candidates {
            if self.config.modules.is_enabled(candidate.name()) {
                enabled.push(candidate);
            } else {
                self.sink.emit(&Diagnostic::ModuleDisabled {
                    module: candidate.name().to_string(),
                });
                self.report
                    .record(candidate.name(), candidate.id(), ModuleOutcome::Disabled);
            }
        }

        let sorted = ModuleDependencies.sort(enabled).map_err(|e| {
            match &e {
                ConfigurationError::Cycle { modules } => {
                    self.sink.emit(&Diagnostic::CycleDetected {
                        modules: modules.clone(),
                    })
                }
                ConfigurationError::DuplicateName { name } => {
                    self.sink.emit(&Diagnostic::DuplicateModule { module: name.clone() })
                }
                ConfigurationError::DuplicateIdentity { .. } => {}
            }
            e
        })?;

        let order: Vec<String> = sorted.iter().map(|c| c.name().to_string()).collect();
        self.sink.emit(&Diagnostic::LoadOrder {
            modules: order.clone(),
        });
        self.report.set_load_order(order);

        for candidate in sorted {
            self.load_candidate(candidate).await;
        }

        self.sink.emit(&Diagnostic::LoadPassComplete {
            loaded: self.report.loaded().len(),
            failed: self.report.failed().len(),
        });
        Ok(())
    }

    fn check_unique_identities(&self, loadables: &[LoadableModule]) -> Result<(), ConfigurationError> {
        let mut seen: HashSet<ModuleId> = HashSet::with_capacity(loadables.len());
        for loadable in loadables {
            if !seen.insert(loadable.id()) {
                let module = loadable.id().short_name().to_string();
                self.sink.emit(&Diagnostic::DuplicateModule {
                    module: module.clone(),
                });
                return Err(ConfigurationError::DuplicateIdentity { module });
            }
        }
        Ok(())
    }

    /// Names must be unique across every resolved candidate, disabled ones included
    fn check_unique_names(&self, candidates: &[ModuleCandidate]) -> Result<(), ConfigurationError> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(candidates.len());
        for candidate in candidates {
            if !seen.insert(candidate.name()) {
                let name = candidate.name().to_string();
                self.sink.emit(&Diagnostic::DuplicateModule {
                    module: name.clone(),
                });
                return Err(ConfigurationError::DuplicateName { name });
            }
        }
        Ok(())
    }

    async fn load_candidate(&mut self, candidate: ModuleCandidate) {
        let (id, descriptor, factory) = candidate.into_parts();
        let name = descriptor.name().to_string();

        if let Some(missing) = descriptor
            .required_dependencies()
            .find(|dep| !self.registry.contains_name(&dep.name))
        {
            self.sink.emit(&Diagnostic::MissingDependency {
                module: name.clone(),
                dependency: missing.name.clone(),
            });
            self.fail(
                &name,
                id,
                LoadFailure::MissingDependency {
                    dependency: missing.name.clone(),
                },
            );
            return;
        }

        let env = self.environment.create(
            &descriptor,
            &self.config.modules,
            ModuleProvider::new(Arc::clone(&self.registry)),
        );

        let created = panic::catch_unwind(AssertUnwindSafe(|| factory(&env)))
            .unwrap_or_else(|payload| Err(ModuleError::from_panic(payload)));
        let mut module = match created {
            Ok(module) => module,
            Err(e) => {
                self.sink.emit(&Diagnostic::CreationFailed {
                    module: name.clone(),
                    error: e.to_string(),
                });
                self.fail(&name, id, LoadFailure::Creation(e));
                return;
            }
        };

        let start = Instant::now();
        let loaded = AssertUnwindSafe(module.on_load())
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(ModuleError::from_panic(payload)));
        let elapsed = start.elapsed();

        match loaded {
            Ok(true) => {
                self.registry.insert(id, &name, Arc::from(module));
                self.sink.emit(&Diagnostic::ModuleLoaded {
                    module: name.clone(),
                    elapsed_ms: elapsed_ms(elapsed),
                });
                self.report.record(&name, id, ModuleOutcome::Loaded { elapsed });
            }
            Ok(false) => {
                self.sink
                    .emit(&Diagnostic::InitializationDeclined { module: name.clone() });
                self.fail(&name, id, LoadFailure::Declined);
            }
            Err(e) => {
                self.sink.emit(&Diagnostic::InitializationFailed {
                    module: name.clone(),
                    error: e.to_string(),
                });
                self.fail(&name, id, LoadFailure::Initialization(e));
            }
        }
    }

    fn fail(&mut self, name: &str, id: ModuleId, failure: LoadFailure) {
        self.report.record(name, id, ModuleOutcome::Failed(failure));
    }
}

/// Module manager coordinates all loaded modules
///
/// Built by [`ModuleManagerBuilder::build`], which runs the load pass. Lookups
/// never fail: a module that did not load is simply absent, and
/// [`report`](ModuleManager::report) says why.
pub struct ModuleManager {
    registry: Arc<ModuleRegistry>,
    report: LoadReport,
    sink: Arc<dyn DiagnosticSink>,
    ready_fired: AtomicBool,
    unloaded: bool,
}

impl ModuleManager {
    pub fn builder() -> ModuleManagerBuilder {
        ModuleManagerBuilder::new()
    }

    /// Load `loadables` with default configuration, resolver and diagnostics
    pub async fn load(loadables: Vec<LoadableModule>) -> Result<Self, ConfigurationError> {
        Self::builder().loadables(loadables).build().await
    }

    /// Typed lookup of a loaded module
    pub fn get_module<T: Module>(&self) -> Option<Arc<T>> {
        self.registry.get::<T>()
    }

    /// Whether a module with this descriptor name is loaded
    pub fn is_loaded(&self, name: &str) -> bool {
        self.registry.contains_name(name)
    }

    /// Names of loaded modules, in load order
    pub fn loaded_modules(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Outcome of every registration in the load pass
    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    /// Cloneable read handle over the registry
    pub fn provider(&self) -> ModuleProvider {
        ModuleProvider::new(Arc::clone(&self.registry))
    }

    /// Fire `on_ready` on every loaded module, in load order
    ///
    /// Runs once; later calls are ignored.
    pub async fn on_ready(&self) {
        if self.ready_fired.swap(true, Ordering::SeqCst) {
            self.sink
                .emit(&Diagnostic::BroadcastRepeated { phase: "on_ready" });
            return;
        }

        for (name, module) in self.registry.entries() {
            let start = Instant::now();
            if let Err(payload) = AssertUnwindSafe(module.on_ready()).catch_unwind().await {
                self.sink.emit(&Diagnostic::HookPanicked {
                    module: name,
                    phase: "on_ready",
                    error: ModuleError::from_panic(payload).to_string(),
                });
                continue;
            }
            self.sink.emit(&Diagnostic::ModuleReady {
                module: name,
                elapsed_ms: elapsed_ms(start.elapsed()),
            });
        }
    }

    /// Fire `on_unload` on every loaded module in reverse load order, then retire the registry
    ///
    /// Dependents are torn down before their dependencies, and can still look
    /// them up while doing so. Lookups return `None` once every hook has run.
    /// Runs once; later calls are ignored.
    pub async fn on_unload(&mut self) {
        if self.unloaded {
            self.sink
                .emit(&Diagnostic::BroadcastRepeated { phase: "on_unload" });
            return;
        }
        self.unloaded = true;

        for (name, module) in self.registry.entries().into_iter().rev() {
            let start = Instant::now();
            if let Err(payload) = AssertUnwindSafe(module.on_unload()).catch_unwind().await {
                self.sink.emit(&Diagnostic::HookPanicked {
                    module: name.clone(),
                    phase: "on_unload",
                    error: ModuleError::from_panic(payload).to_string(),
                });
            } else {
                self.sink.emit(&Diagnostic::ModuleUnloaded {
                    module: name.clone(),
                    elapsed_ms: elapsed_ms(start.elapsed()),
                });
            }
            self.report.mark_unloaded(&name);
        }

        self.registry.retire();
    }
}
