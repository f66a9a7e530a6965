//! Structured diagnostics for the load pass
//!
//! The manager never logs through global state directly. Every notable event
//! becomes a [`Diagnostic`] handed to an injected [`DiagnosticSink`]:
//!
//! - [`TracingSink`] (default) forwards to `tracing` at a level matching the event
//! - [`MemorySink`] records events for inspection (tests, startup summaries)
//! - any `Fn(&Diagnostic) + Send + Sync` closure works as a sink too
//!
//! ```text
//! ModuleManager ──► Diagnostic ──► sink.emit()
//!                                    ├─► TracingSink → error!/warn!/info!/debug!
//!                                    └─► MemorySink  → Vec<Diagnostic>
//! ```

use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn, Level};

use crate::utils::lock::lock_recovering;

/// A structured event produced while resolving, loading or dispatching modules
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The manager was given nothing to load
    NoModules,
    /// Registration filtered out by configuration
    ModuleDisabled { module: String },
    /// Registration has neither an inline nor a catalog descriptor
    DescriptorMissing { module: String },
    /// Registration's descriptor failed validation
    DescriptorInvalid { module: String, errors: Vec<String> },
    /// The same module type or name was registered twice
    DuplicateModule { module: String },
    /// Dependency graph contains a cycle; nothing loads
    CycleDetected { modules: Vec<String> },
    /// Final load order
    LoadOrder { modules: Vec<String> },
    /// A required dependency had not loaded when the module's turn came
    MissingDependency { module: String, dependency: String },
    /// Factory returned an error or panicked
    CreationFailed { module: String, error: String },
    /// `on_load` returned an error or panicked
    InitializationFailed { module: String, error: String },
    /// `on_load` returned `false`
    InitializationDeclined { module: String },
    /// Module committed to the registry
    ModuleLoaded { module: String, elapsed_ms: u64 },
    /// End of the load pass
    LoadPassComplete { loaded: usize, failed: usize },
    /// `on_ready` dispatched
    ModuleReady { module: String, elapsed_ms: u64 },
    /// `on_unload` dispatched
    ModuleUnloaded { module: String, elapsed_ms: u64 },
    /// `on_ready` or `on_unload` panicked; the broadcast carried on
    HookPanicked { module: String, phase: &'static str, error: String },
    /// A broadcast was requested again after it already ran
    BroadcastRepeated { phase: &'static str },
}

impl Diagnostic {
    /// Severity this event is logged at
    pub fn level(&self) -> Level {
        match self {
            Diagnostic::DescriptorMissing { .. }
            | Diagnostic::DescriptorInvalid { .. }
            | Diagnostic::DuplicateModule { .. }
            | Diagnostic::CycleDetected { .. }
            | Diagnostic::MissingDependency { .. }
            | Diagnostic::CreationFailed { .. }
            | Diagnostic::InitializationFailed { .. }
            | Diagnostic::HookPanicked { .. } => Level::ERROR,
            Diagnostic::NoModules
            | Diagnostic::ModuleDisabled { .. }
            | Diagnostic::InitializationDeclined { .. }
            | Diagnostic::BroadcastRepeated { .. } => Level::WARN,
            Diagnostic::ModuleLoaded { .. }
            | Diagnostic::LoadPassComplete { .. }
            | Diagnostic::ModuleReady { .. }
            | Diagnostic::ModuleUnloaded { .. } => Level::INFO,
            Diagnostic::LoadOrder { .. } => Level::DEBUG,
        }
    }

    /// Module the event is about, if it concerns a single module
    pub fn module(&self) -> Option<&str> {
        match self {
            Diagnostic::ModuleDisabled { module }
            | Diagnostic::DescriptorMissing { module }
            | Diagnostic::DescriptorInvalid { module, .. }
            | Diagnostic::DuplicateModule { module }
            | Diagnostic::MissingDependency { module, .. }
            | Diagnostic::CreationFailed { module, .. }
            | Diagnostic::InitializationFailed { module, .. }
            | Diagnostic::HookPanicked { module, .. }
            | Diagnostic::InitializationDeclined { module }
            | Diagnostic::ModuleLoaded { module, .. }
            | Diagnostic::ModuleReady { module, .. }
            | Diagnostic::ModuleUnloaded { module, .. } => Some(module.as_str()),
            _ => None,
        }
    }
}

/// Receiver of load-pass diagnostics
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: &Diagnostic);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&Diagnostic) + Send + Sync,
{
    fn emit(&self, diagnostic: &Diagnostic) {
        self(diagnostic)
    }
}

/// Sink that forwards every diagnostic to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::NoModules => warn!("No modules provided to module manager"),
            Diagnostic::ModuleDisabled { module } => {
                warn!("Module {} is disabled by configuration, skipping", module)
            }
            Diagnostic::DescriptorMissing { module } => {
                error!("Module {} has no descriptor, skipping", module)
            }
            Diagnostic::DescriptorInvalid { module, errors } => {
                error!("Module {} has an invalid descriptor, skipping: {:?}", module, errors)
            }
            Diagnostic::DuplicateModule { module } => {
                error!("Module {} registered more than once", module)
            }
            Diagnostic::CycleDetected { modules } => {
                error!("Circular dependency detected among modules: {:?}", modules)
            }
            Diagnostic::LoadOrder { modules } => {
                debug!("Loading modules: [{}]", modules.join(", "))
            }
            Diagnostic::MissingDependency { module, dependency } => error!(
                "Module {} requires module {} which is not loaded, skipping",
                module, dependency
            ),
            Diagnostic::CreationFailed { module, error } => {
                error!("Failed to create module {}: {}", module, error)
            }
            Diagnostic::InitializationFailed { module, error } => {
                error!("Failed to load module {}: {}", module, error)
            }
            Diagnostic::InitializationDeclined { module } => {
                warn!("Module {} declined to load", module)
            }
            Diagnostic::ModuleLoaded { module, elapsed_ms } => {
                info!("Loaded module {} in {}ms", module, elapsed_ms)
            }
            Diagnostic::LoadPassComplete { loaded, failed } => {
                info!("Module load pass complete: {} loaded, {} failed", loaded, failed)
            }
            Diagnostic::ModuleReady { module, elapsed_ms } => {
                info!("Fired on_ready for module {} in {}ms", module, elapsed_ms)
            }
            Diagnostic::ModuleUnloaded { module, elapsed_ms } => {
                info!("Unloaded module {} in {}ms", module, elapsed_ms)
            }
            Diagnostic::HookPanicked {
                module,
                phase,
                error,
            } => error!("Module {} panicked in {}: {}", module, phase, error),
            Diagnostic::BroadcastRepeated { phase } => {
                warn!("{} already dispatched, ignoring", phase)
            }
        }
    }
}

/// Sink that keeps every diagnostic in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<Diagnostic>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        lock_recovering(&self.events).clone()
    }

    /// Drain everything recorded so far
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *lock_recovering(&self.events))
    }

    /// Recorded diagnostics about one module
    pub fn for_module(&self, module: &str) -> Vec<Diagnostic> {
        self.snapshot()
            .into_iter()
            .filter(|d| d.module() == Some(module))
            .collect()
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, diagnostic: &Diagnostic) {
        lock_recovering(&self.events).push(diagnostic.clone());
    }
}

/// Fan a diagnostic out to several sinks
#[derive(Default, Clone)]
pub struct SinkSet {
    sinks: Vec<Arc<dyn DiagnosticSink>>,
}

impl SinkSet {
    pub fn new(sinks: Vec<Arc<dyn DiagnosticSink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn DiagnosticSink>) {
        self.sinks.push(sink);
    }
}

impl DiagnosticSink for SinkSet {
    fn emit(&self, diagnostic: &Diagnostic) {
        for sink in &self.sinks {
            sink.emit(diagnostic);
        }
    }
}
