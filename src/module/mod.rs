//! Module system
//!
//! In-process module lifecycle orchestration: hosts register modules with a
//! descriptor and a factory, and the [`ModuleManager`] loads them in
//! dependency order, then dispatches `ready` and `unload`.
//!
//! ## Architecture
//!
//! - **Resolution**: registrations without a valid descriptor are dropped, not fatal
//! - **Ordering**: deterministic topological order, ties broken by module name
//! - **Failure Containment**: a failing or panicking module only takes out itself
//!   and the modules that require it
//! - **Typed Lookup**: loaded modules are fetched by type, absent ones are `None`
//! - **Injected Diagnostics**: every event goes to a [`DiagnosticSink`]

pub mod diagnostics;
pub mod environment;
pub mod manager;
pub mod registry;
pub mod report;
pub mod traits;
pub mod validation;

pub use diagnostics::{Diagnostic, DiagnosticSink, MemorySink, SinkSet, TracingSink};
pub use environment::{BasicEnvironmentProvider, EnvironmentProvider, ModuleEnvironment};
pub use manager::{ModuleManager, ModuleManagerBuilder};
pub use registry::{
    CandidateResolver, DefaultCandidateResolver, DependencySorter, DependencySpec, Describe,
    LoadableModule, ManifestCatalog, ModuleCandidate, ModuleDependencies, ModuleDescriptor,
    ModuleProvider, ModuleRegistry,
};
pub use report::{LoadFailure, LoadReport, ModuleOutcome, ModuleRecord};
pub use traits::{AsAny, ConfigurationError, Module, ModuleError, ModuleId, ModuleState};
pub use validation::{DescriptorValidator, ValidationResult};
