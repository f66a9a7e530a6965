//! Module registry and dependency resolution
//!
//! Handles descriptors and manifest catalogs, candidate resolution, dependency
//! ordering, and the store of loaded modules.

pub mod candidates;
pub mod dependencies;
pub mod manifest;
pub mod store;

pub use candidates::{
    CandidateResolution, CandidateResolver, DefaultCandidateResolver, LoadableModule,
    ModuleCandidate, ModuleFactory, RejectedModule,
};
pub use dependencies::{DependencyGraph, DependencySorter, ModuleDependencies};
pub use manifest::{CatalogEntry, DependencySpec, Describe, ManifestCatalog, ModuleDescriptor};
pub use store::{ModuleProvider, ModuleRegistry};
