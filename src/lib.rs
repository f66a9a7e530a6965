//! bllvm-modules - In-process module lifecycle orchestration
//!
//! This crate loads a set of application modules in dependency order, isolates
//! their failures, and dispatches lifecycle signals to whatever loaded.
//!
//! ## Lifecycle
//!
//! 1. Resolve: every registration gets a descriptor (inline or from a catalog)
//! 2. Sort: dependencies before dependents, ties broken by name
//! 3. Load: construct and initialize each module in turn
//! 4. `on_ready()` once the host has finished starting
//! 5. `on_unload()` at shutdown, in reverse load order
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: the same registrations always load in the same order
//! 2. **Contained Failures**: only configuration errors abort the load pass
//! 3. **Absence Is Normal**: lookups return `None`, the [`LoadReport`] says why
//!
//! ## Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use bllvm_modules::{Module, ModuleDescriptor, ModuleError, ModuleManager};
//!
//! struct Greeter;
//!
//! #[async_trait]
//! impl Module for Greeter {
//!     async fn on_load(&mut self) -> Result<bool, ModuleError> {
//!         Ok(true)
//!     }
//!
//!     async fn on_unload(&self) {}
//! }
//!
//! # futures::executor::block_on(async {
//! let manager = ModuleManager::builder()
//!     .module(ModuleDescriptor::new("greeter"), |_| Ok(Greeter))
//!     .build()
//!     .await?;
//!
//! assert!(manager.get_module::<Greeter>().is_some());
//! # Ok::<(), bllvm_modules::ConfigurationError>(())
//! # }).unwrap();
//! ```

pub mod config;
pub mod module;
pub mod utils;

// Re-export config module
pub use config::*;

pub use module::{
    ConfigurationError, Diagnostic, DiagnosticSink, LoadFailure, LoadReport, LoadableModule,
    ManifestCatalog, Module, ModuleDescriptor, ModuleEnvironment, ModuleError, ModuleId,
    ModuleManager, ModuleManagerBuilder, ModuleOutcome, ModuleProvider, ModuleState,
};
