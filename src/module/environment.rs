//! Module environment
//!
//! The [`ModuleEnvironment`] is what a factory receives when its module is
//! constructed: the module's own descriptor, its configuration values, and a
//! read-only [`ModuleProvider`] over the modules loaded so far.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ModuleConfig;
use crate::module::registry::manifest::ModuleDescriptor;
use crate::module::registry::store::ModuleProvider;
use crate::module::traits::{Module, ModuleError};

/// Environment handed to a module factory
#[derive(Clone)]
pub struct ModuleEnvironment {
    descriptor: ModuleDescriptor,
    config: HashMap<String, String>,
    provider: ModuleProvider,
}

impl ModuleEnvironment {
    /// Create a new module environment
    pub fn new(descriptor: ModuleDescriptor, provider: ModuleProvider) -> Self {
        Self {
            descriptor,
            config: HashMap::new(),
            provider,
        }
    }

    /// Attach configuration values
    pub fn with_config(mut self, config: HashMap<String, String>) -> Self {
        self.config = config;
        self
    }

    pub fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    /// The module's descriptor name
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn config(&self) -> &HashMap<String, String> {
        &self.config
    }

    /// Get a configuration value
    pub fn get_config(&self, key: &str) -> Option<&String> {
        self.config.get(key)
    }

    /// Get a configuration value with default
    pub fn get_config_or(&self, key: &str, default: &str) -> String {
        self.config
            .get(key)
            .map(|s| s.as_str())
            .unwrap_or(default)
            .to_string()
    }

    /// Read-only access to loaded modules
    pub fn provider(&self) -> &ModuleProvider {
        &self.provider
    }

    /// Fetch a required dependency; see [`ModuleProvider::require`]
    pub fn require<T: Module>(&self) -> Result<Arc<T>, ModuleError> {
        self.provider.require::<T>()
    }

    /// Fetch an optional dependency; see [`ModuleProvider::optional`]
    pub fn optional<T: Module>(&self) -> Option<Arc<T>> {
        self.provider.optional::<T>()
    }
}

/// Strategy for building a module's environment
pub trait EnvironmentProvider: Send + Sync {
    fn create(
        &self,
        descriptor: &ModuleDescriptor,
        config: &ModuleConfig,
        provider: ModuleProvider,
    ) -> ModuleEnvironment;
}

impl<F> EnvironmentProvider for F
where
    F: Fn(&ModuleDescriptor, &ModuleConfig, ModuleProvider) -> ModuleEnvironment + Send + Sync,
{
    fn create(
        &self,
        descriptor: &ModuleDescriptor,
        config: &ModuleConfig,
        provider: ModuleProvider,
    ) -> ModuleEnvironment {
        self(descriptor, config, provider)
    }
}

/// Default strategy: descriptor, the module's `module_configs` entry, and the provider
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicEnvironmentProvider;

impl EnvironmentProvider for BasicEnvironmentProvider {
    fn create(
        &self,
        descriptor: &ModuleDescriptor,
        config: &ModuleConfig,
        provider: ModuleProvider,
    ) -> ModuleEnvironment {
        ModuleEnvironment::new(descriptor.clone(), provider)
            .with_config(config.config_for(descriptor.name()))
    }
}
