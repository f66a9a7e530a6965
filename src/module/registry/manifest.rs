//! Module descriptors and manifest catalogs
//!
//! A [`ModuleDescriptor`] is the static identity of a module: its unique name
//! and the modules it depends on. Descriptors are normally supplied inline when
//! a module is registered; a [`ManifestCatalog`] parsed from `modules.toml`
//! provides them for registrations that carry none.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::config::ConfigError;

/// A named dependency of a module
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencySpec {
    /// Name of the module depended upon
    pub name: String,
    /// Whether the dependent refuses to load without it
    #[serde(default = "default_true")]
    pub required: bool,
}

fn default_true() -> bool {
    true
}

impl DependencySpec {
    /// A required dependency
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
        }
    }

    /// An optional dependency
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
        }
    }
}

/// Static module metadata: unique name and ordered dependency list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    name: String,
    #[serde(default)]
    dependencies: Vec<DependencySpec>,
}

impl ModuleDescriptor {
    /// Descriptor with no dependencies
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
        }
    }

    /// Add a dependency
    pub fn with_dependency(mut self, dependency: DependencySpec) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Add a required dependency by name
    pub fn requires(self, name: impl Into<String>) -> Self {
        self.with_dependency(DependencySpec::required(name))
    }

    /// Add an optional dependency by name
    pub fn optionally(self, name: impl Into<String>) -> Self {
        self.with_dependency(DependencySpec::optional(name))
    }

    /// Module name (unique key)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared dependencies, in declaration order
    pub fn dependencies(&self) -> &[DependencySpec] {
        &self.dependencies
    }

    /// Dependencies the module refuses to load without
    pub fn required_dependencies(&self) -> impl Iterator<Item = &DependencySpec> {
        self.dependencies.iter().filter(|d| d.required)
    }
}

/// Anything that carries a module descriptor and can therefore be dependency-sorted
pub trait Describe {
    fn descriptor(&self) -> &ModuleDescriptor;
}

impl Describe for ModuleDescriptor {
    fn descriptor(&self) -> &ModuleDescriptor {
        self
    }
}

/// One `[[module]]` table of a manifest catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Registration key the descriptor belongs to (defaults to the module name)
    #[serde(default)]
    pub key: Option<String>,
    /// The descriptor itself
    #[serde(flatten)]
    pub descriptor: ModuleDescriptor,
}

impl CatalogEntry {
    /// Key this entry is looked up by
    pub fn lookup_key(&self) -> &str {
        self.key.as_deref().unwrap_or_else(|| self.descriptor.name())
    }
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "module")]
    modules: Vec<CatalogEntry>,
}

/// Descriptors keyed by registration key, parsed from TOML
///
/// ```toml
/// [[module]]
/// key = "ChatModule"
/// name = "chat"
/// dependencies = [{ name = "party" }, { name = "metrics", required = false }]
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManifestCatalog {
    entries: Vec<CatalogEntry>,
    by_key: HashMap<String, usize>,
}

impl ManifestCatalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Load catalog from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse catalog from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: CatalogFile = toml::from_str(contents)?;
        let mut catalog = Self::new();
        for entry in file.modules {
            catalog.insert(entry)?;
        }
        Ok(catalog)
    }

    /// Add an entry; keys must be unique
    pub fn insert(&mut self, entry: CatalogEntry) -> Result<(), ConfigError> {
        let key = entry.lookup_key().to_string();
        if self.by_key.contains_key(&key) {
            return Err(ConfigError::Invalid(format!(
                "Duplicate manifest key: {}",
                key
            )));
        }
        self.by_key.insert(key, self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    /// Descriptor registered under `key`
    pub fn get(&self, key: &str) -> Option<&ModuleDescriptor> {
        self.by_key.get(key).map(|&i| &self.entries[i].descriptor)
    }

    /// All descriptors in file order
    pub fn descriptors(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
