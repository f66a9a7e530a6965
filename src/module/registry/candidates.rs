//! Loadable modules and candidate resolution
//!
//! A [`LoadableModule`] is what the host registers: an identity, a factory,
//! and (usually) a descriptor. The [`CandidateResolver`] turns registrations
//! into [`ModuleCandidate`]s, each guaranteed to carry a valid descriptor.
//! Registrations that cannot be described are dropped with a diagnostic; the
//! rest keep their registration order (sorting happens later).

use std::fmt;

use crate::module::diagnostics::{Diagnostic, DiagnosticSink};
use crate::module::environment::ModuleEnvironment;
use crate::module::registry::manifest::{Describe, ManifestCatalog, ModuleDescriptor};
use crate::module::report::LoadFailure;
use crate::module::traits::{Module, ModuleError, ModuleId};
use crate::module::validation::{DescriptorValidator, ValidationResult};

/// Type-erased module constructor
pub type ModuleFactory =
    Box<dyn FnOnce(&ModuleEnvironment) -> Result<Box<dyn Module>, ModuleError> + Send>;

fn erase<T, F>(factory: F) -> ModuleFactory
where
    T: Module,
    F: FnOnce(&ModuleEnvironment) -> Result<T, ModuleError> + Send + 'static,
{
    Box::new(move |env: &ModuleEnvironment| {
        factory(env).map(|module| Box::new(module) as Box<dyn Module>)
    })
}

/// A module registration: identity, optional descriptor, factory
pub struct LoadableModule {
    id: ModuleId,
    key: String,
    descriptor: Option<ModuleDescriptor>,
    factory: ModuleFactory,
}

impl LoadableModule {
    /// Register module `T` with an inline descriptor
    pub fn new<T, F>(descriptor: ModuleDescriptor, factory: F) -> Self
    where
        T: Module,
        F: FnOnce(&ModuleEnvironment) -> Result<T, ModuleError> + Send + 'static,
    {
        let id = ModuleId::of::<T>();
        Self {
            id,
            key: id.short_name().to_string(),
            descriptor: Some(descriptor),
            factory: erase(factory),
        }
    }

    /// Register module `T` without a descriptor; one must come from a catalog
    pub fn undescribed<T, F>(factory: F) -> Self
    where
        T: Module,
        F: FnOnce(&ModuleEnvironment) -> Result<T, ModuleError> + Send + 'static,
    {
        let id = ModuleId::of::<T>();
        Self {
            id,
            key: id.short_name().to_string(),
            descriptor: None,
            factory: erase(factory),
        }
    }

    /// Override the catalog lookup key (defaults to the short type name)
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn descriptor(&self) -> Option<&ModuleDescriptor> {
        self.descriptor.as_ref()
    }
}

impl fmt::Debug for LoadableModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadableModule")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// A registration validated as having a descriptor; the unit of sorting and loading
pub struct ModuleCandidate {
    id: ModuleId,
    descriptor: ModuleDescriptor,
    factory: ModuleFactory,
}

impl ModuleCandidate {
    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub(crate) fn into_parts(self) -> (ModuleId, ModuleDescriptor, ModuleFactory) {
        (self.id, self.descriptor, self.factory)
    }
}

impl Describe for ModuleCandidate {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }
}

impl fmt::Debug for ModuleCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleCandidate")
            .field("id", &self.id)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// A registration the resolver dropped
#[derive(Debug)]
pub struct RejectedModule {
    /// Registration key (no trustworthy descriptor name exists)
    pub key: String,
    pub id: ModuleId,
    pub failure: LoadFailure,
}

/// Result of candidate resolution
#[derive(Debug, Default)]
pub struct CandidateResolution {
    /// Valid candidates in registration order
    pub candidates: Vec<ModuleCandidate>,
    pub rejected: Vec<RejectedModule>,
}

/// Converts registrations into validated candidates
pub trait CandidateResolver: Send + Sync {
    fn resolve(
        &self,
        loadables: Vec<LoadableModule>,
        sink: &dyn DiagnosticSink,
    ) -> CandidateResolution;
}

/// Inline descriptor first, then the catalog entry under the registration key
#[derive(Default)]
pub struct DefaultCandidateResolver {
    catalog: ManifestCatalog,
    validator: DescriptorValidator,
}

impl DefaultCandidateResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver falling back to `catalog` for undescribed registrations
    pub fn with_catalog(catalog: ManifestCatalog) -> Self {
        Self {
            catalog,
            validator: DescriptorValidator::new(),
        }
    }
}

impl CandidateResolver for DefaultCandidateResolver {
    fn resolve(
        &self,
        loadables: Vec<LoadableModule>,
        sink: &dyn DiagnosticSink,
    ) -> CandidateResolution {
        let mut resolution = CandidateResolution::default();

        for loadable in loadables {
            let LoadableModule {
                id,
                key,
                descriptor,
                factory,
            } = loadable;

            let descriptor = match descriptor.or_else(|| self.catalog.get(&key).cloned()) {
                Some(descriptor) => descriptor,
                None => {
                    sink.emit(&Diagnostic::DescriptorMissing { module: key.clone() });
                    resolution.rejected.push(RejectedModule {
                        key,
                        id,
                        failure: LoadFailure::DescriptorMissing,
                    });
                    continue;
                }
            };

            if let ValidationResult::Invalid(errors) = self.validator.validate(&descriptor) {
                sink.emit(&Diagnostic::DescriptorInvalid {
                    module: key.clone(),
                    errors: errors.clone(),
                });
                resolution.rejected.push(RejectedModule {
                    key,
                    id,
                    failure: LoadFailure::DescriptorInvalid(errors),
                });
                continue;
            }

            resolution.candidates.push(ModuleCandidate {
                id,
                descriptor,
                factory,
            });
        }

        resolution
    }
}
