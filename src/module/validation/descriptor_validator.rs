//! Descriptor validation
//!
//! Validates module descriptors for structure before they become load candidates.

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::module::registry::manifest::ModuleDescriptor;

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Descriptor is valid
    Valid,
    /// Descriptor is invalid with specific errors
    Invalid(Vec<String>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

/// Descriptor validator
///
/// Only structurally unusable descriptors are invalid: an empty module name or
/// an empty dependency name. Names are otherwise free-form.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorValidator;

impl DescriptorValidator {
    /// Create a new descriptor validator
    pub fn new() -> Self {
        Self
    }

    /// Validate a module descriptor
    pub fn validate(&self, descriptor: &ModuleDescriptor) -> ValidationResult {
        let mut errors = Vec::new();

        if descriptor.name().is_empty() {
            errors.push("Module name cannot be empty".to_string());
        }

        if let Err(dep_errors) = self.validate_dependencies(descriptor) {
            errors.extend(dep_errors);
        }

        if errors.is_empty() {
            debug!("Descriptor validation passed for module: {}", descriptor.name());
            ValidationResult::Valid
        } else {
            ValidationResult::Invalid(errors)
        }
    }

    /// Validate dependency declarations
    ///
    /// A dependency named twice is harmless (the graph keeps one edge) and is
    /// only logged.
    fn validate_dependencies(&self, descriptor: &ModuleDescriptor) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for dep in descriptor.dependencies() {
            if dep.name.is_empty() {
                errors.push(format!(
                    "Dependency name cannot be empty (module {})",
                    descriptor.name()
                ));
            } else if !seen.insert(dep.name.as_str()) {
                warn!(
                    "Module {} declares dependency {} more than once",
                    descriptor.name(),
                    dep.name
                );
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for DescriptorValidator {
    fn default() -> Self {
        Self::new()
    }
}
