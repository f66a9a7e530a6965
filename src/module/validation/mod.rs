//! Module validation framework
//!
//! Provides descriptor validation: name format and dependency declarations.

pub mod descriptor_validator;

pub use descriptor_validator::{DescriptorValidator, ValidationResult};
