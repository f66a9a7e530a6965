//! Load pass outcome tracking
//!
//! Every registration handed to the manager ends up with exactly one
//! [`ModuleRecord`] in the [`LoadReport`], so hosts can tell "failed" apart
//! from "never registered" without the lookup API ever returning an error.

use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::module::traits::{ModuleError, ModuleId, ModuleState};

/// Why a module did not load. Recorded per module; never aborts the pass.
#[derive(Debug, Error)]
pub enum LoadFailure {
    #[error("no module descriptor")]
    DescriptorMissing,

    #[error("invalid module descriptor: {}", .0.join("; "))]
    DescriptorInvalid(Vec<String>),

    #[error("required dependency {dependency} is not loaded")]
    MissingDependency { dependency: String },

    #[error("creation failed: {0}")]
    Creation(#[source] ModuleError),

    #[error("initialization failed: {0}")]
    Initialization(#[source] ModuleError),

    #[error("declined to load")]
    Declined,
}

impl LoadFailure {
    /// Short stable label for logs
    pub fn as_label(&self) -> &'static str {
        match self {
            LoadFailure::DescriptorMissing => "descriptor_missing",
            LoadFailure::DescriptorInvalid(_) => "descriptor_invalid",
            LoadFailure::MissingDependency { .. } => "missing_dependency",
            LoadFailure::Creation(_) => "creation_failed",
            LoadFailure::Initialization(_) => "initialization_failed",
            LoadFailure::Declined => "declined",
        }
    }
}

/// Final outcome of one registration
#[derive(Debug)]
pub enum ModuleOutcome {
    /// Loaded; `elapsed` is the duration of `on_load`
    Loaded { elapsed: Duration },
    /// Did not load
    Failed(LoadFailure),
    /// Filtered out by configuration before sorting
    Disabled,
}

/// One registration's journey through the load pass
#[derive(Debug)]
pub struct ModuleRecord {
    /// Descriptor name, or the registration key for a rejected registration
    pub name: String,
    pub id: ModuleId,
    pub state: ModuleState,
    pub outcome: ModuleOutcome,
}

/// Outcome of a complete load pass
#[derive(Debug, Default)]
pub struct LoadReport {
    records: Vec<ModuleRecord>,
    /// Descriptor names of resolved candidates
    by_name: HashMap<String, usize>,
    /// Registration keys of entries rejected during resolution
    by_key: HashMap<String, usize>,
    load_order: Vec<String>,
}

impl LoadReport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_load_order(&mut self, order: Vec<String>) {
        self.load_order = order;
    }

    /// Record the outcome of a resolved candidate, indexed by descriptor name
    pub(crate) fn record(&mut self, name: &str, id: ModuleId, outcome: ModuleOutcome) {
        let index = self.push(name, id, outcome);
        self.by_name.insert(name.to_string(), index);
    }

    /// Record a registration rejected before it became a candidate, indexed by registration key
    pub(crate) fn record_rejected(&mut self, key: &str, id: ModuleId, failure: LoadFailure) {
        let index = self.push(key, id, ModuleOutcome::Failed(failure));
        self.by_key.insert(key.to_string(), index);
    }

    fn push(&mut self, name: &str, id: ModuleId, outcome: ModuleOutcome) -> usize {
        let state = match outcome {
            ModuleOutcome::Loaded { .. } => ModuleState::Loaded,
            ModuleOutcome::Failed(_) => ModuleState::Failed,
            ModuleOutcome::Disabled => ModuleState::Disabled,
        };
        self.records.push(ModuleRecord {
            name: name.to_string(),
            id,
            state,
            outcome,
        });
        self.records.len() - 1
    }

    pub(crate) fn mark_unloaded(&mut self, name: &str) {
        if let Some(&i) = self.by_name.get(name) {
            self.records[i].state = ModuleState::Unloaded;
        }
    }

    /// Order the candidates were attempted in (after dependency sorting)
    pub fn load_order(&self) -> &[String] {
        &self.load_order
    }

    /// All records, in the order outcomes were decided
    pub fn records(&self) -> &[ModuleRecord] {
        &self.records
    }

    /// Record of the candidate with this descriptor name
    pub fn get(&self, name: &str) -> Option<&ModuleRecord> {
        self.by_name.get(name).map(|&i| &self.records[i])
    }

    /// Record of a registration rejected during resolution, by registration key
    pub fn rejected(&self, key: &str) -> Option<&ModuleRecord> {
        self.by_key.get(key).map(|&i| &self.records[i])
    }

    pub fn outcome(&self, name: &str) -> Option<&ModuleOutcome> {
        self.get(name).map(|r| &r.outcome)
    }

    /// Why `name` failed, if it did
    pub fn failure(&self, name: &str) -> Option<&LoadFailure> {
        match self.outcome(name) {
            Some(ModuleOutcome::Failed(failure)) => Some(failure),
            _ => None,
        }
    }

    /// Names of loaded modules, in load order
    pub fn loaded(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, ModuleOutcome::Loaded { .. }))
            .map(|r| r.name.as_str())
            .collect()
    }

    /// Failed modules with their reasons
    pub fn failed(&self) -> Vec<(&str, &LoadFailure)> {
        self.records
            .iter()
            .filter_map(|r| match &r.outcome {
                ModuleOutcome::Failed(failure) => Some((r.name.as_str(), failure)),
                _ => None,
            })
            .collect()
    }

    /// Names of modules filtered out by configuration
    pub fn disabled(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, ModuleOutcome::Disabled))
            .map(|r| r.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
