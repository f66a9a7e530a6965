//! Module dependency resolution
//!
//! Builds the dependency graph between candidates and determines load order.
//!
//! Edges run from a dependency to its dependent and are resolved by descriptor
//! name. A dependency naming no candidate contributes no edge: whether its
//! absence matters is decided by the manager at load time, not here.
//!
//! Ordering is Kahn's algorithm with a min-heap of ready vertices keyed by
//! module name, so ties always break towards the alphabetically smallest name
//! and the same input set yields the same order whatever order it came in.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use tracing::debug;

use crate::module::registry::manifest::Describe;
use crate::module::traits::ConfigurationError;

/// Adjacency-list dependency graph over a set of described items
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    names: Vec<String>,
    index: HashMap<String, usize>,
    /// dependency -> dependents
    dependents: Vec<Vec<usize>>,
    /// dependent -> dependencies (only those present in the graph)
    dependencies: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Build the graph; descriptor names must be unique
    pub fn build<T: Describe>(items: &[T]) -> Result<Self, ConfigurationError> {
        let mut index = HashMap::with_capacity(items.len());
        let mut names = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let name = item.descriptor().name().to_string();
            if index.insert(name.clone(), i).is_some() {
                return Err(ConfigurationError::DuplicateName { name });
            }
            names.push(name);
        }

        let mut dependents = vec![Vec::new(); items.len()];
        let mut dependencies = vec![Vec::new(); items.len()];
        for (i, item) in items.iter().enumerate() {
            for dep in item.descriptor().dependencies() {
                let Some(&d) = index.get(&dep.name) else {
                    continue;
                };
                if !dependencies[i].contains(&d) {
                    dependencies[i].push(d);
                    dependents[d].push(i);
                }
            }
        }

        Ok(Self {
            names,
            index,
            dependents,
            dependencies,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All edges as `(dependency, dependent)` name pairs
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.dependents
            .iter()
            .enumerate()
            .flat_map(|(d, deps)| {
                deps.iter()
                    .map(move |&i| (self.names[d].as_str(), self.names[i].as_str()))
            })
            .collect()
    }

    /// Names of in-graph modules that `name` depends on
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.index
            .get(name)
            .map(|&i| self.dependencies[i].iter().map(|&d| self.names[d].as_str()).collect())
            .unwrap_or_default()
    }

    /// Names of in-graph modules depending on `name`
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.index
            .get(name)
            .map(|&d| self.dependents[d].iter().map(|&i| self.names[i].as_str()).collect())
            .unwrap_or_default()
    }

    /// Topological order as indices into the slice the graph was built from
    pub fn topological_order(&self) -> Result<Vec<usize>, ConfigurationError> {
        let mut in_degree: Vec<usize> = self.dependencies.iter().map(Vec::len).collect();

        let mut ready: BinaryHeap<Reverse<(&str, usize)>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &degree)| degree == 0)
            .map(|(i, _)| Reverse((self.names[i].as_str(), i)))
            .collect();

        let mut order = Vec::with_capacity(self.len());
        while let Some(Reverse((_, module))) = ready.pop() {
            order.push(module);
            for &dependent in &self.dependents[module] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.push(Reverse((self.names[dependent].as_str(), dependent)));
                }
            }
        }

        if order.len() != self.len() {
            // anything never reaching in-degree zero is on or behind a cycle
            let mut modules: Vec<String> = in_degree
                .iter()
                .enumerate()
                .filter(|(_, &degree)| degree > 0)
                .map(|(i, _)| self.names[i].clone())
                .collect();
            modules.sort();
            return Err(ConfigurationError::Cycle { modules });
        }

        Ok(order)
    }
}

/// Orders described items so every dependency precedes its dependents
pub trait DependencySorter {
    fn sort<T: Describe>(&self, items: Vec<T>) -> Result<Vec<T>, ConfigurationError>;
}

/// Kahn's algorithm with ascending-name tie-break
#[derive(Debug, Default, Clone, Copy)]
pub struct ModuleDependencies;

impl DependencySorter for ModuleDependencies {
    fn sort<T: Describe>(&self, items: Vec<T>) -> Result<Vec<T>, ConfigurationError> {
        let graph = DependencyGraph::build(&items)?;
        let order = graph.topological_order()?;

        debug!(
            "Dependency resolution complete: {:?}",
            order.iter().map(|&i| graph.names[i].as_str()).collect::<Vec<_>>()
        );

        let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
        Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
    }
}
