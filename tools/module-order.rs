//! Print the load order of a module manifest catalog
//!
//! Reads a TOML catalog of `[[module]]` tables, validates every descriptor, and
//! prints the order the module manager would load them in. Exits non-zero on an
//! invalid descriptor or a dependency cycle.
//!
//! ```text
//! module-order modules.toml
//! module-order modules.toml --json
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

use bllvm_modules::module::registry::{DependencyGraph, DependencySorter, ModuleDependencies};
use bllvm_modules::module::{DescriptorValidator, ModuleDescriptor, ValidationResult};
use bllvm_modules::ManifestCatalog;

#[derive(Parser, Debug)]
#[command(name = "module-order", about = "Print the dependency-ordered load sequence of a module catalog")]
struct Args {
    /// Manifest catalog (TOML, `[[module]]` tables)
    catalog: PathBuf,

    /// Print machine-readable JSON
    #[arg(long)]
    json: bool,

    /// Also list each module's in-catalog dependencies
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct OrderedModule<'a> {
    position: usize,
    name: &'a str,
    depends_on: Vec<&'a str>,
    /// Required dependencies absent from the catalog; the module will fail to load
    unsatisfied: Vec<&'a str>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let catalog = ManifestCatalog::from_file(&args.catalog)
        .with_context(|| format!("Failed to read catalog {}", args.catalog.display()))?;
    let descriptors: Vec<ModuleDescriptor> = catalog.descriptors().cloned().collect();

    let validator = DescriptorValidator::new();
    let mut invalid = 0;
    for descriptor in &descriptors {
        if let ValidationResult::Invalid(errors) = validator.validate(descriptor) {
            invalid += 1;
            for error in errors {
                eprintln!("{}: {}", descriptor.name(), error);
            }
        }
    }
    if invalid > 0 {
        bail!("{} invalid module descriptor(s)", invalid);
    }

    let graph = DependencyGraph::build(&descriptors)?;
    let sorted = ModuleDependencies.sort(descriptors)?;

    let ordered: Vec<OrderedModule> = sorted
        .iter()
        .enumerate()
        .map(|(i, descriptor)| OrderedModule {
            position: i + 1,
            name: descriptor.name(),
            depends_on: graph.dependencies_of(descriptor.name()),
            unsatisfied: descriptor
                .required_dependencies()
                .filter(|dep| !sorted.iter().any(|d| d.name() == dep.name))
                .map(|dep| dep.name.as_str())
                .collect(),
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&ordered)?);
        return Ok(());
    }

    for module in &ordered {
        if args.verbose && !module.depends_on.is_empty() {
            println!("{:>3}. {} (after {})", module.position, module.name, module.depends_on.join(", "));
        } else {
            println!("{:>3}. {}", module.position, module.name);
        }
        if !module.unsatisfied.is_empty() {
            println!("     missing required: {}", module.unsatisfied.join(", "));
        }
    }
    Ok(())
}
