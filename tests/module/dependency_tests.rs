//! Module dependency tests
//!
//! Required and optional dependencies, load ordering, and fatal graph errors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bllvm_modules::module::{Diagnostic, LoadFailure, MemorySink};
use bllvm_modules::{
    ConfigurationError, ManagerConfig, ModuleDescriptor, ModuleError, ModuleManager,
};

use super::test_utils::*;

#[tokio::test]
async fn test_required_dependent_not_loaded_if_dependency_absent() {
    let log = EventLog::new();
    let sink = MemorySink::new();
    let manager = ModuleManager::builder()
        .module(ModuleDescriptor::new("x").requires("y"), {
            let log = log.clone();
            move |_| Ok(ModuleX::ok("x", &log))
        })
        .diagnostics(Arc::new(sink.clone()))
        .build()
        .await
        .unwrap();

    assert!(manager.get_module::<ModuleX>().is_none());
    // Never constructed, let alone loaded
    assert!(log.events().is_empty());
    assert!(matches!(
        manager.report().failure("x"),
        Some(LoadFailure::MissingDependency { dependency }) if dependency == "y"
    ));
    assert!(sink.snapshot().contains(&Diagnostic::MissingDependency {
        module: "x".to_string(),
        dependency: "y".to_string(),
    }));
}

#[tokio::test]
async fn test_required_dependent_loads_with_dependency() {
    let log = EventLog::new();
    let manager = ModuleManager::builder()
        .module(ModuleDescriptor::new("required-dependent").requires("dependency"), {
            let log = log.clone();
            move |env| {
                let dependency = env.require::<ModuleA>()?;
                assert_eq!(dependency.label, "dependency");
                Ok(ModuleB::ok("required-dependent", &log))
            }
        })
        .module(ModuleDescriptor::new("dependency"), {
            let log = log.clone();
            move |_| Ok(ModuleA::ok("dependency", &log))
        })
        .build()
        .await
        .unwrap();

    assert!(manager.get_module::<ModuleA>().is_some());
    assert!(manager.get_module::<ModuleB>().is_some());
    assert_eq!(log.phase("load"), vec!["dependency", "required-dependent"]);
}

#[tokio::test]
async fn test_optional_dependent_loads_if_dependency_absent() {
    let log = EventLog::new();
    let observed = Arc::new(Mutex::new(None));
    let manager = ModuleManager::builder()
        .module(
            ModuleDescriptor::new("optional-dependent").optionally("dependency"),
            {
                let log = log.clone();
                let observed = Arc::clone(&observed);
                move |env| {
                    let optional = env.optional::<ModuleA>().is_some();
                    let required = env.require::<ModuleA>();
                    *observed.lock().unwrap() = Some((optional, required.err()));
                    Ok(ModuleB::ok("optional-dependent", &log))
                }
            },
        )
        .build()
        .await
        .unwrap();

    assert!(manager.get_module::<ModuleB>().is_some());
    let (optional_present, require_error) = observed.lock().unwrap().take().unwrap();
    assert!(!optional_present);
    assert!(matches!(
        require_error,
        Some(ModuleError::NotAvailable { module }) if module == "ModuleA"
    ));
}

#[tokio::test]
async fn test_optional_dependent_loads_with_dependency() {
    let log = EventLog::new();
    let observed = Arc::new(AtomicBool::new(false));
    let manager = ModuleManager::builder()
        .module(ModuleDescriptor::new("dependency"), {
            let log = log.clone();
            move |_| Ok(ModuleA::ok("dependency", &log))
        })
        .module(
            ModuleDescriptor::new("optional-dependent").optionally("dependency"),
            {
                let log = log.clone();
                let observed = Arc::clone(&observed);
                move |env| {
                    observed.store(env.optional::<ModuleA>().is_some(), Ordering::SeqCst);
                    Ok(ModuleB::ok("optional-dependent", &log))
                }
            },
        )
        .build()
        .await
        .unwrap();

    assert!(manager.get_module::<ModuleB>().is_some());
    assert!(observed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_module_loads_with_required_dependency_if_no_optional_dependency() {
    let log = EventLog::new();
    let observed = Arc::new(Mutex::new(None));
    let manager = ModuleManager::builder()
        .module(ModuleDescriptor::new("required-dependency"), {
            let log = log.clone();
            move |_| Ok(ModuleA::ok("required-dependency", &log))
        })
        .module(
            ModuleDescriptor::new("dependent")
                .requires("required-dependency")
                .optionally("optional-dependency"),
            {
                let log = log.clone();
                let observed = Arc::clone(&observed);
                move |env| {
                    *observed.lock().unwrap() = Some((
                        env.require::<ModuleA>().is_ok(),
                        env.optional::<ModuleC>().is_none(),
                    ));
                    Ok(ModuleB::ok("dependent", &log))
                }
            },
        )
        .build()
        .await
        .unwrap();

    assert!(manager.is_loaded("dependent"));
    assert_eq!(*observed.lock().unwrap(), Some((true, true)));
}

/// A (no deps), B (requires A), C (requires A, optional D), registered as [C, B, A]
#[tokio::test]
async fn test_registration_order_does_not_affect_load_order() {
    let log = EventLog::new();
    let manager = ModuleManager::builder()
        .module(ModuleDescriptor::new("c").requires("a").optionally("d"), {
            let log = log.clone();
            move |_| Ok(ModuleC::ok("c", &log))
        })
        .module(ModuleDescriptor::new("b").requires("a"), {
            let log = log.clone();
            move |_| Ok(ModuleB::ok("b", &log))
        })
        .module(ModuleDescriptor::new("a"), {
            let log = log.clone();
            move |_| Ok(ModuleA::ok("a", &log))
        })
        .build()
        .await
        .unwrap();

    assert_eq!(manager.loaded_modules(), vec!["a", "b", "c"]);
    assert_eq!(log.phase("load"), vec!["a", "b", "c"]);
    assert!(manager.get_module::<ModuleA>().is_some());
    assert!(manager.get_module::<ModuleB>().is_some());
    assert!(manager.get_module::<ModuleC>().is_some());
    assert!(manager.get_module::<ModuleD>().is_none());
}

#[tokio::test]
async fn test_failed_dependency_fails_its_dependents() {
    let log = EventLog::new();
    let manager = ModuleManager::builder()
        .module(ModuleDescriptor::new("base"), {
            let log = log.clone();
            move |_| Ok(ModuleA::new("base", OnLoad::Fail, log))
        })
        .module(ModuleDescriptor::new("middle").requires("base"), {
            let log = log.clone();
            move |_| Ok(ModuleB::ok("middle", &log))
        })
        .module(ModuleDescriptor::new("top").requires("middle"), {
            let log = log.clone();
            move |_| Ok(ModuleC::ok("top", &log))
        })
        .module(ModuleDescriptor::new("side").optionally("base"), {
            let log = log.clone();
            move |_| Ok(ModuleD::ok("side", &log))
        })
        .build()
        .await
        .unwrap();

    assert_eq!(manager.loaded_modules(), vec!["side"]);
    assert!(matches!(
        manager.report().failure("middle"),
        Some(LoadFailure::MissingDependency { dependency }) if dependency == "base"
    ));
    assert!(matches!(
        manager.report().failure("top"),
        Some(LoadFailure::MissingDependency { dependency }) if dependency == "middle"
    ));
}

#[tokio::test]
async fn test_cycle_is_fatal() {
    let constructed = Arc::new(AtomicBool::new(false));
    let sink = MemorySink::new();
    let log = EventLog::new();
    let result = ModuleManager::builder()
        .module(ModuleDescriptor::new("a").requires("b"), {
            let (log, constructed) = (log.clone(), Arc::clone(&constructed));
            move |_| {
                constructed.store(true, Ordering::SeqCst);
                Ok(ModuleA::ok("a", &log))
            }
        })
        .module(ModuleDescriptor::new("b").optionally("a"), {
            let (log, constructed) = (log.clone(), Arc::clone(&constructed));
            move |_| {
                constructed.store(true, Ordering::SeqCst);
                Ok(ModuleB::ok("b", &log))
            }
        })
        .module(ModuleDescriptor::new("free"), {
            let (log, constructed) = (log.clone(), Arc::clone(&constructed));
            move |_| {
                constructed.store(true, Ordering::SeqCst);
                Ok(ModuleC::ok("free", &log))
            }
        })
        .diagnostics(Arc::new(sink.clone()))
        .build()
        .await;

    match result {
        Err(ConfigurationError::Cycle { modules }) => assert_eq!(modules, vec!["a", "b"]),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("cycle must fail the load pass"),
    }
    assert!(!constructed.load(Ordering::SeqCst));
    assert!(sink.snapshot().contains(&Diagnostic::CycleDetected {
        modules: vec!["a".to_string(), "b".to_string()],
    }));
}

#[tokio::test]
async fn test_duplicate_names_are_fatal() {
    let log = EventLog::new();
    let result = ModuleManager::builder()
        .module(ModuleDescriptor::new("same"), {
            let log = log.clone();
            move |_| Ok(ModuleA::ok("first", &log))
        })
        .module(ModuleDescriptor::new("same"), {
            let log = log.clone();
            move |_| Ok(ModuleB::ok("second", &log))
        })
        .build()
        .await;

    assert!(matches!(
        result,
        Err(ConfigurationError::DuplicateName { name }) if name == "same"
    ));
    assert!(log.events().is_empty());
}

#[tokio::test]
async fn test_duplicate_names_fatal_even_when_one_is_disabled() {
    let log = EventLog::new();
    let sink = MemorySink::new();
    let config = ManagerConfig::from_toml_str(
        r#"
        [modules]
        disabled_modules = ["same"]
        "#,
    )
    .unwrap();

    let result = ModuleManager::builder()
        .module(ModuleDescriptor::new("same"), {
            let log = log.clone();
            move |_| Ok(ModuleA::ok("first", &log))
        })
        .module(ModuleDescriptor::new("same"), {
            let log = log.clone();
            move |_| Ok(ModuleB::ok("second", &log))
        })
        .config(config)
        .diagnostics(Arc::new(sink.clone()))
        .build()
        .await;

    assert!(matches!(
        result,
        Err(ConfigurationError::DuplicateName { name }) if name == "same"
    ));
    assert!(log.events().is_empty());
    assert!(sink.snapshot().contains(&Diagnostic::DuplicateModule {
        module: "same".to_string(),
    }));
    assert!(!sink
        .snapshot()
        .iter()
        .any(|d| matches!(d, Diagnostic::ModuleDisabled { .. })));
}
