//! Configuration tests
//!
//! Enable/disable filtering, per-module configuration, manifest catalogs and
//! custom environment providers.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};

use bllvm_modules::module::{LoadFailure, MemorySink, ModuleOutcome, ModuleProvider};
use bllvm_modules::{
    ConfigError, ManagerConfig, ManifestCatalog, ModuleConfig, ModuleDescriptor,
    ModuleEnvironment, ModuleManager,
};

use super::test_utils::*;

#[tokio::test]
async fn test_disabled_module_and_its_dependents_do_not_load() {
    let log = EventLog::new();
    let sink = MemorySink::new();
    let config = ManagerConfig::from_toml_str(
        r#"
        [modules]
        disabled_modules = ["party"]
        "#,
    )
    .unwrap();

    let manager = ModuleManager::builder()
        .module(ModuleDescriptor::new("lobby"), {
            let log = log.clone();
            move |_| Ok(ModuleA::ok("lobby", &log))
        })
        .module(ModuleDescriptor::new("party"), {
            let log = log.clone();
            move |_| Ok(ModuleB::ok("party", &log))
        })
        .module(ModuleDescriptor::new("chat").requires("party"), {
            let log = log.clone();
            move |_| Ok(ModuleC::ok("chat", &log))
        })
        .config(config)
        .diagnostics(Arc::new(sink.clone()))
        .build()
        .await
        .unwrap();

    assert_eq!(manager.loaded_modules(), vec!["lobby"]);
    assert_eq!(manager.report().disabled(), vec!["party"]);
    assert!(matches!(
        manager.report().outcome("party"),
        Some(ModuleOutcome::Disabled)
    ));
    assert!(matches!(
        manager.report().failure("chat"),
        Some(LoadFailure::MissingDependency { .. })
    ));
    assert_eq!(events_for(&sink, "party"), vec!["module_disabled"]);
    // Disabled modules take no part in ordering
    assert_eq!(manager.report().load_order(), ["chat", "lobby"]);
}

#[tokio::test]
async fn test_enabled_list_restricts_loading() {
    let log = EventLog::new();
    let config = ManagerConfig {
        modules: ModuleConfig {
            enabled_modules: vec!["lobby".to_string()],
            ..ModuleConfig::default()
        },
        ..ManagerConfig::default()
    };

    let manager = ModuleManager::builder()
        .module(ModuleDescriptor::new("lobby"), {
            let log = log.clone();
            move |_| Ok(ModuleA::ok("lobby", &log))
        })
        .module(ModuleDescriptor::new("party"), {
            let log = log.clone();
            move |_| Ok(ModuleB::ok("party", &log))
        })
        .config(config)
        .build()
        .await
        .unwrap();

    assert_eq!(manager.loaded_modules(), vec!["lobby"]);
    assert_eq!(log.phase("load"), vec!["lobby"]);
}

#[tokio::test]
async fn test_module_config_reaches_factory() {
    let log = EventLog::new();
    let greeting = Arc::new(Mutex::new(String::new()));
    let config = ManagerConfig::from_toml_str(
        r#"
        [modules.module_configs.chat]
        greeting = "welcome"
        "#,
    )
    .unwrap();

    ModuleManager::builder()
        .module(ModuleDescriptor::new("chat"), {
            let log = log.clone();
            let greeting = Arc::clone(&greeting);
            move |env| {
                *greeting.lock().unwrap() = env.get_config_or("greeting", "hello");
                Ok(ModuleA::ok("chat", &log))
            }
        })
        .config(config)
        .build()
        .await
        .unwrap();

    assert_eq!(*greeting.lock().unwrap(), "welcome");
}

#[tokio::test]
async fn test_config_file_round_trip() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        [modules]
        enabled_modules = []
        disabled_modules = ["metrics"]

        [modules.module_configs.chat]
        greeting = "hello"

        [logging]
        filter = "bllvm_modules=debug"
        json_format = true
        "#
    )
    .unwrap();

    let config = ManagerConfig::from_file(file.path()).unwrap();
    assert!(!config.modules.is_enabled("metrics"));
    assert!(config.modules.is_enabled("chat"));
    assert_eq!(config.modules.config_for("chat").get("greeting").map(String::as_str), Some("hello"));

    let logging = config.logging.unwrap();
    assert_eq!(logging.filter.as_deref(), Some("bllvm_modules=debug"));
    assert!(logging.json_format);
}

#[test]
fn test_config_errors() {
    assert!(matches!(
        ManagerConfig::from_file("/nonexistent/bllvm-modules.toml"),
        Err(ConfigError::Read { .. })
    ));
    assert!(matches!(
        ManagerConfig::from_toml_str("[modules"),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        ManagerConfig::from_toml_str("[modules]\ndisabled_modules = [\"\"]"),
        Err(ConfigError::Invalid(_))
    ));
}

#[tokio::test]
async fn test_catalog_supplies_missing_descriptors() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        [[module]]
        key = "ModuleX"
        name = "x"
        dependencies = [{{ name = "y" }}]

        [[module]]
        key = "ModuleY"
        name = "y"
        "#
    )
    .unwrap();
    let catalog = ManifestCatalog::from_file(file.path()).unwrap();

    let log = EventLog::new();
    let manager = ModuleManager::builder()
        .undescribed_module({
            let log = log.clone();
            move |env| {
                assert!(env.require::<ModuleY>().is_ok());
                Ok(ModuleX::ok("x", &log))
            }
        })
        .undescribed_module({
            let log = log.clone();
            move |_| Ok(ModuleY::ok("y", &log))
        })
        .catalog(catalog)
        .build()
        .await
        .unwrap();

    assert_eq!(manager.loaded_modules(), vec!["y", "x"]);
    assert!(manager.get_module::<ModuleX>().is_some());
}

#[tokio::test]
async fn test_inline_descriptor_wins_over_catalog() {
    let catalog = ManifestCatalog::from_toml_str(
        r#"
        [[module]]
        key = "ModuleA"
        name = "from-catalog"
        "#,
    )
    .unwrap();

    let log = EventLog::new();
    let manager = ModuleManager::builder()
        .module(ModuleDescriptor::new("inline"), {
            let log = log.clone();
            move |_| Ok(ModuleA::ok("a", &log))
        })
        .catalog(catalog)
        .build()
        .await
        .unwrap();

    assert!(manager.is_loaded("inline"));
    assert!(!manager.is_loaded("from-catalog"));
}

#[tokio::test]
async fn test_custom_environment_provider() {
    let log = EventLog::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let manager = ModuleManager::builder()
        .module(ModuleDescriptor::new("a"), {
            let log = log.clone();
            let seen = Arc::clone(&seen);
            move |env| {
                seen.lock().unwrap().push(env.get_config_or("region", "none"));
                Ok(ModuleA::ok("a", &log))
            }
        })
        .environment_provider(
            |descriptor: &ModuleDescriptor, _: &ModuleConfig, provider: ModuleProvider| {
                ModuleEnvironment::new(descriptor.clone(), provider)
                    .with_config(HashMap::from([("region".to_string(), "eu".to_string())]))
            },
        )
        .build()
        .await
        .unwrap();

    assert!(manager.is_loaded("a"));
    assert_eq!(*seen.lock().unwrap(), vec!["eu"]);
}
