//! Module system traits and interfaces
//!
//! Defines the lifecycle contract every module implements, the identity token
//! used to key the registry, and the error type modules report back with.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use thiserror::Error;

/// Module lifecycle state
///
/// A module moves through these states during a single load pass. `Loaded`,
/// `Failed` and `Disabled` are terminal for the pass; only `Loaded` can go on
/// to `Unloaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleState {
    /// Validated and waiting for its turn in the load order
    Candidate,
    /// Factory is being invoked
    Constructing,
    /// `on_load` is running
    Initializing,
    /// Committed to the registry
    Loaded,
    /// Dependency check, construction or initialization failed
    Failed,
    /// Switched off by configuration; never attempted
    Disabled,
    /// Torn down by `on_unload`
    Unloaded,
}

impl ModuleState {
    /// Whether the load pass is finished with this module
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Loaded | Self::Failed | Self::Disabled | Self::Unloaded
        )
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Candidate => "candidate",
            Self::Constructing => "constructing",
            Self::Initializing => "initializing",
            Self::Loaded => "loaded",
            Self::Failed => "failed",
            Self::Disabled => "disabled",
            Self::Unloaded => "unloaded",
        };
        f.write_str(label)
    }
}

/// Opaque identity of a module type
///
/// Wraps the [`TypeId`] of the concrete module so the registry can hand back
/// the exact type a caller asks for. The type name is kept for logs only and
/// takes no part in equality.
#[derive(Clone, Copy)]
pub struct ModuleId {
    type_id: TypeId,
    type_name: &'static str,
}

impl ModuleId {
    /// Identity of module type `T`
    pub fn of<T: Module>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Fully qualified type name
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Type name without its module path (`my_app::chat::ChatModule` -> `ChatModule`)
    pub fn short_name(&self) -> &'static str {
        let base = self.type_name.split('<').next().unwrap_or(self.type_name);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl PartialEq for ModuleId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ModuleId {}

impl Hash for ModuleId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModuleId").field(&self.type_name).finish()
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Upcast helper so a type-erased module can be downcast back to its concrete type.
///
/// Implemented for every `'static + Send + Sync` type; module authors never
/// implement it by hand.
pub trait AsAny: Any + Send + Sync {
    /// Convert a shared module handle into a shared `Any` handle
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Module trait that all modules must implement
///
/// Lifecycle, driven by the [`ModuleManager`](crate::module::ModuleManager):
///
/// 1. the factory builds the module from its environment,
/// 2. [`on_load`](Module::on_load) runs once; `Ok(true)` commits the module to
///    the registry, `Ok(false)` declines, `Err` fails it,
/// 3. [`on_ready`](Module::on_ready) runs once the host finished its own startup,
/// 4. [`on_unload`](Module::on_unload) runs at shutdown.
#[async_trait]
pub trait Module: AsAny {
    /// Initialize the module
    ///
    /// Return `Ok(false)` to decline loading without it being treated as an error.
    async fn on_load(&mut self) -> Result<bool, ModuleError>;

    /// Called once every module has loaded and the host is ready
    async fn on_ready(&self) {}

    /// Release resources held by the module
    async fn on_unload(&self);
}

/// Module system errors
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Module creation failed: {0}")]
    Creation(String),

    #[error("Module initialization failed: {0}")]
    Initialization(String),

    #[error("Required module not available: {module}")]
    NotAvailable { module: String },

    #[error("Module operation failed: {0}")]
    Operation(String),

    #[error("Module panicked: {0}")]
    Panicked(String),
}

impl ModuleError {
    /// Short stable label for logs
    pub fn as_label(&self) -> &'static str {
        match self {
            ModuleError::Creation(_) => "module_creation",
            ModuleError::Initialization(_) => "module_initialization",
            ModuleError::NotAvailable { .. } => "module_not_available",
            ModuleError::Operation(_) => "module_operation",
            ModuleError::Panicked(_) => "module_panicked",
        }
    }

    /// Build a [`ModuleError::Panicked`] from a caught panic payload
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        ModuleError::Panicked(message)
    }
}

impl From<anyhow::Error> for ModuleError {
    fn from(e: anyhow::Error) -> Self {
        ModuleError::Operation(e.to_string())
    }
}

/// Fatal configuration errors: the whole load pass is rejected and nothing loads
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Circular dependency detected among modules: {}", .modules.join(", "))]
    Cycle { modules: Vec<String> },

    #[error("Module type registered more than once: {module}")]
    DuplicateIdentity { module: String },

    #[error("Module name registered more than once: {name}")]
    DuplicateName { name: String },
}
