//! Shared utilities: lock helpers and logging initialization

pub mod lock;
pub mod logging;

// Re-export commonly used items
pub use lock::{lock_recovering, with_read_lock, with_write_lock};
pub use logging::{init_logging, init_logging_from_config};
#[cfg(feature = "json-logging")]
pub use logging::init_json_logging;
