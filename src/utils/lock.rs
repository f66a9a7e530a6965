//! Lock utilities
//!
//! Provides helpers for common lock patterns with automatic release. Poisoned
//! locks are recovered rather than propagated: every structure guarded here is
//! mutated by single insert/clear operations that cannot leave it half-updated.

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

/// Acquire a mutex, recovering from poisoning
pub fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn!("Recovering poisoned mutex");
        poisoned.into_inner()
    })
}

/// Execute a closure with a read lock, automatically releasing it
///
/// # Example
/// ```rust
/// use bllvm_modules::utils::with_read_lock;
/// use std::sync::RwLock;
///
/// let lock = RwLock::new(vec![1, 2, 3]);
/// let len = with_read_lock(&lock, |v| v.len());
/// assert_eq!(len, 3);
/// ```
pub fn with_read_lock<T, F, R>(rwlock: &RwLock<T>, f: F) -> R
where
    F: FnOnce(&T) -> R,
{
    let guard: RwLockReadGuard<'_, T> = rwlock.read().unwrap_or_else(|poisoned| {
        warn!("Recovering poisoned read lock");
        poisoned.into_inner()
    });
    f(&guard)
}

/// Execute a closure with a write lock, automatically releasing it
///
/// # Example
/// ```rust
/// use bllvm_modules::utils::with_write_lock;
/// use std::sync::RwLock;
///
/// let lock = RwLock::new(Vec::new());
/// with_write_lock(&lock, |v| v.push(1));
/// ```
pub fn with_write_lock<T, F, R>(rwlock: &RwLock<T>, f: F) -> R
where
    F: FnOnce(&mut T) -> R,
{
    let mut guard: RwLockWriteGuard<'_, T> = rwlock.write().unwrap_or_else(|poisoned| {
        warn!("Recovering poisoned write lock");
        poisoned.into_inner()
    });
    f(&mut guard)
}
