//! Usage: Poison-tolerant locking for the session, listener and telemetry mutexes.
//!
//! A listener or sink that panics while holding one of these locks must not take the whole
//! auth layer down with it. The first locker after the panic logs the poisoning and clears it;
//! later lockers proceed silently with the last written value.

use std::sync::{Mutex, MutexGuard};

pub(crate) trait MutexExt<T> {
    fn lock_or_recover(&self) -> MutexGuard<'_, T>;

    /// Run `f` against the locked value; the guard is released before returning.
    fn with_locked<R>(&self, f: impl FnOnce(&mut T) -> R) -> R;
}

impl<T> MutexExt<T> for Mutex<T> {
    #[track_caller]
    fn lock_or_recover(&self) -> MutexGuard<'_, T> {
        self.lock().unwrap_or_else(|poisoned| {
            let caller = std::panic::Location::caller();
            tracing::warn!(
                value_type = std::any::type_name::<T>(),
                at = %caller,
                "lock was poisoned by a panicking holder; keeping last written value"
            );
            self.clear_poison();
            poisoned.into_inner()
        })
    }

    #[track_caller]
    fn with_locked<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock_or_recover();
        f(&mut guard)
    }
}
