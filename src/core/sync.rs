//! Synchronization helpers for lock poisoning
//!
//! Queue internals use std locks. A poisoned lock means a panic happened while
//! the lock was held; these helpers turn that into a `QueueError` so callers can
//! propagate it with `?` instead of unwrapping.

use crate::queue::error::{QueueError, QueueResult};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Lock a mutex, mapping poisoning to `QueueError::OperationFailed`
///
/// `what` names the guarded structure and ends up in the error message.
pub fn lock_or_fail<'a, T>(mutex: &'a Mutex<T>, what: &str) -> QueueResult<MutexGuard<'a, T>> {
    mutex.lock().map_err(|poison_err| poisoned(what, "mutex", &poison_err))
}

/// Acquire a read guard, mapping poisoning to `QueueError::OperationFailed`
pub fn read_or_fail<'a, T>(
    lock: &'a RwLock<T>,
    what: &str,
) -> QueueResult<RwLockReadGuard<'a, T>> {
    lock.read()
        .map_err(|poison_err| poisoned(what, "RwLock read", &poison_err))
}

/// Acquire a write guard, mapping poisoning to `QueueError::OperationFailed`
pub fn write_or_fail<'a, T>(
    lock: &'a RwLock<T>,
    what: &str,
) -> QueueResult<RwLockWriteGuard<'a, T>> {
    lock.write()
        .map_err(|poison_err| poisoned(what, "RwLock write", &poison_err))
}

/// Lock a mutex whose guarded value carries no invariants (e.g. `Mutex<()>` gates)
///
/// Poisoning is ignored because there is no state a panic could have left
/// half-updated.
pub fn lock_gate(gate: &Mutex<()>) -> MutexGuard<'_, ()> {
    gate.lock().unwrap_or_else(PoisonError::into_inner)
}

fn poisoned<G>(what: &str, kind: &str, poison_err: &PoisonError<G>) -> QueueError {
    QueueError::OperationFailed {
        message: format!(
            "internal synchronisation error on {} ({} poisoned): {}",
            what, kind, poison_err
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_lock_or_fail_success() {
        let mutex = Mutex::new(42);
        let guard = lock_or_fail(&mutex, "test value").unwrap();
        assert_eq!(*guard, 42);
    }

    #[test]
    fn test_lock_or_fail_with_poisoned_mutex() {
        let mutex = Arc::new(Mutex::new(42));
        let mutex_clone = Arc::clone(&mutex);

        // Poison the mutex by panicking while holding the lock
        let _ = thread::spawn(move || {
            let _guard = mutex_clone.lock().unwrap();
            panic!("Intentional panic to poison mutex");
        })
        .join();

        match lock_or_fail(&mutex, "group registry") {
            Err(QueueError::OperationFailed { message }) => {
                assert!(message.contains("group registry"));
                assert!(message.contains("mutex poisoned"));
            }
            other => panic!("Expected OperationFailed, got {:?}", other.map(|g| *g)),
        };
    }

    #[test]
    fn test_rwlock_helpers_success() {
        let rwlock = RwLock::new(1);

        *write_or_fail(&rwlock, "counter").unwrap() = 100;
        assert_eq!(*read_or_fail(&rwlock, "counter").unwrap(), 100);
    }

    #[test]
    fn test_lock_gate_recovers_from_poison() {
        let gate = Arc::new(Mutex::new(()));
        let gate_clone = Arc::clone(&gate);

        let _ = thread::spawn(move || {
            let _guard = gate_clone.lock().unwrap();
            panic!("Intentional panic to poison gate");
        })
        .join();

        assert!(gate.is_poisoned());
        let _guard = lock_gate(&gate);
    }
}
