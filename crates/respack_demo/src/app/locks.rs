use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

static STATE_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_state_lock_poison_once(operation: &'static str) {
    if STATE_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "reloader state lock poisoned; recovered inner value");
    }
}

pub(crate) fn read_recovering<'a, T>(
    lock: &'a RwLock<T>,
    operation: &'static str,
) -> RwLockReadGuard<'a, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn_state_lock_poison_once(operation);
            poisoned.into_inner()
        }
    }
}

pub(crate) fn write_recovering<'a, T>(
    lock: &'a RwLock<T>,
    operation: &'static str,
) -> RwLockWriteGuard<'a, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn_state_lock_poison_once(operation);
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn poisoned_lock_yields_inner_value() {
        let lock = RwLock::new(3u32);
        thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = lock.write().expect("guard");
                    panic!("poison state lock");
                })
                .join();
        });
        assert!(lock.is_poisoned());
        assert_eq!(*read_recovering(&lock, "test_read"), 3);
        *write_recovering(&lock, "test_write") = 4;
        assert_eq!(*read_recovering(&lock, "test_read"), 4);
    }
}
