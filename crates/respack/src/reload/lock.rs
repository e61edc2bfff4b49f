use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::warn;

static RELOAD_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_reload_lock_poison_once(operation: &'static str) {
    if RELOAD_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "reload lock poisoned; recovered inner value");
    }
}

pub(crate) fn lock_recovering<'a, T>(
    mutex: &'a Mutex<T>,
    operation: &'static str,
) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn_reload_lock_poison_once(operation);
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
        let mutex = Mutex::new(7u32);
        thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = mutex.lock().expect("guard");
                    panic!("poison reload lock");
                })
                .join();
        });
        assert!(mutex.is_poisoned());
        assert_eq!(*lock_recovering(&mutex, "test"), 7);
    }
}
