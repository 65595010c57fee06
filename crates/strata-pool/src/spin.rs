//! Compare-and-set spin flag.

use std::hint;
use std::sync::atomic::{AtomicU8, Ordering};

const FREE: u8 = 0;
const HELD: u8 = 1;

/// A single-flag spin lock: `0` free, `1` held.
///
/// Only suitable for critical sections of a few instructions that never
/// block, allocate, or log.
pub(crate) struct SpinLock {
    flag: AtomicU8,
}

impl SpinLock {
    pub(crate) const fn new() -> Self {
        Self {
            flag: AtomicU8::new(FREE),
        }
    }

    /// Busy-wait until the flag is acquired.
    #[inline]
    pub(crate) fn lock(&self) -> SpinGuard<'_> {
        while self
            .flag
            .compare_exchange_weak(FREE, HELD, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.flag.load(Ordering::Relaxed) == HELD {
                hint::spin_loop();
            }
        }
        SpinGuard { lock: self }
    }

    #[cfg(test)]
    pub(crate) fn is_held(&self) -> bool {
        self.flag.load(Ordering::Relaxed) == HELD
    }
}

/// Releases the flag on drop.
pub(crate) struct SpinGuard<'a> {
    lock: &'a SpinLock,
}

impl Drop for SpinGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        self.lock.flag.store(FREE, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    #![allow(unsafe_code)]

    use super::*;
    use std::cell::UnsafeCell;
    use std::sync::Arc;

    #[test]
    fn guard_releases_on_drop() {
        let lock = SpinLock::new();
        {
            let _guard = lock.lock();
            assert!(lock.is_held());
        }
        assert!(!lock.is_held());
    }

    struct Counter {
        lock: SpinLock,
        value: UnsafeCell<u64>,
    }

    // SAFETY: `value` is only touched while `lock` is held.
    unsafe impl Sync for Counter {}

    #[test]
    fn provides_mutual_exclusion() {
        let counter = Arc::new(Counter {
            lock: SpinLock::new(),
            value: UnsafeCell::new(0),
        });
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    for _ in 0..10_000 {
                        let _guard = counter.lock.lock();
                        // SAFETY: the guard gives exclusive access.
                        unsafe {
                            *counter.value.get() += 1;
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let _guard = counter.lock.lock();
        // SAFETY: the guard gives exclusive access.
        let total = unsafe { *counter.value.get() };
        assert_eq!(total, 80_000);
    }
}
