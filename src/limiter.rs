//! Counting semaphore that caps how many analyzer processes run at once.

use std::sync::{Condvar, Mutex, MutexGuard};

/// Admits at most `capacity` holders at a time. Callers beyond the limit
/// block in [`Limiter::acquire`] until a [`Permit`] is dropped.
#[derive(Debug)]
pub struct Limiter {
    capacity: usize,
    admitted: Mutex<usize>,
    released: Condvar,
}

/// A held slot. The slot is returned when the permit is dropped, including
/// during unwinding.
#[derive(Debug)]
pub struct Permit<'a> {
    limiter: &'a Limiter,
}

impl Limiter {
    pub fn new(capacity: usize) -> Self {
        Limiter {
            capacity: capacity.max(1),
            admitted: Mutex::new(0),
            released: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of permits currently held.
    pub fn in_use(&self) -> usize {
        *self.lock()
    }

    pub fn acquire(&self) -> Permit<'_> {
        let mut admitted = self.lock();
        while *admitted >= self.capacity {
            admitted = self
                .released
                .wait(admitted)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        *admitted += 1;
        Permit { limiter: self }
    }

    fn release(&self) {
        let mut admitted = self.lock();
        *admitted = admitted.saturating_sub(1);
        drop(admitted);
        self.released.notify_one();
    }

    // The counter stays consistent even if a holder panicked, so a poisoned
    // lock is still usable.
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.admitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.limiter.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn permits_are_counted_and_returned() {
        let limiter = Limiter::new(2);
        let a = limiter.acquire();
        let b = limiter.acquire();
        assert_eq!(limiter.in_use(), 2);
        drop(a);
        assert_eq!(limiter.in_use(), 1);
        drop(b);
        assert_eq!(limiter.in_use(), 0);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        assert_eq!(Limiter::new(0).capacity(), 1);
    }

    #[test]
    fn never_admits_more_than_capacity() {
        let limiter = Arc::new(Limiter::new(3));
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                thread::spawn(move || {
                    let _permit = limiter.acquire();
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(limiter.in_use(), 0);
    }

    #[test]
    fn slot_is_released_when_holder_panics() {
        let limiter = Arc::new(Limiter::new(1));
        let worker = Arc::clone(&limiter);
        let result = thread::spawn(move || {
            let _permit = worker.acquire();
            panic!("analyzer blew up");
        })
        .join();

        assert!(result.is_err());
        assert_eq!(limiter.in_use(), 0);
        let _permit = limiter.acquire();
    }
}
