//! FIFO counting semaphore (admission control).
//!
//! Bounds how many transactions run concurrently; this is the only
//! backpressure mechanism protecting the storage engine's write capacity.
//! Fairness is FIFO: waiters are granted permits in arrival order, so no
//! caller is starved by later arrivals.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

#[derive(Debug)]
struct SemState {
    permits: usize,
    /// Tickets of blocked acquirers, front = longest waiting.
    waiters: VecDeque<u64>,
    next_ticket: u64,
}

/// Counting admission gate with FIFO fairness.
///
/// Capacity is fixed at construction and never grows. `acquire` blocks the
/// calling thread until a permit is available *and* the caller is at the
/// front of the wait queue; the returned [`SemaphorePermit`] releases on
/// drop, so no exit path can leak a permit.
#[derive(Debug)]
pub struct Semaphore {
    state: Mutex<SemState>,
    available: Condvar,
    capacity: usize,
}

impl Semaphore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(SemState {
                permits: capacity,
                waiters: VecDeque::new(),
                next_ticket: 0,
            }),
            available: Condvar::new(),
            capacity,
        }
    }

    /// Block until a permit is available, then consume one.
    pub fn acquire(&self) -> SemaphorePermit<'_> {
        let mut state = self.state.lock().unwrap();

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.waiters.push_back(ticket);

        // Wait until we are the longest-waiting caller *and* a permit is
        // free. Everyone is woken on release; only the front proceeds.
        while state.permits == 0 || state.waiters.front() != Some(&ticket) {
            state = self.available.wait(state).unwrap();
        }

        state.waiters.pop_front();
        state.permits -= 1;

        // With capacity > 1 the next waiter may be admissible right now;
        // it went back to sleep when we were woken, so wake it again.
        let wake_next = state.permits > 0 && !state.waiters.is_empty();
        drop(state);
        if wake_next {
            self.available.notify_all();
        }

        SemaphorePermit { semaphore: self }
    }

    /// Permits currently free (observability snapshot; takes no permit).
    pub fn available_permits(&self) -> usize {
        self.state.lock().unwrap().permits
    }

    /// Callers currently blocked in `acquire` (observability snapshot).
    pub fn queue_len(&self) -> usize {
        self.state.lock().unwrap().waiters.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn release(&self) {
        let mut state = self.state.lock().unwrap();
        // Permits can never exceed the construction-time capacity, even
        // under contention; release is only reachable through a permit.
        state.permits = (state.permits + 1).min(self.capacity);
        drop(state);
        self.available.notify_all();
    }
}

/// A held permit. Dropping it returns the permit and wakes the
/// longest-waiting blocked acquirer, if any.
#[derive(Debug)]
pub struct SemaphorePermit<'a> {
    semaphore: &'a Semaphore,
}

impl Drop for SemaphorePermit<'_> {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..500 {
            if cond() {
                return;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        panic!("condition not reached within 1s");
    }

    #[test]
    fn permit_accounting() {
        let sem = Semaphore::new(2);
        assert_eq!(sem.available_permits(), 2);
        assert_eq!(sem.capacity(), 2);

        let a = sem.acquire();
        assert_eq!(sem.available_permits(), 1);
        let b = sem.acquire();
        assert_eq!(sem.available_permits(), 0);

        drop(a);
        assert_eq!(sem.available_permits(), 1);
        drop(b);
        assert_eq!(sem.available_permits(), 2);
    }

    #[test]
    fn capacity_is_at_least_one() {
        let sem = Semaphore::new(0);
        assert_eq!(sem.capacity(), 1);
        let _p = sem.acquire();
        assert_eq!(sem.available_permits(), 0);
    }

    #[test]
    fn waiters_are_granted_in_fifo_order() {
        let sem = Arc::new(Semaphore::new(1));
        let order = Arc::new(Mutex::new(Vec::new()));

        let held = sem.acquire();

        let mut handles = Vec::new();
        for i in 0..3usize {
            let thread_sem = Arc::clone(&sem);
            let order = Arc::clone(&order);
            handles.push(std::thread::spawn(move || {
                let _p = thread_sem.acquire();
                order.lock().unwrap().push(i);
            }));
            // Ensure thread i is enqueued before thread i+1 starts.
            wait_until(|| sem.queue_len() == i + 1);
        }

        drop(held);
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(sem.available_permits(), 1);
        assert_eq!(sem.queue_len(), 0);
    }

    #[test]
    fn blocked_acquirer_proceeds_only_after_release() {
        let sem = Arc::new(Semaphore::new(1));
        let entered = Arc::new(AtomicUsize::new(0));

        let held = sem.acquire();

        let t = {
            let sem = Arc::clone(&sem);
            let entered = Arc::clone(&entered);
            std::thread::spawn(move || {
                let _p = sem.acquire();
                entered.store(1, Ordering::SeqCst);
            })
        };

        wait_until(|| sem.queue_len() == 1);
        assert_eq!(entered.load(Ordering::SeqCst), 0);

        drop(held);
        t.join().unwrap();
        assert_eq!(entered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_holders_never_exceed_capacity() {
        let sem = Arc::new(Semaphore::new(3));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let sem = Arc::clone(&sem);
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                std::thread::spawn(move || {
                    let _p = sem.acquire();
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(5));
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(sem.available_permits(), 3);
    }
}
