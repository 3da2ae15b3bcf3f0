//! Per-key serialization
//!
//! "Fetch nonce, sign, submit" must not interleave for the same account:
//! two flows reading the same pending nonce produce transactions the node
//! rejects or replaces. `SignerLocks` hands out one mutex per address and
//! runs the critical section while holding every lock it needs.

use crate::log_warn;
use crate::types::Address;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Registry of per-address locks
#[derive(Debug, Default)]
pub struct SignerLocks {
    locks: Mutex<HashMap<Address, Arc<Mutex<()>>>>,
}

impl SignerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, address: &Address) -> Arc<Mutex<()>> {
        // The registry only ever inserts, so a poisoned map is still consistent
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(*address).or_default().clone()
    }

    /// Run `f` while holding the locks of every address in `addresses`.
    ///
    /// Locks are taken in sorted order with duplicates removed, so a
    /// sponsored flow (authorizer + sponsor) and a self-sponsored flow on
    /// either key cannot deadlock each other.
    pub fn with_locks<T>(&self, addresses: &[Address], f: impl FnOnce() -> T) -> T {
        let mut ordered = addresses.to_vec();
        ordered.sort();
        ordered.dedup();

        let handles: Vec<Arc<Mutex<()>>> = ordered.iter().map(|a| self.lock_for(a)).collect();

        let _guards: Vec<MutexGuard<'_, ()>> = handles
            .iter()
            .zip(&ordered)
            .map(|(lock, address)| {
                lock.lock().unwrap_or_else(|poisoned| {
                    log_warn!("nonce", "recovered poisoned signer lock", address = address);
                    poisoned.into_inner()
                })
            })
            .collect();

        f()
    }

    /// Number of addresses seen so far
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_duplicate_addresses_do_not_self_deadlock() {
        let locks = SignerLocks::new();
        let a = Address([1; 20]);
        let value = locks.with_locks(&[a, a, a], || 42);
        assert_eq!(value, 42);
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn test_same_key_is_serialized() {
        let locks = Arc::new(SignerLocks::new());
        let in_section = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let key = Address([7; 20]);

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let in_section = Arc::clone(&in_section);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    locks.with_locks(&[key], || {
                        let now = in_section.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(10));
                        in_section.fetch_sub(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_opposite_order_does_not_deadlock() {
        let locks = Arc::new(SignerLocks::new());
        let a = Address([1; 20]);
        let b = Address([2; 20]);

        let workers: Vec<_> = [[a, b], [b, a]]
            .into_iter()
            .map(|pair| {
                let locks = Arc::clone(&locks);
                thread::spawn(move || {
                    for _ in 0..50 {
                        locks.with_locks(&pair, || thread::yield_now());
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(locks.len(), 2);
    }

    #[test]
    fn test_poisoned_lock_recovered() {
        let locks = Arc::new(SignerLocks::new());
        let key = Address([9; 20]);

        let poisoner = Arc::clone(&locks);
        let result = thread::spawn(move || {
            poisoner.with_locks(&[key], || panic!("flow failed mid-section"));
        })
        .join();
        assert!(result.is_err());

        assert_eq!(locks.with_locks(&[key], || "still usable"), "still usable");
    }
}
