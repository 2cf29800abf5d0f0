use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use super::counter::CounterKey;

/// Keyed mutual exclusion over counter partitions.
///
/// Approvals touching the same (year, program code) partition are serialized;
/// partitions never block each other. The wait is bounded so pathological
/// contention surfaces as a retryable timeout instead of queuing forever.
#[derive(Debug, Clone)]
pub struct PartitionLocks {
    state: Arc<LockState>,
    wait_limit: Duration,
}

#[derive(Debug)]
struct LockState {
    held: Mutex<HashSet<CounterKey>>,
    released: Condvar,
}

/// A caller exceeded the bounded wait for a contended partition.
#[derive(Debug, Clone, thiserror::Error)]
#[error("timed out waiting for partition {key} after {wait_limit:?}")]
pub struct LockTimeout {
    pub key: CounterKey,
    pub wait_limit: Duration,
}

impl PartitionLocks {
    pub fn new(wait_limit: Duration) -> Self {
        Self {
            state: Arc::new(LockState {
                held: Mutex::new(HashSet::new()),
                released: Condvar::new(),
            }),
            wait_limit,
        }
    }

    /// Acquire exclusive access to `key`, blocking up to the configured wait
    /// limit. The returned guard releases the partition on drop.
    pub fn lock(&self, key: &CounterKey) -> Result<PartitionGuard, LockTimeout> {
        let deadline = Instant::now() + self.wait_limit;
        let mut held = self.state.held.lock().expect("partition lock poisoned");

        while held.contains(key) {
            let now = Instant::now();
            if now >= deadline {
                return Err(self.timeout(key));
            }

            let (reacquired, wait) = self
                .state
                .released
                .wait_timeout(held, deadline - now)
                .expect("partition lock poisoned");
            held = reacquired;

            if wait.timed_out() && held.contains(key) {
                return Err(self.timeout(key));
            }
        }

        held.insert(key.clone());
        Ok(PartitionGuard {
            state: Arc::clone(&self.state),
            key: key.clone(),
        })
    }

    fn timeout(&self, key: &CounterKey) -> LockTimeout {
        LockTimeout {
            key: key.clone(),
            wait_limit: self.wait_limit,
        }
    }
}

/// Exclusive hold on one partition; dropping it wakes queued waiters.
#[derive(Debug)]
pub struct PartitionGuard {
    state: Arc<LockState>,
    key: CounterKey,
}

impl Drop for PartitionGuard {
    fn drop(&mut self) {
        let mut held = self.state.held.lock().expect("partition lock poisoned");
        held.remove(&self.key);
        self.state.released.notify_all();
    }
}
