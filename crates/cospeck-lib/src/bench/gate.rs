//! Bounded concurrency gate for pod workers

use crate::error::BenchError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Caps how many pod workers run at once.
///
/// Creation and teardown workers draw from the same pool of slots.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    held: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

/// An acquired slot; released when dropped, on every exit path
#[derive(Debug)]
pub struct Slot {
    _permit: OwnedSemaphorePermit,
    held: Arc<AtomicUsize>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.held.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConcurrencyGate {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            held: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait for a free slot
    pub async fn acquire(&self) -> Result<Slot, BenchError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| BenchError::GateClosed)?;

        let now = self.held.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        Ok(Slot {
            _permit: permit,
            held: Arc::clone(&self.held),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Slots currently held
    pub fn held(&self) -> usize {
        self.held.load(Ordering::SeqCst)
    }

    /// Most slots ever held at the same time
    pub fn peak_held(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::task::JoinSet;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_never_exceeds_capacity() {
        let gate = ConcurrencyGate::new(3);
        let running = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let mut tasks = JoinSet::new();

        for _ in 0..20 {
            let slot = gate.acquire().await.unwrap();
            let running = Arc::clone(&running);
            let max_seen = Arc::clone(&max_seen);
            tasks.spawn(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                drop(slot);
            });
        }
        while tasks.join_next().await.is_some() {}

        assert!(max_seen.load(Ordering::SeqCst) <= 3);
        assert!(gate.peak_held() <= 3);
        assert_eq!(gate.held(), 0);
        assert_eq!(gate.available(), 3);
    }

    #[tokio::test]
    async fn test_slot_released_on_panic() {
        let gate = ConcurrencyGate::new(1);
        let slot = gate.acquire().await.unwrap();

        let handle = tokio::spawn(async move {
            let _slot = slot;
            panic!("worker failed");
        });
        assert!(handle.await.is_err());

        assert_eq!(gate.available(), 1);
        assert!(gate.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_zero_capacity_clamped() {
        let gate = ConcurrencyGate::new(0);
        assert_eq!(gate.capacity(), 1);
        let _slot = gate.acquire().await.unwrap();
        assert_eq!(gate.held(), 1);
    }
}
