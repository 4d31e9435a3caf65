use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
};

// -----------------------------------------------------------------------------
// ----- ConnectionRegistry ----------------------------------------------------

/// Process-wide count of live browser connections.
///
/// The counter is only reachable through [`ConnectionRegistry::open`] (which
/// hands out a lease) and [`ConnectionRegistry::active`]. Releasing a lease is
/// the only way to decrement.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    active: AtomicUsize,
    next_id: AtomicU64,
}

// -----------------------------------------------------------------------------
// ----- ConnectionRegistry: Static --------------------------------------------

impl ConnectionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

// -----------------------------------------------------------------------------
// ----- ConnectionRegistry: Public --------------------------------------------

impl ConnectionRegistry {
    /// Counts a newly accepted connection and returns its lease.
    pub fn open(self: &Arc<Self>) -> ConnectionLease {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.active.fetch_add(1, Ordering::AcqRel);

        ConnectionLease {
            id,
            registry: self.clone(),
            released: AtomicBool::new(false),
        }
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}

// -----------------------------------------------------------------------------
// ----- ConnectionLease -------------------------------------------------------

/// One slot in the registry. Released at most once, either explicitly or on drop.
#[derive(Debug)]
pub struct ConnectionLease {
    id: u64,
    registry: Arc<ConnectionRegistry>,
    released: AtomicBool,
}

impl ConnectionLease {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns `true` only for the call that actually decremented.
    pub fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }

        self.registry.active.fetch_sub(1, Ordering::AcqRel);
        true
    }

    /// Count of live connections as seen right after this lease's own changes.
    pub fn registry_active(&self) -> usize {
        self.registry.active()
    }
}

impl Drop for ConnectionLease {
    fn drop(&mut self) {
        self.release();
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_open_minus_closed() {
        let registry = ConnectionRegistry::new();

        let leases: Vec<_> = (0..5).map(|_| registry.open()).collect();
        assert_eq!(registry.active(), 5);

        let mut leases = leases.into_iter();
        for lease in leases.by_ref().take(2) {
            lease.release();
        }
        assert_eq!(registry.active(), 3);

        drop(leases);
        assert_eq!(registry.active(), 0);
    }

    #[test]
    fn ids_are_unique() {
        let registry = ConnectionRegistry::new();
        let a = registry.open();
        let b = registry.open();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn release_then_drop_decrements_once() {
        let registry = ConnectionRegistry::new();
        let _other = registry.open();
        let lease = registry.open();

        assert!(lease.release());
        assert!(!lease.release());
        drop(lease);

        assert_eq!(registry.active(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_release_decrements_once() {
        for _ in 0..100 {
            let registry = ConnectionRegistry::new();
            let lease = Arc::new(registry.open());
            assert_eq!(registry.active(), 1);

            let a = tokio::spawn({
                let lease = lease.clone();
                async move { lease.release() }
            });
            let b = tokio::spawn({
                let lease = lease.clone();
                async move { lease.release() }
            });

            let (a, b) = (a.await.unwrap(), b.await.unwrap());
            assert!(a ^ b, "exactly one release must win");
            assert_eq!(registry.active(), 0);
        }
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
