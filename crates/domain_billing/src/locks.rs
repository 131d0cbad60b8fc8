//! Per-enrollment write serialization
//!
//! Invoice creation, correction and the arrear refresh read an enrollment's
//! invoice chain, compute, then write. Holding the enrollment's lock across
//! those steps keeps two writers in this process from computing off the same
//! predecessor. Across processes the storage-level predecessor check applies.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use core_kernel::EnrollmentId;

type LockMap = HashMap<EnrollmentId, Arc<AsyncMutex<()>>>;

/// Shared registry of per-enrollment locks
///
/// Entries live only while some writer holds or waits on them. Cloning
/// yields a handle to the same registry.
#[derive(Debug, Clone, Default)]
pub struct EnrollmentLocks {
    inner: Arc<Mutex<LockMap>>,
}

impl EnrollmentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to one enrollment
    pub async fn acquire(&self, enrollment_id: EnrollmentId) -> EnrollmentGuard {
        let lock = lock_map(&self.inner).entry(enrollment_id).or_default().clone();
        let guard = lock.clone().lock_owned().await;
        EnrollmentGuard {
            guard: Some(guard),
            lock,
            enrollment_id,
            registry: self.inner.clone(),
        }
    }

    /// Number of enrollments currently locked or awaited
    pub fn len(&self) -> usize {
        lock_map(&self.inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access to one enrollment, released on drop
///
/// The last guard out removes the enrollment's entry from the registry.
#[derive(Debug)]
pub struct EnrollmentGuard {
    guard: Option<OwnedMutexGuard<()>>,
    lock: Arc<AsyncMutex<()>>,
    enrollment_id: EnrollmentId,
    registry: Arc<Mutex<LockMap>>,
}

impl Drop for EnrollmentGuard {
    fn drop(&mut self) {
        // The owned guard holds its own reference to the lock
        self.guard.take();

        let mut locks = lock_map(&self.registry);
        // Only the registry's copy and ours remain: nobody is waiting
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.enrollment_id);
        }
    }
}

// The map is only touched in short non-panicking sections, so a poisoned
// lock still holds a consistent map.
fn lock_map(registry: &Mutex<LockMap>) -> MutexGuard<'_, LockMap> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
