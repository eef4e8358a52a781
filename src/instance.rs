use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::driver::DriverConnection;
use crate::types::ConnectionRole;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) type ConnectionSlot = tokio::sync::Mutex<Option<Box<dyn DriverConnection>>>;

/// Work to run once when a request ends.
#[async_trait]
pub trait CleanupRoutine: Send + Sync {
    async fn run(&self, instance: &RequestInstance);

    /// Label used in logs.
    fn name(&self) -> &str {
        "cleanup"
    }
}

/// Per-request context: at most one connection per [`ConnectionRole`] plus the teardown list.
///
/// Share it by reference (or `Arc`) between the tasks serving one request. Call
/// [`RequestInstance::cleanup`] when the request ends.
pub struct RequestInstance {
    id: u64,
    started: Instant,
    primary: ConnectionSlot,
    reader: ConnectionSlot,
    cleanup_routines: Mutex<Vec<Box<dyn CleanupRoutine>>>,
}

impl RequestInstance {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
            started: Instant::now(),
            primary: tokio::sync::Mutex::new(None),
            reader: tokio::sync::Mutex::new(None),
            cleanup_routines: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Milliseconds since the instance was created; stamped on timing log lines.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    pub(crate) fn slot(&self, role: ConnectionRole) -> &ConnectionSlot {
        match role {
            ConnectionRole::Primary => &self.primary,
            ConnectionRole::ReadOnly => &self.reader,
        }
    }

    /// Whether a connection for `role` is currently held. Waits for an in-flight open or query.
    pub async fn is_connected(&self, role: ConnectionRole) -> bool {
        self.slot(role).lock().await.is_some()
    }

    /// Register `routine` to run once at teardown.
    pub fn add_cleanup_routine(&self, routine: impl CleanupRoutine + 'static) {
        self.routines().push(Box::new(routine));
    }

    #[must_use]
    pub fn pending_cleanups(&self) -> usize {
        self.routines().len()
    }

    /// Run every registered routine once, in registration order.
    ///
    /// Routines registered while cleanup is running are run too. A second call only runs
    /// routines registered since the first.
    pub async fn cleanup(&self) {
        loop {
            let batch: Vec<Box<dyn CleanupRoutine>> = std::mem::take(&mut *self.routines());
            if batch.is_empty() {
                break;
            }
            for routine in batch {
                debug!(
                    instance = self.id,
                    elapsed_ms = self.elapsed_ms(),
                    routine = routine.name(),
                    "running cleanup routine"
                );
                routine.run(self).await;
            }
        }
    }

    fn routines(&self) -> std::sync::MutexGuard<'_, Vec<Box<dyn CleanupRoutine>>> {
        // Clear the poison and continue with the recovered list
        self.cleanup_routines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RequestInstance {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequestInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestInstance")
            .field("id", &self.id)
            .field("elapsed_ms", &self.elapsed_ms())
            .field("pending_cleanups", &self.pending_cleanups())
            .finish_non_exhaustive()
    }
}

impl Drop for RequestInstance {
    fn drop(&mut self) {
        let pending = self
            .cleanup_routines
            .get_mut()
            .map_or_else(|poisoned| poisoned.into_inner().len(), |routines| routines.len());
        if pending > 0 {
            warn!(
                instance = self.id,
                pending,
                "request instance dropped before cleanup; open connections dropped without goodbye"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use super::*;

    struct Counter(Arc<AtomicUsize>);

    #[async_trait]
    impl CleanupRoutine for Counter {
        async fn run(&self, _instance: &RequestInstance) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn routines_run_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let instance = RequestInstance::new();
        instance.add_cleanup_routine(Counter(Arc::clone(&hits)));
        instance.add_cleanup_routine(Counter(Arc::clone(&hits)));
        assert_eq!(instance.pending_cleanups(), 2);

        instance.cleanup().await;
        instance.cleanup().await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(instance.pending_cleanups(), 0);
    }

    struct Chained(Arc<AtomicUsize>);

    #[async_trait]
    impl CleanupRoutine for Chained {
        async fn run(&self, instance: &RequestInstance) {
            instance.add_cleanup_routine(Counter(Arc::clone(&self.0)));
        }
    }

    #[tokio::test]
    async fn routines_added_during_cleanup_also_run() {
        let hits = Arc::new(AtomicUsize::new(0));
        let instance = RequestInstance::new();
        instance.add_cleanup_routine(Chained(Arc::clone(&hits)));
        instance.cleanup().await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn ids_are_unique() {
        let a = RequestInstance::new();
        let b = RequestInstance::new();
        assert_ne!(a.id(), b.id());
    }
}
