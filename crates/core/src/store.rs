//! Snapshot persistence for client-scoped state.
//!
//! Cart and favorites are persisted as whole snapshots: every mutation
//! overwrites the stored value, nothing is written incrementally. The
//! storefront backs this with the visitor's session; tests use
//! [`MemoryStore`].

use std::convert::Infallible;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

/// Durable key-value slot holding one snapshot of `T`.
///
/// An implementation is already scoped to one visitor (session or user),
/// so the methods take no key.
pub trait SnapshotStore<T> {
    /// Error returned by the backing store.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the persisted snapshot, if any.
    fn load(&self) -> impl Future<Output = Result<Option<T>, Self::Error>> + Send;

    /// Overwrite the persisted snapshot.
    fn save(&self, snapshot: &T) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Remove the persisted snapshot.
    fn discard(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// In-memory [`SnapshotStore`] whose clones share one slot.
///
/// Counts writes so callers can assert that every mutation persisted.
#[derive(Debug)]
pub struct MemoryStore<T> {
    inner: Arc<Mutex<MemorySlot<T>>>,
}

#[derive(Debug)]
struct MemorySlot<T> {
    value: Option<T>,
    saves: usize,
}

impl<T> MemoryStore<T> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemorySlot {
                value: None,
                saves: 0,
            })),
        }
    }

    /// Create a store that already holds `value`.
    #[must_use]
    pub fn with_value(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemorySlot {
                value: Some(value),
                saves: 0,
            })),
        }
    }

    /// Number of successful `save` calls so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .saves
    }
}

impl<T: Clone> MemoryStore<T> {
    /// Copy of the stored value.
    #[must_use]
    pub fn snapshot(&self) -> Option<T> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .value
            .clone()
    }
}

impl<T> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SnapshotStore<T> for MemoryStore<T>
where
    T: Clone + Send + Sync,
{
    type Error = Infallible;

    async fn load(&self) -> Result<Option<T>, Self::Error> {
        Ok(self.snapshot())
    }

    async fn save(&self, snapshot: &T) -> Result<(), Self::Error> {
        let mut slot = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        slot.value = Some(snapshot.clone());
        slot.saves += 1;
        Ok(())
    }

    async fn discard(&self) -> Result<(), Self::Error> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .value = None;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_overwrites() {
        let store = MemoryStore::new();
        assert_eq!(store.load().await.unwrap(), None::<u32>);

        store.save(&1).await.unwrap();
        store.save(&2).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(2));
        assert_eq!(store.save_count(), 2);
    }

    #[tokio::test]
    async fn test_clones_share_slot() {
        let store = MemoryStore::with_value(5_u32);
        let other = store.clone();
        other.discard().await.unwrap();
        assert_eq!(store.snapshot(), None);
    }
}
