//! Sharing of concurrent identical requests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::OnceCell;

use crate::cache::QueryKey;

use super::ApiError;

type Slot<T> = Arc<OnceCell<Result<Arc<T>, ApiError>>>;

/// Requests currently on the wire, by key and cache generation.
///
/// Callers asking for a key that is already being fetched under the same
/// generation wait for that fetch instead of starting their own. Once the
/// key's generation moves on (a write invalidated it), new callers start
/// a fresh fetch rather than joining one that may carry pre-write data.
/// If the caller driving a fetch is dropped, one of the waiters takes over.
pub struct InFlight<T> {
    slots: Mutex<HashMap<(QueryKey, u64), Slot<T>>>,
}

impl<T> Default for InFlight<T> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> InFlight<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fetch` for `key` at `generation`, or join the fetch already
    /// running for that pair.
    pub async fn run<F>(
        &self,
        key: &QueryKey,
        generation: u64,
        fetch: F,
    ) -> Result<Arc<T>, ApiError>
    where
        F: Future<Output = Result<Arc<T>, ApiError>>,
    {
        let id = (key.clone(), generation);
        let slot = Arc::clone(self.lock().entry(id.clone()).or_default());

        let result = slot.get_or_init(|| fetch).await.clone();

        let mut slots = self.lock();
        if slots.get(&id).is_some_and(|current| Arc::ptr_eq(current, &slot)) {
            slots.remove(&id);
        }
        result
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(QueryKey, u64), Slot<T>>> {
        self.slots.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::models::SearchParams;

    fn key() -> QueryKey {
        QueryKey::user_list(&SearchParams::default())
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_fetch() {
        let inflight: InFlight<u32> = InFlight::new();
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(Arc::new(7))
        };

        let (key_a, key_b) = (key(), key());
        let (a, b) = tokio::join!(
            inflight.run(&key_a, 1, fetch()),
            inflight.run(&key_b, 1, fetch())
        );
        assert_eq!(*a.unwrap(), 7);
        assert_eq!(*b.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(inflight.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn newer_generation_does_not_join_older_fetch() {
        let inflight: InFlight<u32> = InFlight::new();
        let old = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(Arc::new(5))
        };
        let new = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            inflight.run(&key(), 2, async { Ok(Arc::new(4)) }).await
        };

        let old_key = key();
        let (a, b) = tokio::join!(inflight.run(&old_key, 1, old), new);
        assert_eq!(*a.unwrap(), 5);
        assert_eq!(*b.unwrap(), 4);
    }

    #[tokio::test]
    async fn sequential_calls_fetch_again() {
        let inflight: InFlight<u32> = InFlight::new();
        let first = inflight.run(&key(), 1, async { Ok(Arc::new(1)) }).await.unwrap();
        let second = inflight.run(&key(), 1, async { Ok(Arc::new(2)) }).await.unwrap();
        assert_eq!((*first, *second), (1, 2));
    }

    #[tokio::test]
    async fn errors_are_shared_too() {
        let inflight: InFlight<u32> = InFlight::new();
        let err = inflight
            .run(&key(), 1, async { Err(ApiError::Network("down".into())) })
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Network("down".into()));
    }
}
