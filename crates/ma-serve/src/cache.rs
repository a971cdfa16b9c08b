//! Short-lived cache of display names used when rendering notifications.
//!
//! Misses are single-flight: the first caller for a key fetches while later
//! callers park on a `Notify` and re-read the cache once it fires. A fetch
//! that overlaps an `invalidate` returns its value without caching it.

use ma_core::MutualAidError;
use ma_core::types::UserId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

#[derive(Clone)]
struct Entry {
    display_name: Option<String>,
    fetched_at: Instant,
}

#[derive(Default)]
struct Entries {
    by_user: HashMap<UserId, Entry>,
    invalidations: u64,
}

#[derive(Clone)]
pub struct ProfileCache {
    ttl: Duration,
    entries: Arc<Mutex<Entries>>,
    inflight: Arc<Mutex<HashMap<UserId, Arc<Notify>>>>,
}

impl ProfileCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(Entries::default())),
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the cached display name for `user_id`, calling `fetch` at most
    /// once across concurrent misses. `None` means the user has no profile.
    pub async fn get_or_fetch<F>(
        &self,
        user_id: &UserId,
        fetch: F,
    ) -> Result<Option<String>, MutualAidError>
    where
        F: FnOnce() -> Result<Option<String>, MutualAidError>,
    {
        loop {
            if let Some(hit) = self.fresh(user_id).await {
                return Ok(hit);
            }
            if self.wait_on_inflight(user_id).await {
                continue;
            }
            break;
        }
        // Another leader may have filled the entry between our check and our claim.
        if let Some(hit) = self.fresh(user_id).await {
            self.notify_inflight(user_id).await;
            return Ok(hit);
        }

        let invalidations = self.entries.lock().await.invalidations;
        let result = fetch();
        if let Ok(display_name) = &result {
            let mut guard = self.entries.lock().await;
            if guard.invalidations == invalidations {
                let ttl = self.ttl;
                guard
                    .by_user
                    .retain(|_, entry| entry.fetched_at.elapsed() < ttl);
                guard.by_user.insert(
                    user_id.clone(),
                    Entry {
                        display_name: display_name.clone(),
                        fetched_at: Instant::now(),
                    },
                );
            }
        }
        self.notify_inflight(user_id).await;
        result
    }

    pub async fn invalidate(&self, user_id: &UserId) {
        let mut guard = self.entries.lock().await;
        guard.invalidations += 1;
        guard.by_user.remove(user_id);
    }

    async fn fresh(&self, user_id: &UserId) -> Option<Option<String>> {
        let guard = self.entries.lock().await;
        guard
            .by_user
            .get(user_id)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.display_name.clone())
    }

    /// Returns `false` when the caller now owns the fetch for `user_id`.
    async fn wait_on_inflight(&self, user_id: &UserId) -> bool {
        let mut guard = self.inflight.lock().await;
        let Some(existing) = guard.get(user_id).cloned() else {
            guard.insert(user_id.clone(), Arc::new(Notify::new()));
            return false;
        };
        // Registered before the lock is released so a wake-up cannot be missed.
        let notified = existing.notified();
        drop(guard);
        notified.await;
        true
    }

    async fn notify_inflight(&self, user_id: &UserId) {
        let notify = self.inflight.lock().await.remove(user_id);
        if let Some(notify) = notify {
            notify.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn hits_skip_the_fetch_until_the_entry_expires() {
        let cache = ProfileCache::new(Duration::from_secs(60));
        let user = UserId::generate();
        let calls = AtomicUsize::new(0);
        let fetch = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some("Ana".to_string()))
        };

        assert_eq!(cache.get_or_fetch(&user, fetch).await.unwrap().as_deref(), Some("Ana"));
        assert_eq!(cache.get_or_fetch(&user, fetch).await.unwrap().as_deref(), Some("Ana"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.invalidate(&user).await;
        cache.get_or_fetch(&user, fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let expired = ProfileCache::new(Duration::ZERO);
        expired.get_or_fetch(&user, fetch).await.unwrap();
        expired.get_or_fetch(&user, fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn failed_fetches_are_not_cached() {
        let cache = ProfileCache::new(Duration::from_secs(60));
        let user = UserId::generate();

        let err = cache
            .get_or_fetch(&user, || Err(MutualAidError::internal("db locked")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ma_core::ErrorKind::Internal);

        let name = cache
            .get_or_fetch(&user, || Ok(Some("Bea".to_string())))
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("Bea"));
    }

    #[tokio::test]
    async fn expired_entries_are_dropped_when_new_ones_land() {
        let cache = ProfileCache::new(Duration::from_millis(200));
        for _ in 0..3 {
            cache
                .get_or_fetch(&UserId::generate(), || Ok(None))
                .await
                .unwrap();
        }
        assert_eq!(cache.entries.lock().await.by_user.len(), 3);

        tokio::time::sleep(Duration::from_millis(300)).await;
        cache
            .get_or_fetch(&UserId::generate(), || Ok(Some("Eli".to_string())))
            .await
            .unwrap();
        assert_eq!(cache.entries.lock().await.by_user.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn fetch_overlapping_an_invalidation_is_not_cached() {
        let cache = ProfileCache::new(Duration::from_secs(60));
        let user = UserId::generate();
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        let stale = {
            let cache = cache.clone();
            let user = user.clone();
            tokio::spawn(async move {
                cache
                    .get_or_fetch(&user, move || {
                        started_tx.send(()).unwrap();
                        release_rx.recv().unwrap();
                        Ok(None)
                    })
                    .await
            })
        };

        started_rx.await.unwrap();
        // The profile is created while the miss above is still reading.
        cache.invalidate(&user).await;
        release_tx.send(()).unwrap();
        assert_eq!(stale.await.unwrap().unwrap(), None);

        let name = cache
            .get_or_fetch(&user, || Ok(Some("Dana".to_string())))
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("Dana"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_misses_fetch_once() {
        let cache = ProfileCache::new(Duration::from_secs(60));
        let user = UserId::generate();
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                let user = user.clone();
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    cache
                        .get_or_fetch(&user, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(50));
                            Ok(Some("Caro".to_string()))
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap().as_deref(), Some("Caro"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
