//! Per-user tool-router session cache.
//!
//! `get_or_create` serializes the check-and-create step behind one
//! async mutex; the returned `Arc` handles are used concurrently and
//! independently outside the lock.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::Mutex;

use valet_domain::error::Result;

/// A live tool-router session at the hub.
#[derive(Debug, Clone)]
pub struct RouterSession {
    pub session_id: String,
    pub mcp_url: String,
}

pub struct SessionCache<K, V> {
    inner: Mutex<HashMap<K, Arc<V>>>,
}

impl<K, V> Default for SessionCache<K, V> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone, V> SessionCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached handle for `key`, creating it with `factory`
    /// when absent. Concurrent callers for the same key observe exactly
    /// one factory invocation; a failed factory caches nothing.
    pub async fn get_or_create<F, Fut>(&self, key: K, factory: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let mut map = self.inner.lock().await;
        if let Some(existing) = map.get(&key) {
            return Ok(existing.clone());
        }
        let created = Arc::new(factory().await?);
        map.insert(key, created.clone());
        Ok(created)
    }

    /// Drop a cached handle (e.g. after the hub reports the session gone).
    pub async fn invalidate(&self, key: &K) {
        self.inner.lock().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn factory_runs_once_per_key() {
        let cache: Arc<SessionCache<i64, String>> = Arc::new(SessionCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_create(7, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok("session".to_owned())
                    })
                    .await
                    .unwrap()
            }));
        }
        for h in handles {
            assert_eq!(*h.await.unwrap(), "session");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_factory_caches_nothing() {
        let cache: SessionCache<i64, String> = SessionCache::new();

        let err = cache
            .get_or_create(1, || async {
                Err(valet_domain::error::Error::Hub("down".into()))
            })
            .await;
        assert!(err.is_err());

        // A later attempt runs the factory again and succeeds.
        let ok = cache
            .get_or_create(1, || async { Ok("up".to_owned()) })
            .await
            .unwrap();
        assert_eq!(*ok, "up");
    }

    #[tokio::test]
    async fn invalidate_forces_recreation() {
        let cache: SessionCache<&'static str, u32> = SessionCache::new();
        let first = cache.get_or_create("k", || async { Ok(1) }).await.unwrap();
        assert_eq!(*first, 1);

        cache.invalidate(&"k").await;
        let second = cache.get_or_create("k", || async { Ok(2) }).await.unwrap();
        assert_eq!(*second, 2);
    }
}
