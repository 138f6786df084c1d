//! Request memoization.
//!
//! [`MemoizedTransport`] wraps any [`HttpTransport`] and answers repeated
//! requests from a [`CacheStore`]. Stacking two of them gives a short-lived
//! interactive layer in front of a longer-lived general one.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::Error;

/// Backing store for memoized responses.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<HttpResponse>;

    async fn set(&self, key: String, response: HttpResponse);

    async fn clear(&self);

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

struct Entry {
    stored_at: Instant,
    generation: u64,
    response: HttpResponse,
}

#[derive(Default)]
struct Entries {
    map: HashMap<String, Entry>,
    // (key, generation) in insertion order, oldest first. Slots whose
    // generation no longer matches the map are stale and skipped.
    order: VecDeque<(String, u64)>,
    next_generation: u64,
}

impl Entries {
    fn is_current(&self, key: &str, generation: u64) -> bool {
        self.map
            .get(key)
            .is_some_and(|entry| entry.generation == generation)
    }

    fn insert(&mut self, key: String, response: HttpResponse) {
        let generation = self.next_generation;
        self.next_generation += 1;

        let entry = Entry {
            stored_at: Instant::now(),
            generation,
            response,
        };
        self.map.insert(key.clone(), entry);
        self.order.push_back((key, generation));

        // overwrites leave stale slots behind; drop them once they dominate
        if self.order.len() > 2 * self.map.len() + 16 {
            let map = &self.map;
            self.order
                .retain(|(k, g)| map.get(k).is_some_and(|e| e.generation == *g));
        }
    }

    /// Remove the oldest live entry. Returns false when nothing is left.
    fn evict_oldest(&mut self) -> bool {
        while let Some((key, generation)) = self.order.pop_front() {
            if self.is_current(&key, generation) {
                self.map.remove(&key);
                return true;
            }
        }
        false
    }

    /// Drop expired entries from the front of the insertion order.
    ///
    /// `stored_at` grows with the generation, so the first live entry that
    /// has not expired ends the sweep.
    fn purge_expired(&mut self, ttl: Duration) {
        while let Some((key, generation)) = self.order.pop_front() {
            if let Some(entry) = self.map.get(&key).filter(|e| e.generation == generation) {
                if entry.stored_at.elapsed() < ttl {
                    self.order.push_front((key, generation));
                    return;
                }
                self.map.remove(&key);
            }
        }
    }
}

/// In-memory store. Unbounded unless `max_entries` or `ttl` is set.
pub struct InMemoryStore {
    entries: RwLock<Entries>,
    max_entries: Option<usize>,
    ttl: Option<Duration>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            max_entries: None,
            ttl: None,
        }
    }

    /// Keep at most `max_entries`, evicting the oldest first.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Expire entries older than `ttl`.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        self.ttl
            .map(|ttl| entry.stored_at.elapsed() >= ttl)
            .unwrap_or(false)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryStore {
    async fn get(&self, key: &str) -> Option<HttpResponse> {
        {
            let entries = self.entries.read().await;
            match entries.map.get(key) {
                None => return None,
                Some(entry) if !self.is_expired(entry) => return Some(entry.response.clone()),
                Some(_) => {}
            }
        }

        // a concurrent set may have refreshed the key since the read lock
        let mut entries = self.entries.write().await;
        match entries.map.get(key) {
            Some(entry) if !self.is_expired(entry) => Some(entry.response.clone()),
            Some(_) => {
                // its order slot goes stale and is skipped later
                entries.map.remove(key);
                None
            }
            None => None,
        }
    }

    async fn set(&self, key: String, response: HttpResponse) {
        let mut entries = self.entries.write().await;

        if let Some(ttl) = self.ttl {
            entries.purge_expired(ttl);
        }

        entries.insert(key, response);

        if let Some(max) = self.max_entries {
            while entries.map.len() > max && entries.evict_oldest() {}
        }
    }

    async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.map.clear();
        entries.order.clear();
    }

    /// Number of entries that have not expired.
    async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        match self.ttl {
            None => entries.map.len(),
            Some(_) => entries
                .map
                .values()
                .filter(|entry| !self.is_expired(entry))
                .count(),
        }
    }
}

/// A transport that remembers successful responses.
///
/// The key comes from [`HttpRequest::cache_key`], which ignores the concrete
/// URL when the request carries a cache scope.
pub struct MemoizedTransport<T> {
    inner: T,
    store: Arc<dyn CacheStore>,
}

impl<T: HttpTransport> MemoizedTransport<T> {
    pub fn new(inner: T, store: Arc<dyn CacheStore>) -> Self {
        Self { inner, store }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for MemoizedTransport<T> {
    async fn post(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        let key = request.cache_key();

        if let Some(cached) = self.store.get(&key).await {
            debug!(url = %request.url, "cache hit");
            return Ok(cached);
        }

        debug!(url = %request.url, "cache miss");
        let response = self.inner.post(request).await?;
        if response.is_success() {
            self.store.set(key, response.clone()).await;
        }
        Ok(response)
    }
}
